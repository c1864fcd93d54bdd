//! Double-threshold hysteresis linking.
//!
//! Candidates at or above the high threshold seed edges; candidates in
//! the [low, high) band join only when 8-connected to a seeded pixel.

use crate::edges::nms::EdgePoint;

const NEIGH_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Returns a w*h mask with 1 on linked edge pixels.
pub(crate) fn link_edges(
    w: usize,
    h: usize,
    candidates: &[EdgePoint],
    low: f32,
    high: f32,
) -> Vec<u8> {
    // 0 = empty, 1 = weak candidate, 2 = linked edge
    let mut mask = vec![0u8; w * h];
    let mut stack = Vec::with_capacity(64);

    for c in candidates {
        if c.magnitude < low {
            continue;
        }
        let idx = c.y as usize * w + c.x as usize;
        if c.magnitude >= high {
            mask[idx] = 2;
            stack.push(idx);
        } else {
            mask[idx] = 1;
        }
    }

    while let Some(idx) = stack.pop() {
        let x = (idx % w) as isize;
        let y = (idx / w) as isize;
        for (dx, dy) in NEIGH_OFFSETS {
            let xn = x + dx;
            let yn = y + dy;
            if xn < 0 || yn < 0 || xn >= w as isize || yn >= h as isize {
                continue;
            }
            let nidx = yn as usize * w + xn as usize;
            if mask[nidx] == 1 {
                mask[nidx] = 2;
                stack.push(nidx);
            }
        }
    }

    for m in mask.iter_mut() {
        *m = (*m == 2) as u8;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: u32, y: u32, magnitude: f32) -> EdgePoint {
        EdgePoint { x, y, magnitude }
    }

    #[test]
    fn weak_pixels_need_a_strong_anchor() {
        // chain: strong at (2,2), weak neighbors trailing right
        let candidates = [
            point(2, 2, 200.0),
            point(3, 2, 80.0),
            point(4, 2, 80.0),
            // isolated weak pixel elsewhere
            point(7, 7, 80.0),
        ];
        let mask = link_edges(10, 10, &candidates, 60.0, 150.0);
        assert_eq!(mask[2 * 10 + 2], 1);
        assert_eq!(mask[2 * 10 + 3], 1);
        assert_eq!(mask[2 * 10 + 4], 1);
        assert_eq!(mask[7 * 10 + 7], 0);
    }

    #[test]
    fn below_low_is_dropped_outright() {
        let candidates = [point(2, 2, 200.0), point(3, 2, 30.0)];
        let mask = link_edges(10, 10, &candidates, 60.0, 150.0);
        assert_eq!(mask[2 * 10 + 2], 1);
        assert_eq!(mask[2 * 10 + 3], 0);
    }
}
