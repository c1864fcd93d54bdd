//! Direction-aligned non-maximum suppression on gradient magnitude.
//!
//! Keeps a pixel only when its magnitude is strictly greater than both
//! neighbors along the quantized gradient direction. The outermost
//! 1-pixel frame is skipped so neighbor lookups need no bounds checks.

use crate::edges::grad::Grad;
use crate::image::ImageView;

/// Edge candidate surviving suppression, carrying its magnitude for the
/// hysteresis stage.
#[derive(Clone, Copy, Debug)]
pub struct EdgePoint {
    pub x: u32,
    pub y: u32,
    pub magnitude: f32,
}

const TAN_22_5_DEG: f32 = 0.41421356237;

pub fn run_nms(grad: &Grad, mag_thresh: f32) -> Vec<EdgePoint> {
    let w = grad.gx.w;
    let h = grad.gx.h;
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let mut edges = Vec::with_capacity((w - 2) * (h - 2) / 8 + 1);
    for y in 1..h - 1 {
        let mag_prev = grad.mag.row(y - 1);
        let mag_row = grad.mag.row(y);
        let mag_next = grad.mag.row(y + 1);
        let gx_row = grad.gx.row(y);
        let gy_row = grad.gy.row(y);

        for x in 1..w - 1 {
            let mag = mag_row[x];
            if mag < mag_thresh {
                continue;
            }

            let gx = gx_row[x];
            let gy = gy_row[x];
            let abs_gx = gx.abs();
            let abs_gy = gy.abs();
            let same_sign = (gx >= 0.0 && gy >= 0.0) || (gx <= 0.0 && gy <= 0.0);

            let (neighbor1, neighbor2) = if abs_gx >= abs_gy {
                if abs_gy <= abs_gx * TAN_22_5_DEG {
                    (mag_row[x - 1], mag_row[x + 1])
                } else if same_sign {
                    (mag_prev[x + 1], mag_next[x - 1])
                } else {
                    (mag_prev[x - 1], mag_next[x + 1])
                }
            } else if abs_gx <= abs_gy * TAN_22_5_DEG {
                (mag_prev[x], mag_next[x])
            } else if same_sign {
                (mag_prev[x + 1], mag_next[x - 1])
            } else {
                (mag_prev[x - 1], mag_next[x + 1])
            };

            if mag <= neighbor1 || mag <= neighbor2 {
                continue;
            }

            edges.push(EdgePoint {
                x: x as u32,
                y: y as u32,
                magnitude: mag,
            });
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::grad::scharr_gradients;
    use crate::image::ImageF32;

    #[test]
    fn suppression_thins_a_ramp_to_one_line() {
        let mut l = ImageF32::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                // smooth step centered between columns 7 and 8
                let v = if x < 7 {
                    0.0
                } else if x > 8 {
                    200.0
                } else {
                    100.0
                };
                l.set(x, y, v);
            }
        }
        let grad = scharr_gradients(&l);
        let edges = run_nms(&grad, 10.0);
        assert!(!edges.is_empty());
        for e in &edges {
            assert!(e.x == 7 || e.x == 8, "unexpected edge column {}", e.x);
        }
    }
}
