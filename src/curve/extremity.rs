//! Extremity growth at the open ends of the tracked contour.
//!
//! The primary path walks the raster contour with 8-direction chain-code
//! steps, spawning a new site every `delta` of accumulated arc while the
//! local edge response holds up. When the walk stalls (sharp corners,
//! junctions), the edge-map fallback looks for the continuation on or
//! near a detected edge inside a small window past the end.

use crate::config::SearchConfig;
use crate::edges::EdgeMap;
use crate::image::{ImageU8, ImageView};
use crate::site::{likelihood, TrackedSite};
use log::debug;
use nalgebra::Vector2;

/// 8-direction chain code, 45° apart, index k at angle k·45° with y
/// pointing down the rows.
pub(crate) const CHAIN_DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const SQRT_2: f32 = std::f32::consts::SQRT_2;

/// Quantize a direction vector to its chain-code index.
pub(crate) fn quantize_direction(dir: Vector2<f32>) -> usize {
    let angle = dir.y.atan2(dir.x);
    let k = (angle / std::f32::consts::FRAC_PI_4).round() as i32;
    k.rem_euclid(8) as usize
}

pub(crate) struct GrowthOutcome {
    pub sites: Vec<TrackedSite>,
    pub stalled: bool,
}

/// Walk the contour outward from `start` along `outward`, spawning a
/// verified site every `delta` of arc. Stops at `max_steps`, at the
/// image border, or when no forward neighbor keeps an edge response
/// above `min_likelihood`.
pub(crate) fn grow_chain(
    image: &ImageU8<'_>,
    config: &SearchConfig,
    start: Vector2<f32>,
    outward: Vector2<f32>,
    delta: f32,
    max_steps: usize,
) -> GrowthOutcome {
    let mut sites = Vec::new();
    let mut pos = Vector2::new(start.x.round(), start.y.round());
    let mut dir = outward;
    let mut arc = 0.0f32;
    let mut stalled = false;

    for _ in 0..max_steps {
        let code = quantize_direction(dir);
        let mut best: Option<(usize, f32)> = None;
        // the coded direction and its two neighbors keep the walk on the
        // contour without letting it turn back
        for candidate in [code, (code + 7) % 8, (code + 1) % 8] {
            let (dx, dy) = CHAIN_DIRS[candidate];
            let px = pos.x + dx as f32;
            let py = pos.y + dy as f32;
            if !image.contains(px, py) {
                continue;
            }
            let step = Vector2::new(dx as f32, dy as f32).normalize();
            let normal = Vector2::new(-step.y, step.x);
            let Some(score) = likelihood(image, px, py, normal.x, normal.y) else {
                continue;
            };
            if score >= config.min_likelihood && best.map_or(true, |(_, s)| score > s) {
                best = Some((candidate, score));
            }
        }

        let Some((candidate, _)) = best else {
            stalled = true;
            break;
        };
        let (dx, dy) = CHAIN_DIRS[candidate];
        pos.x += dx as f32;
        pos.y += dy as f32;
        dir = Vector2::new(dx as f32, dy as f32).normalize();
        arc += if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };

        if arc >= delta {
            let normal = Vector2::new(-dir.y, dir.x);
            let mut site = TrackedSite::new(pos.x, pos.y, normal.y.atan2(normal.x));
            site.track(image, config, true);
            if !site.is_valid() {
                stalled = true;
                break;
            }
            sites.push(site);
            arc = 0.0;
        }
    }

    GrowthOutcome { sites, stalled }
}

/// Edge-map-assisted fallback: look for the contour continuation on a
/// detected edge inside a window centred one `delta` past the end, in
/// the forward half-plane only.
pub(crate) fn grow_from_edge_map(
    image: &ImageU8<'_>,
    edge_map: &EdgeMap,
    config: &SearchConfig,
    start: Vector2<f32>,
    outward: Vector2<f32>,
    delta: f32,
    window: usize,
) -> Option<TrackedSite> {
    let target = start + outward * delta;
    let half = window as isize;
    let cx = target.x.round() as isize;
    let cy = target.y.round() as isize;

    let mut best: Option<(Vector2<f32>, f32)> = None;
    for dy in -half..=half {
        for dx in -half..=half {
            let x = cx + dx;
            let y = cy + dy;
            if x < 0 || y < 0 || x >= edge_map.w as isize || y >= edge_map.h as isize {
                continue;
            }
            if !edge_map.is_edge(x as usize, y as usize) {
                continue;
            }
            let p = Vector2::new(x as f32, y as f32);
            // must extend the curve, not fold back onto it
            if (p - start).dot(&outward) <= 0.0 {
                continue;
            }
            let d = (p - target).norm();
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((p, d));
            }
        }
    }

    let (p, dist) = best?;
    debug!("edge-map fallback found continuation at {p:?} (dist {dist:.2})");
    let normal = Vector2::new(-outward.y, outward.x);
    let mut site = TrackedSite::new(p.x, p.y, normal.y.atan2(normal.x));
    site.track(image, config, true);
    site.is_valid().then_some(site)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_code_round_trips_compass_directions() {
        for (k, (dx, dy)) in CHAIN_DIRS.iter().enumerate() {
            let dir = Vector2::new(*dx as f32, *dy as f32).normalize();
            assert_eq!(quantize_direction(dir), k, "direction {k}");
        }
    }

    #[test]
    fn walk_extends_a_straight_edge() {
        let w = 64;
        let h = 32;
        let mut buf = vec![30u8; w * h];
        for y in 16..h {
            let v = if y == 16 { 125 } else { 220 };
            for x in 0..w {
                buf[y * w + x] = v;
            }
        }
        let img = ImageU8 {
            w,
            h,
            stride: w,
            data: &buf,
        };
        let config = SearchConfig::new(4, 1, 0.5, 20.0, 10).unwrap();
        let outcome = grow_chain(
            &img,
            &config,
            Vector2::new(30.0, 16.0),
            Vector2::new(1.0, 0.0),
            5.0,
            25,
        );
        assert!(outcome.sites.len() >= 4, "grew {}", outcome.sites.len());
        for site in &outcome.sites {
            assert!(site.is_valid());
            assert!((site.y - 16.0).abs() < 0.5, "site left the edge: {site:?}");
            assert!(site.x > 30.0);
        }
    }

    #[test]
    fn walk_stalls_in_flat_image() {
        let buf = vec![128u8; 32 * 32];
        let img = ImageU8 {
            w: 32,
            h: 32,
            stride: 32,
            data: &buf,
        };
        let config = SearchConfig::new(4, 1, 0.5, 20.0, 10).unwrap();
        let outcome = grow_chain(
            &img,
            &config,
            Vector2::new(16.0, 16.0),
            Vector2::new(1.0, 0.0),
            5.0,
            25,
        );
        assert!(outcome.stalled);
        assert!(outcome.sites.is_empty());
    }
}
