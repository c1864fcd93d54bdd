//! Atomic tracked sample point.
//!
//! A [`TrackedSite`] owns one hypothesis on the contour: a sub-pixel
//! position, the local normal orientation and a state. Each frame it
//! scans candidate positions along the normal, scores them with the
//! projected-gradient likelihood `|∇I·n|` and either repositions itself
//! or records why it failed. Failure is state, not an error: the site is
//! kept for diagnostics until the curve-maintenance pass prunes it.

use crate::config::SearchConfig;
use crate::image::{gradient_at, ImageU8, ImageView};
use serde::{Deserialize, Serialize};

const EPS: f32 = 1e-6;

/// Outcome of the most recent tracking attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteState {
    /// The site found its edge and committed a new position.
    Valid,
    /// Best likelihood no longer matches the stored reference contrast.
    ContrastFail,
    /// No candidate cleared the absolute likelihood floor.
    ThresholdFail,
    /// The whole search window fell outside the image.
    OutOfImage,
    /// Marked redundant by near-point suppression.
    TooClose,
}

impl SiteState {
    #[inline]
    pub fn is_valid(self) -> bool {
        matches!(self, SiteState::Valid)
    }
}

/// One sample point along a tracked contour.
///
/// Coordinates are (x, y) in pixels, x along columns, y along rows.
/// `alpha` is the orientation of the curve normal in radians.
#[derive(Clone, Debug, Serialize)]
pub struct TrackedSite {
    pub x: f32,
    pub y: f32,
    pub x_prev: f32,
    pub y_prev: f32,
    /// Orientation of the search direction (curve normal), radians.
    pub alpha: f32,
    pub state: SiteState,
    /// Robust-estimator weight; owned by the caller's fitting stage.
    weight: f32,
    /// Likelihood committed on previous frames; reference for the
    /// relative contrast test. Zero until the first commit.
    contrast: f32,
}

impl TrackedSite {
    pub fn new(x: f32, y: f32, alpha: f32) -> Self {
        Self {
            x,
            y,
            x_prev: x,
            y_prev: y,
            alpha,
            state: SiteState::Valid,
            weight: 1.0,
            contrast: 0.0,
        }
    }

    #[inline]
    pub fn pos(&self) -> [f32; 2] {
        [self.x, self.y]
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Set by the external robust estimator between frames; the tracker
    /// itself only resets it to 1.0 on reseed.
    pub fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    #[inline]
    pub fn reference_contrast(&self) -> f32 {
        self.contrast
    }

    pub fn distance_to(&self, other: &TrackedSite) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// One local search along the normal.
    ///
    /// With `enable_rejection` off (first pass after seeding) the site
    /// only repositions and records its reference contrast; with it on,
    /// the absolute likelihood floor is tested first so that total
    /// signal loss reads as [`SiteState::ThresholdFail`], then the
    /// relative contrast band, then the commit.
    pub fn track(&mut self, image: &ImageU8<'_>, config: &SearchConfig, enable_rejection: bool) {
        let nx = self.alpha.cos();
        let ny = self.alpha.sin();

        let mut best_t = 0.0f32;
        let mut best_score = 0.0f32;
        let mut found = false;

        let range = config.range as i32;
        let step = config.step as i32;
        let mut t = -range;
        while t <= range {
            let tf = t as f32;
            let px = self.x + tf * nx;
            let py = self.y + tf * ny;
            t += step;
            if !image.contains(px, py) {
                continue;
            }
            let Some(score) = likelihood(image, px, py, nx, ny) else {
                continue;
            };
            // ties resolve toward the smaller displacement
            if !found || score > best_score || (score == best_score && tf.abs() < best_t.abs()) {
                best_score = score;
                best_t = tf;
                found = true;
            }
        }

        if !found {
            self.state = SiteState::OutOfImage;
            return;
        }

        if enable_rejection {
            if best_score < config.min_likelihood {
                self.state = SiteState::ThresholdFail;
                return;
            }
            if self.contrast > 0.0 && best_score < config.min_contrast * self.contrast {
                self.state = SiteState::ContrastFail;
                return;
            }
        }

        let t_refined = refine_peak(image, self, nx, ny, config.step as f32, best_t, best_score);
        self.x_prev = self.x;
        self.y_prev = self.y;
        self.x += t_refined * nx;
        self.y += t_refined * ny;
        self.contrast = if self.contrast > 0.0 {
            0.5 * (self.contrast + best_score)
        } else {
            best_score
        };
        self.state = SiteState::Valid;
    }
}

/// Projected-gradient likelihood at a candidate position: the absolute
/// component of the local intensity gradient along the search normal.
#[inline]
pub(crate) fn likelihood(image: &ImageU8<'_>, x: f32, y: f32, nx: f32, ny: f32) -> Option<f32> {
    let (gx, gy) = gradient_at(image, x, y)?;
    Some((gx * nx + gy * ny).abs())
}

/// Quadratic 3-point refinement of the likelihood peak along the normal.
fn refine_peak(
    image: &ImageU8<'_>,
    site: &TrackedSite,
    nx: f32,
    ny: f32,
    step: f32,
    t_best: f32,
    peak: f32,
) -> f32 {
    let mut samples = [peak; 3];
    for (i, off) in [-step, 0.0, step].iter().enumerate() {
        if *off == 0.0 {
            continue;
        }
        let t = t_best + *off;
        let px = site.x + t * nx;
        let py = site.y + t * ny;
        if !image.contains(px, py) {
            continue;
        }
        if let Some(score) = likelihood(image, px, py, nx, ny) {
            samples[i] = score;
        }
    }
    let f0 = samples[0];
    let f1 = samples[1];
    let f2 = samples[2];
    let denom = (f0 - 2.0 * f1 + f2).abs().max(EPS);
    let shift = 0.5 * (f0 - f2) / denom;
    (t_best + shift * step).clamp(t_best - step, t_best + step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    /// Rows above `edge_y` dark, the edge row mid-gray, rows below bright.
    fn horizontal_edge(w: usize, h: usize, edge_y: usize) -> Vec<u8> {
        let mut img = vec![30u8; w * h];
        for y in edge_y..h {
            let v = if y == edge_y { 125 } else { 220 };
            for x in 0..w {
                img[y * w + x] = v;
            }
        }
        img
    }

    fn view<'a>(w: usize, h: usize, data: &'a [u8]) -> ImageU8<'a> {
        ImageU8 {
            w,
            h,
            stride: w,
            data,
        }
    }

    fn config() -> SearchConfig {
        SearchConfig::new(4, 1, 0.5, 20.0, 10).unwrap()
    }

    #[test]
    fn site_on_edge_stays_put() {
        let buf = horizontal_edge(32, 32, 16);
        let img = view(32, 32, &buf);
        let mut site = TrackedSite::new(10.0, 16.0, FRAC_PI_2);
        site.track(&img, &config(), true);
        assert_eq!(site.state, SiteState::Valid);
        assert!((site.y - 16.0).abs() < 0.25, "y = {}", site.y);
        assert!((site.x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn displaced_site_recovers_edge() {
        let buf = horizontal_edge(32, 32, 16);
        let img = view(32, 32, &buf);
        let mut site = TrackedSite::new(10.0, 13.0, FRAC_PI_2);
        site.track(&img, &config(), false);
        assert_eq!(site.state, SiteState::Valid);
        assert!((site.y - 16.0).abs() < 0.25, "y = {}", site.y);
        assert!((site.y_prev - 13.0).abs() < 1e-4);
    }

    #[test]
    fn flat_window_fails_threshold() {
        let buf = vec![128u8; 32 * 32];
        let img = view(32, 32, &buf);
        let mut site = TrackedSite::new(16.0, 16.0, FRAC_PI_2);
        site.track(&img, &config(), true);
        assert_eq!(site.state, SiteState::ThresholdFail);
    }

    #[test]
    fn rejection_disabled_never_drops_the_hypothesis() {
        let buf = vec![128u8; 32 * 32];
        let img = view(32, 32, &buf);
        let mut site = TrackedSite::new(16.0, 16.0, FRAC_PI_2);
        site.track(&img, &config(), false);
        assert_eq!(site.state, SiteState::Valid);
    }

    #[test]
    fn window_outside_image_reports_out_of_image() {
        let buf = horizontal_edge(32, 32, 16);
        let img = view(32, 32, &buf);
        let mut site = TrackedSite::new(16.0, 200.0, FRAC_PI_2);
        site.track(&img, &config(), true);
        assert_eq!(site.state, SiteState::OutOfImage);
    }

    #[test]
    fn contrast_drop_fails_relative_test() {
        let bright = horizontal_edge(32, 32, 16);
        let img = view(32, 32, &bright);
        let mut site = TrackedSite::new(10.0, 16.0, FRAC_PI_2);
        site.track(&img, &config(), false);
        let reference = site.reference_contrast();
        assert!(reference > 0.0);

        // same edge, much weaker: clears the floor but not the band
        let mut faint = vec![100u8; 32 * 32];
        for y in 16..32 {
            for x in 0..32 {
                faint[y * 32 + x] = 160;
            }
        }
        let img = view(32, 32, &faint);
        site.track(&img, &config(), true);
        assert_eq!(site.state, SiteState::ContrastFail);
    }

    #[test]
    fn weight_belongs_to_the_caller() {
        let mut site = TrackedSite::new(0.0, 0.0, 0.0);
        assert!((site.weight() - 1.0).abs() < 1e-6);
        site.set_weight(0.3);
        assert!((site.weight() - 0.3).abs() < 1e-6);

        // tracking never touches the weight
        let buf = horizontal_edge(16, 16, 8);
        let img = view(16, 16, &buf);
        let mut site = TrackedSite::new(8.0, 8.0, FRAC_PI_2);
        site.set_weight(0.7);
        site.track(&img, &config(), true);
        assert!((site.weight() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn terminates_in_a_tracking_state() {
        // property: any valid config ends in one of the four outcomes
        let buf = horizontal_edge(16, 16, 8);
        let img = view(16, 16, &buf);
        for (x, y) in [(8.0f32, 8.0f32), (8.0, -50.0), (0.0, 8.0), (15.0, 0.0)] {
            let mut site = TrackedSite::new(x, y, FRAC_PI_2);
            site.track(&img, &config(), true);
            assert!(matches!(
                site.state,
                SiteState::Valid
                    | SiteState::ContrastFail
                    | SiteState::ThresholdFail
                    | SiteState::OutOfImage
            ));
        }
    }
}
