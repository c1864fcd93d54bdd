//! Curve-level tracking: sampling, per-frame passes and maintenance.
//!
//! [`CurveModel`] owns the site list and the curve geometry and drives
//! the per-frame cycle: track the sites, grow the open extremities,
//! suppress failed and crowded sites, refresh the target spacing and
//! resample where density degraded. The caller reads positions and
//! health counters out of the model and feeds them to its own fitting
//! and servoing stages.

pub mod backend;
pub mod extremity;

pub use backend::{CurveBackend, CurveSample};

use crate::config::{CurveParams, SearchConfig};
use crate::error::TrackError;
use crate::image::{ImageU8, ImageView};
use crate::list::SiteList;
use crate::site::{SiteState, TrackedSite};
use log::debug;
use nalgebra::Vector2;
use serde::Serialize;

/// Per-frame statistics reported to the caller.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct TrackStats {
    /// Sites that tracked successfully this frame.
    pub valid: usize,
    /// All sites, failed ones included.
    pub total: usize,
    /// Sites added by extremity growth.
    pub grown: usize,
    /// Sites removed by suppression.
    pub suppressed: usize,
    /// Sites inserted by the incremental resample.
    pub inserted: usize,
    /// True when the full resample replaced the incremental pass.
    pub resampled: bool,
}

/// Moving-edge tracker for one contour.
pub struct CurveModel {
    list: SiteList,
    config: SearchConfig,
    params: CurveParams,
    backend: CurveBackend,
    delta: f32,
}

impl CurveModel {
    /// Free-form tracker interpolating the seed points with a spline.
    pub fn spline(
        seeds: Vec<[f32; 2]>,
        config: SearchConfig,
        params: CurveParams,
    ) -> Result<Self, TrackError> {
        Self::with_backend(CurveBackend::spline(to_points(seeds)), config, params)
    }

    /// Piecewise-linear variant for contours without curvature.
    pub fn polyline(
        seeds: Vec<[f32; 2]>,
        config: SearchConfig,
        params: CurveParams,
    ) -> Result<Self, TrackError> {
        Self::with_backend(CurveBackend::polyline(to_points(seeds)), config, params)
    }

    fn with_backend(
        backend: CurveBackend,
        config: SearchConfig,
        params: CurveParams,
    ) -> Result<Self, TrackError> {
        config.validate()?;
        if backend.points().len() < 2 {
            return Err(TrackError::EmptyList);
        }
        let delta = params.delta;
        Ok(Self {
            list: SiteList::new(),
            config,
            params,
            backend,
            delta,
        })
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    #[inline]
    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    /// Current target spacing between consecutive sites.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta
    }

    #[inline]
    pub fn list(&self) -> &SiteList {
        &self.list
    }

    /// Mutable list access for the caller's robust estimator (weights).
    #[inline]
    pub fn list_mut(&mut self) -> &mut SiteList {
        &mut self.list
    }

    #[inline]
    pub fn sites(&self) -> &[TrackedSite] {
        self.list.sites()
    }

    pub fn number_of_signal(&self) -> usize {
        self.list.number_of_signal()
    }

    pub fn total_number_of_signal(&self) -> usize {
        self.list.total_number_of_signal()
    }

    /// Seed sites along the current curve estimate, spaced by delta.
    /// Positions outside the image are skipped; weights reset to 1.
    pub fn sample(&mut self, image: &ImageU8<'_>) {
        let samples = self.backend.samples(self.delta);
        let sites = self.list.as_mut_vec();
        sites.clear();
        for s in samples {
            if !image.contains(s.pos.x, s.pos.y) {
                continue;
            }
            sites.push(site_at(s.pos, s.tangent));
        }
        debug!("sampled {} sites at delta {:.2}", sites.len(), self.delta);
    }

    /// First pass after seeding: place sites if none exist yet, then
    /// reposition them without rejection. Returns the valid count.
    pub fn init_tracking(&mut self, image: &ImageU8<'_>) -> Result<usize, TrackError> {
        if self.list.is_empty() {
            self.sample(image);
        }
        let config = self.config.clone();
        let valid = self.list.init_tracking(image, &config)?;
        self.refresh_geometry();
        Ok(valid)
    }

    /// One full tracking cycle for a freshly acquired frame.
    ///
    /// Fails with [`TrackError::TrackingLost`] once the valid count
    /// drops below the configured minimum; the caller decides between
    /// re-initialization and halting. Nothing is retried internally.
    pub fn track_frame(&mut self, image: &ImageU8<'_>) -> Result<TrackStats, TrackError> {
        let config = self.config.clone();
        self.list.track(image, &config)?;

        let valid = self.list.number_of_signal();
        if valid < 2 {
            return Err(TrackError::TrackingLost {
                valid,
                required: self.params.min_signal.max(2),
            });
        }
        self.refresh_geometry();

        let grown = self.seek_extremities(image);
        let suppressed = self.suppress_points();
        self.refresh_geometry();
        self.update_delta();

        let expected = (self.backend.length() / self.delta).floor() as usize + 1;
        let degraded =
            (self.list.number_of_signal() as f32) < self.params.resample_floor * expected as f32;
        let mut inserted = 0;
        if degraded {
            self.re_sample(image);
        } else {
            inserted = self.local_re_sample(image);
        }

        let valid = self.list.number_of_signal();
        let total = self.list.total_number_of_signal();
        debug!(
            "frame done: valid={valid}/{total} grown={grown} suppressed={suppressed} \
             inserted={inserted} resampled={degraded}"
        );
        if valid < self.params.min_signal {
            return Err(TrackError::TrackingLost {
                valid,
                required: self.params.min_signal,
            });
        }
        Ok(TrackStats {
            valid,
            total,
            grown,
            suppressed,
            inserted,
            resampled: degraded,
        })
    }

    /// Full resample: re-derive delta from the current curve, then
    /// re-seed the whole list along it. Bounds long-run drift of the
    /// sampling density; idempotent on an unchanged image.
    pub fn re_sample(&mut self, image: &ImageU8<'_>) {
        self.update_delta();
        self.sample(image);
        debug!(
            "full resample: {} sites, delta {:.2}",
            self.list.len(),
            self.delta
        );
    }

    /// Incremental resample: fill only the gaps wider than the spacing
    /// ceiling with interpolated sites. Returns the insertion count.
    pub fn local_re_sample(&mut self, image: &ImageU8<'_>) -> usize {
        let max_spacing = self.params.max_spacing(self.delta);
        let delta = self.delta;
        let sites = self.list.as_mut_vec();
        let mut inserted = 0;
        let mut i = 0;
        while i + 1 < sites.len() {
            let a = Vector2::new(sites[i].x, sites[i].y);
            let b = Vector2::new(sites[i + 1].x, sites[i + 1].y);
            let gap = (b - a).norm();
            if gap <= max_spacing || gap <= f32::EPSILON {
                i += 1;
                continue;
            }
            let pieces = (gap / delta).ceil() as usize;
            let tangent = (b - a) / gap;
            let mut offset = 1;
            for k in 1..pieces {
                let pos = a + tangent * (gap * k as f32 / pieces as f32);
                if !image.contains(pos.x, pos.y) {
                    continue;
                }
                sites.insert(i + offset, site_at(pos, tangent));
                offset += 1;
                inserted += 1;
            }
            i += offset;
        }
        inserted
    }

    /// Recompute the target spacing from curve length and the configured
    /// point count, clamped to stay near the seeded delta.
    pub fn update_delta(&mut self) {
        let length = self.backend.length();
        let target = self.config.points_to_track.max(2) as f32;
        let ideal = length / (target - 1.0);
        self.delta = ideal.clamp(0.5 * self.params.delta, 2.0 * self.params.delta);
    }

    /// Grow both open ends with the chain-code walk; an end that stalls
    /// without yielding anything falls back to the edge-map search.
    /// Returns sites added.
    pub fn seek_extremities(&mut self, image: &ImageU8<'_>) -> usize {
        let Some((front_dir, back_dir)) = self.backend.end_directions() else {
            return 0;
        };
        let Some((front, back)) = self.end_positions() else {
            return 0;
        };
        let mut grown = 0;
        let mut edge_map = None;

        for (end, dir, at_front) in [(front, front_dir, true), (back, back_dir, false)] {
            let outcome = extremity::grow_chain(
                image,
                &self.config,
                end,
                dir,
                self.delta,
                self.params.max_extremity_steps,
            );
            let mut new_sites = outcome.sites;
            if outcome.stalled && new_sites.is_empty() {
                let map = edge_map.get_or_insert_with(|| {
                    crate::edges::detect_edges(image, self.params.edge_low, self.params.edge_high)
                });
                if let Some(site) = extremity::grow_from_edge_map(
                    image,
                    map,
                    &self.config,
                    end,
                    dir,
                    self.delta,
                    self.params.edge_window,
                ) {
                    new_sites.push(site);
                }
            }
            grown += new_sites.len();
            let sites = self.list.as_mut_vec();
            if at_front {
                for site in new_sites {
                    sites.insert(0, site);
                }
            } else {
                sites.extend(new_sites);
            }
        }

        if grown > 0 {
            debug!("extremity growth added {grown} sites");
        }
        grown
    }

    /// Edge-map-assisted extremity recovery: builds a binary edge map
    /// with the configured hysteresis thresholds and seeds one site per
    /// stalled end when a continuation is found near a detected edge.
    pub fn seek_extremities_canny(&mut self, image: &ImageU8<'_>) -> usize {
        let Some((front_dir, back_dir)) = self.backend.end_directions() else {
            return 0;
        };
        let Some((front, back)) = self.end_positions() else {
            return 0;
        };
        let edge_map =
            crate::edges::detect_edges(image, self.params.edge_low, self.params.edge_high);
        let mut grown = 0;
        for (end, dir, at_front) in [(front, front_dir, true), (back, back_dir, false)] {
            let found = extremity::grow_from_edge_map(
                image,
                &edge_map,
                &self.config,
                end,
                dir,
                self.delta,
                self.params.edge_window,
            );
            if let Some(site) = found {
                let sites = self.list.as_mut_vec();
                if at_front {
                    sites.insert(0, site);
                } else {
                    sites.push(site);
                }
                grown += 1;
            }
        }
        grown
    }

    /// Remove failed sites outright, then collapse neighbors closer
    /// than the spacing floor. Returns the number removed.
    pub fn suppress_points(&mut self) -> usize {
        let min_spacing = self.params.min_spacing(self.delta);
        let sites = self.list.as_mut_vec();
        let before = sites.len();

        sites.retain(|site| site.is_valid());

        let mut i = 0;
        while i + 1 < sites.len() {
            if sites[i].distance_to(&sites[i + 1]) < min_spacing {
                sites[i + 1].state = SiteState::TooClose;
                sites.remove(i + 1);
            } else {
                i += 1;
            }
        }
        before - sites.len()
    }

    /// Rebuild the curve geometry from the valid sites and refresh each
    /// site's normal from its neighbors along the curve.
    fn refresh_geometry(&mut self) {
        let points: Vec<Vector2<f32>> = self
            .list
            .iter()
            .filter(|site| site.is_valid())
            .map(|site| Vector2::new(site.x, site.y))
            .collect();
        if points.len() < 2 {
            return;
        }

        // normals from neighbor differences, clamped at the ends
        let n = points.len();
        let mut k: usize = 0;
        for site in self.list.iter_mut() {
            if !site.is_valid() {
                continue;
            }
            let prev = points[k.saturating_sub(1)];
            let next = points[(k + 1).min(n - 1)];
            let tangent = next - prev;
            let norm = tangent.norm();
            if norm > f32::EPSILON {
                let t = tangent / norm;
                site.alpha = t.x.atan2(-t.y);
            }
            k += 1;
        }
        self.backend.set_points(points);
    }

    fn end_positions(&self) -> Option<(Vector2<f32>, Vector2<f32>)> {
        let points = self.backend.points();
        if points.len() < 2 {
            return None;
        }
        Some((points[0], points[points.len() - 1]))
    }
}

fn to_points(seeds: Vec<[f32; 2]>) -> Vec<Vector2<f32>> {
    seeds.into_iter().map(|p| Vector2::new(p[0], p[1])).collect()
}

fn site_at(pos: Vector2<f32>, tangent: Vector2<f32>) -> TrackedSite {
    // normal is the tangent rotated by +90°
    let normal = Vector2::new(-tangent.y, tangent.x);
    TrackedSite::new(pos.x, pos.y, normal.y.atan2(normal.x))
}
