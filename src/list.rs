//! Ordered site list: per-frame pass driver and tracking health.
//!
//! The list owns its sites in a contiguous arena and mutates them in
//! place; order along the curve is list order. Per-site searches are
//! data-independent over a frozen frame, so the `parallel` feature fans
//! them out with Rayon without any locking.

use crate::config::SearchConfig;
use crate::error::TrackError;
use crate::image::ImageU8;
use crate::site::{SiteState, TrackedSite};
use log::debug;
use serde::Serialize;

/// Serializable copy of one site for diagnostics and display layers.
#[derive(Clone, Debug, Serialize)]
pub struct SiteSnapshot {
    pub x: f32,
    pub y: f32,
    pub alpha: f32,
    pub state: SiteState,
    pub weight: f32,
}

/// Ordered collection of tracked sites along one contour.
#[derive(Clone, Debug, Default)]
pub struct SiteList {
    sites: Vec<TrackedSite>,
}

impl SiteList {
    pub fn new() -> Self {
        Self { sites: Vec::new() }
    }

    pub fn from_sites(sites: Vec<TrackedSite>) -> Self {
        Self { sites }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[inline]
    pub fn sites(&self) -> &[TrackedSite] {
        &self.sites
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrackedSite> {
        self.sites.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, TrackedSite> {
        self.sites.iter_mut()
    }

    pub(crate) fn as_mut_vec(&mut self) -> &mut Vec<TrackedSite> {
        &mut self.sites
    }

    /// First tracking pass after seeding: repositions every valid site
    /// without letting contrast or threshold tests drop a hypothesis.
    /// Returns the valid count.
    pub fn init_tracking(
        &mut self,
        image: &ImageU8<'_>,
        config: &SearchConfig,
    ) -> Result<usize, TrackError> {
        self.run_pass(image, config, false)
    }

    /// Ordinary tracking pass with rejection enabled. Sites that fail
    /// keep their failure state and drop out of the active curve, but
    /// stay in the list for diagnostics until pruned.
    pub fn track(
        &mut self,
        image: &ImageU8<'_>,
        config: &SearchConfig,
    ) -> Result<usize, TrackError> {
        self.run_pass(image, config, true)
    }

    fn run_pass(
        &mut self,
        image: &ImageU8<'_>,
        config: &SearchConfig,
        enable_rejection: bool,
    ) -> Result<usize, TrackError> {
        if self.sites.is_empty() {
            // downstream curve fitting needs a minimum point count, so an
            // empty pass must be distinguishable from zero results
            return Err(TrackError::EmptyList);
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.sites
                .par_iter_mut()
                .filter(|site| site.is_valid())
                .for_each(|site| site.track(image, config, enable_rejection));
        }
        #[cfg(not(feature = "parallel"))]
        for site in self.sites.iter_mut().filter(|site| site.is_valid()) {
            site.track(image, config, enable_rejection);
        }

        let valid = self.number_of_signal();
        debug!(
            "list pass done: rejection={} valid={}/{}",
            enable_rejection,
            valid,
            self.sites.len()
        );
        Ok(valid)
    }

    /// Number of sites still carrying signal (state Valid). The primary
    /// health counter consumed by curve fitting and servo logic.
    pub fn number_of_signal(&self) -> usize {
        self.sites.iter().filter(|site| site.is_valid()).count()
    }

    /// Total number of sites, failed ones included.
    pub fn total_number_of_signal(&self) -> usize {
        self.sites.len()
    }

    /// Serializable per-site snapshot for tooling.
    pub fn snapshot(&self) -> Vec<SiteSnapshot> {
        self.sites
            .iter()
            .map(|site| SiteSnapshot {
                x: site.x,
                y: site.y,
                alpha: site.alpha,
                state: site.state,
                weight: site.weight(),
            })
            .collect()
    }
}
