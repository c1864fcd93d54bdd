#![doc = include_str!("../README.md")]

pub mod config;
pub mod curve;
pub mod edges;
pub mod error;
pub mod image;
pub mod list;
pub mod site;

// Main entry points.
pub use crate::config::{CurveParams, SearchConfig};
pub use crate::curve::{CurveModel, TrackStats};
pub use crate::error::TrackError;
pub use crate::list::{SiteList, SiteSnapshot};
pub use crate::site::{SiteState, TrackedSite};

/// Small prelude for quick experiments.
pub mod prelude {
    pub use crate::image::ImageU8;
    pub use crate::{CurveModel, CurveParams, SearchConfig, SiteList, SiteState, TrackedSite};
}
