/// Hard tracking failures surfaced to the caller.
///
/// Per-site rejection (contrast, threshold, out-of-image) is plain site
/// state and never appears here.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// A list pass was invoked with no sites, or the tracker was
    /// constructed from fewer than two seed points.
    #[error("site list is empty")]
    EmptyList,
    /// The number of valid sites fell below the minimum the downstream
    /// curve fit needs. Re-initialization is the caller's decision.
    #[error("tracking lost: {valid} valid sites, {required} required")]
    TrackingLost { valid: usize, required: usize },
    /// Search parameters that cannot produce a single candidate offset.
    /// A configuration bug, detected at construction and never mid-run.
    #[error("invalid search configuration: {reason}")]
    InvalidSearchConfig { reason: &'static str },
}
