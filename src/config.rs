//! Tracker configuration.
//!
//! [`SearchConfig`] bounds the cost of every per-site search and is the
//! only knob a real-time caller needs to honor a deadline: the tracker
//! never interrupts a pass, it only does less work per pass. Both structs
//! are plain serde values so tooling can persist tuning.

use crate::error::TrackError;
use serde::{Deserialize, Serialize};

/// Immutable per-session search parameters, shared read-only by every
/// site during a pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum candidate offset along the normal (pixels, > 0).
    pub range: u32,
    /// Sub-sampling resolution inside the range (pixels, > 0, <= range).
    pub step: u32,
    /// Relative tolerance against a site's stored reference contrast.
    /// A committed site whose best likelihood drops below
    /// `min_contrast * reference` fails the contrast test.
    pub min_contrast: f32,
    /// Absolute likelihood floor. No candidate above it means the edge
    /// signal is gone (occlusion, blur).
    pub min_likelihood: f32,
    /// Target number of sites along the curve; drives spacing updates.
    pub points_to_track: u32,
}

impl SearchConfig {
    pub fn new(
        range: u32,
        step: u32,
        min_contrast: f32,
        min_likelihood: f32,
        points_to_track: u32,
    ) -> Result<Self, TrackError> {
        let config = Self {
            range,
            step,
            min_contrast,
            min_likelihood,
            points_to_track,
        };
        config.validate()?;
        Ok(config)
    }

    /// Construction-time validation; violations are fatal, never a
    /// per-site runtime outcome.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.range == 0 {
            return Err(TrackError::InvalidSearchConfig {
                reason: "range must be positive",
            });
        }
        if self.step == 0 {
            return Err(TrackError::InvalidSearchConfig {
                reason: "step must be positive",
            });
        }
        if self.range / self.step == 0 {
            return Err(TrackError::InvalidSearchConfig {
                reason: "range/step must yield at least one candidate offset",
            });
        }
        if !(0.0..=1.0).contains(&self.min_contrast) {
            return Err(TrackError::InvalidSearchConfig {
                reason: "min_contrast must lie in [0, 1]",
            });
        }
        if !self.min_likelihood.is_finite() || self.min_likelihood < 0.0 {
            return Err(TrackError::InvalidSearchConfig {
                reason: "min_likelihood must be finite and non-negative",
            });
        }
        if self.points_to_track < 2 {
            return Err(TrackError::InvalidSearchConfig {
                reason: "points_to_track must be at least 2",
            });
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            range: 6,
            step: 1,
            min_contrast: 0.5,
            min_likelihood: 20.0,
            points_to_track: 100,
        }
    }
}

/// Curve-maintenance parameters: spacing bounds, growth limits and the
/// edge-map fallback knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParams {
    /// Initial target spacing between consecutive sites (pixels).
    pub delta: f32,
    /// Lower spacing bound as a factor of delta; closer pairs collapse.
    pub min_spacing_factor: f32,
    /// Upper spacing bound as a factor of delta; wider gaps get filled.
    pub max_spacing_factor: f32,
    /// Valid-site minimum below which the frame fails as tracking lost.
    pub min_signal: usize,
    /// Valid fraction of the target count below which a full resample
    /// replaces the incremental one.
    pub resample_floor: f32,
    /// Chain-code steps walked per extremity per frame before giving up.
    pub max_extremity_steps: usize,
    /// Half-size of the window searched by the edge-map fallback.
    pub edge_window: usize,
    /// Hysteresis thresholds for the fallback edge map (gradient units).
    pub edge_low: f32,
    pub edge_high: f32,
}

impl CurveParams {
    #[inline]
    pub fn min_spacing(&self, delta: f32) -> f32 {
        self.min_spacing_factor * delta
    }

    #[inline]
    pub fn max_spacing(&self, delta: f32) -> f32 {
        self.max_spacing_factor * delta
    }
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            delta: 10.0,
            min_spacing_factor: 0.5,
            max_spacing_factor: 1.5,
            min_signal: 4,
            resample_floor: 0.5,
            max_extremity_steps: 30,
            edge_window: 8,
            edge_low: 60.0,
            edge_high: 150.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_config() {
        assert!(SearchConfig::new(6, 1, 0.5, 20.0, 40).is_ok());
        assert!(SearchConfig::new(4, 4, 0.5, 20.0, 10).is_ok());
    }

    #[test]
    fn rejects_degenerate_search_window() {
        assert!(matches!(
            SearchConfig::new(0, 1, 0.5, 20.0, 40),
            Err(TrackError::InvalidSearchConfig { .. })
        ));
        assert!(matches!(
            SearchConfig::new(4, 0, 0.5, 20.0, 40),
            Err(TrackError::InvalidSearchConfig { .. })
        ));
        // step wider than range yields zero non-trivial offsets
        assert!(matches!(
            SearchConfig::new(3, 5, 0.5, 20.0, 40),
            Err(TrackError::InvalidSearchConfig { .. })
        ));
    }

    #[test]
    fn config_serde_round_trip() {
        let config = SearchConfig::new(8, 2, 0.4, 15.0, 60).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.range, config.range);
        assert_eq!(back.step, config.step);
        assert_eq!(back.points_to_track, config.points_to_track);
        assert!((back.min_contrast - config.min_contrast).abs() < 1e-6);
        assert!((back.min_likelihood - config.min_likelihood).abs() < 1e-6);

        let params = CurveParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: CurveParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.min_signal, params.min_signal);
        assert!((back.delta - params.delta).abs() < 1e-6);
    }
}
