//! Tuning parameters for the audio and visual matchers.
//!
//! None of these values are ever rejected. Out-of-range values keep a fixed
//! meaning instead:
//!
//! | Parameter | `<= 0` | otherwise |
//! |---|---|---|
//! | `delta_tolerance` | defaults to 2 | bin width in delta units |
//! | `min_span` | gate disabled | minimum aligned span in samples |
//! | `hamming_max` | `0` = exact hash only | maximum bit distance |
//!
//! `hamming_max = 0` is a real setting, not a "disabled" sentinel like the
//! other two.

use align::{ScoringPolicy, DEFAULT_DELTA_TOLERANCE};
use serde::{Deserialize, Serialize};

/// Parameters for [`crate::match_audio`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioParams {
    /// Minimum unique aligned query positions in a bin.
    pub min_hashes: usize,
    /// Minimum `count / span` ratio of a bin.
    pub density_threshold: f64,
    /// Bin width in raw delta units.
    pub delta_tolerance: i64,
    /// Minimum aligned span in samples.
    pub min_span: i64,
}

impl AudioParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_hashes(mut self, min_hashes: usize) -> Self {
        self.min_hashes = min_hashes;
        self
    }

    pub fn with_density_threshold(mut self, density_threshold: f64) -> Self {
        self.density_threshold = density_threshold;
        self
    }

    pub fn with_delta_tolerance(mut self, delta_tolerance: i64) -> Self {
        self.delta_tolerance = delta_tolerance;
        self
    }

    pub fn with_min_span(mut self, min_span: i64) -> Self {
        self.min_span = min_span;
        self
    }

    /// Gates handed to the shared scorer.
    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy::new(self.min_hashes, self.density_threshold, self.min_span)
    }
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            min_hashes: 20,
            density_threshold: 0.3,
            delta_tolerance: DEFAULT_DELTA_TOLERANCE,
            min_span: 0,
        }
    }
}

/// Parameters for [`crate::match_visual`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualParams {
    /// Maximum Hamming distance between two full 64-bit frame hashes.
    pub hamming_max: u32,
    /// Minimum unique aligned query frames in a bin.
    pub min_frames: usize,
    /// Minimum `count / span` ratio of a bin.
    pub density_threshold: f64,
    /// Bin width in raw delta units.
    pub delta_tolerance: i64,
    /// Minimum aligned span in frames.
    pub min_span: i64,
}

impl VisualParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hamming_max(mut self, hamming_max: u32) -> Self {
        self.hamming_max = hamming_max;
        self
    }

    pub fn with_min_frames(mut self, min_frames: usize) -> Self {
        self.min_frames = min_frames;
        self
    }

    pub fn with_density_threshold(mut self, density_threshold: f64) -> Self {
        self.density_threshold = density_threshold;
        self
    }

    pub fn with_delta_tolerance(mut self, delta_tolerance: i64) -> Self {
        self.delta_tolerance = delta_tolerance;
        self
    }

    pub fn with_min_span(mut self, min_span: i64) -> Self {
        self.min_span = min_span;
        self
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy::new(self.min_frames, self.density_threshold, self.min_span)
    }
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            hamming_max: 8,
            min_frames: 5,
            density_threshold: 0.3,
            delta_tolerance: DEFAULT_DELTA_TOLERANCE,
            min_span: 0,
        }
    }
}

/// Both matchers' parameters, as loaded from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub audio: AudioParams,
    pub visual: VisualParams,
}
