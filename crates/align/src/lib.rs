//! # scenefp Alignment
//!
//! Shared alignment and density scoring for fingerprint duplicate matching.
//! Both the audio and the visual matcher reduce their inputs to
//! `(query position, candidate hit)` observations and hand them to this
//! crate, so the two modalities can never disagree on how a match is scored.
//!
//! ## Contract
//!
//! - Pure, synchronous, CPU-only. No I/O, no clocks, no global state.
//! - Every call builds a fresh [`AlignmentBins`]; nothing outlives the call.
//! - Hits pointing at the query scene are discarded on entry.
//!
//! ## Pipeline
//!
//! 1.  **Binning**: each observation's delta (`candidate offset - query
//!     position`) is quantized with [`floor_div`] by the delta tolerance and
//!     stored under `(candidate scene, bin key)`. A bin keeps the *set* of
//!     query positions, never a raw hit count.
//! 2.  **Gating**: every bin is checked against the minimum count, the
//!     optional minimum span and the density threshold.
//! 3.  **Selection**: a scene's confidence is the maximum density among its
//!     qualifying bins. Scenes with none are omitted.
//!
//! ## Example Usage
//!
//! ```
//! use align::{AlignmentBins, MatchType, ScoringPolicy};
//!
//! let mut bins = AlignmentBins::new(1, 2);
//! for pos in 0..20usize {
//!     // Scene 2 has the same samples five positions later.
//!     bins.record(2, pos, pos as i64 + 5);
//! }
//!
//! let results = ScoringPolicy::new(5, 0.5, 0).score(&bins, MatchType::Audio);
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].scene_id, 2);
//! assert!((results[0].confidence - 1.0).abs() < 1e-9);
//! ```

mod bins;
mod policy;
mod result;

pub use crate::bins::{
    effective_tolerance, floor_div, AlignedHit, AlignmentBins, Bin, DEFAULT_DELTA_TOLERANCE,
};
pub use crate::policy::{BinVerdict, ScoringPolicy};
pub use crate::result::{MatchResult, MatchType, SceneId};
