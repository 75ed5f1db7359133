//! Workspace umbrella crate for scene fingerprint duplicate matching.
//!
//! The matching engine itself lives in two workspace crates:
//!
//! - `align`: offset-delta binning and the density scoring policy shared by
//!   both modalities.
//! - `matcher`: the audio and visual matchers built on top of it.
//!
//! This crate re-exports both and adds what a standalone tool needs around
//! them: a YAML configuration loader ([`config`]), an in-memory fingerprint
//! library that serves audio hits and chunk lookups ([`library`]), and a
//! library-wide duplicate rescan ([`rescan`]).
//!
//! ```
//! use scenefp::{rescan, FingerprintLibrary, MatchConfig, RescanConfig};
//!
//! let json = r#"{"scenes": [
//!     {"scene_id": 1, "audio": [1, 2, 3, 4, 5, 6]},
//!     {"scene_id": 2, "audio": [1, 2, 3, 4, 5, 6]}
//! ]}"#;
//! let library = FingerprintLibrary::from_json_str(json).unwrap();
//!
//! let mut config = MatchConfig::default();
//! config.audio.min_hashes = 4;
//! let report = rescan(&library, &config, &RescanConfig::default());
//! assert_eq!(report.pairs.len(), 2);
//! ```

pub mod config;
pub mod library;
pub mod rescan;

pub use align::{
    AlignedHit, AlignmentBins, Bin, BinVerdict, DEFAULT_DELTA_TOLERANCE, ScoringPolicy,
    effective_tolerance, floor_div,
};
pub use matcher::{
    AudioHit, AudioParams, CHUNK_BITS, ChunkLookup, MatchConfig, MatchResult, MatchType,
    PARTITIONS, SceneId, VisualHit, VisualParams, chunk, hamming_distance, match_audio,
    match_visual,
};

pub use crate::config::{ConfigLoadError, ScenefpConfig};
pub use crate::library::{FingerprintLibrary, LibraryError, LibraryLookup, SceneFingerprints};
pub use crate::rescan::{DuplicatePair, RescanConfig, RescanReport, match_scene, rescan};
