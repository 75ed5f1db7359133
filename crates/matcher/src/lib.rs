//! # scenefp Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` decides which scenes in a library are duplicates of a query
//! scene, using only coarse content fingerprints and an external hit index.
//! It has two entry points that share one scoring policy from the `align`
//! crate:
//!
//! - [`match_audio`]: aligns `i32` audio sub-fingerprints against a
//!   precomputed `hash -> hits` map. Pure and infallible.
//! - [`match_visual`]: splits each `u64` frame hash into four 16-bit chunks,
//!   asks a [`ChunkLookup`] for candidates per chunk partition, verifies each
//!   candidate by Hamming distance, then aligns. Fails only if the lookup
//!   fails, and then returns that lookup's error unchanged.
//!
//! Fingerprint extraction, index storage, and duplicate-group persistence all
//! live outside this crate.
//!
//! ## Core Types
//!
//! - [`AudioHit`] / [`VisualHit`]: an occurrence of a fingerprint sample in
//!   another scene.
//! - [`AudioParams`] / [`VisualParams`]: gates and bin width per modality.
//! - [`MatchConfig`]: both parameter sets, serde-friendly for config files.
//! - [`MatchResult`]: candidate scene, confidence in `[0.0, 1.0]`, modality.
//!
//! ## Example Usage
//!
//! ```
//! use std::collections::HashMap;
//! use std::convert::Infallible;
//! use matcher::{match_audio, match_visual, AudioHit, AudioParams, VisualHit, VisualParams};
//!
//! // Audio: scene 2 carries the same 20 sub-fingerprints.
//! let query: Vec<i32> = (0..20).map(|i| i * 31 + 7).collect();
//! let mut hits: HashMap<i32, Vec<AudioHit>> = HashMap::new();
//! for (offset, hash) in query.iter().enumerate() {
//!     hits.entry(*hash).or_default().push(AudioHit { scene_id: 2, offset: offset as u32 });
//! }
//! let params = AudioParams::new().with_min_hashes(5).with_density_threshold(0.5);
//! let results = match_audio(1, &query, &hits, &params);
//! assert_eq!(results[0].scene_id, 2);
//!
//! // Visual: an index that never returns anything.
//! let frames = vec![0x0123_4567_89AB_CDEFu64; 8];
//! let empty = |_: &[u16], _: usize| -> Result<Vec<VisualHit>, Infallible> { Ok(Vec::new()) };
//! let results = match_visual(1, &frames, Some(empty), &VisualParams::default()).unwrap();
//! assert!(results.is_empty());
//! ```
//!
//! ## Observability
//!
//! Each call runs inside a `tracing` span (`matcher.audio` /
//! `matcher.visual`) and emits a `debug` summary with candidate counts and
//! elapsed time. Rejected bins are logged at `trace` level with the gate that
//! rejected them.

pub mod audio;
pub mod config;
pub mod visual;

pub use crate::audio::{match_audio, AudioHit};
pub use crate::config::{AudioParams, MatchConfig, VisualParams};
pub use crate::visual::{
    chunk, hamming_distance, match_visual, ChunkLookup, VisualHit, CHUNK_BITS, PARTITIONS,
};
pub use align::{MatchResult, MatchType, SceneId};
