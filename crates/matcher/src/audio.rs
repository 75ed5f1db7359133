//! Audio matcher: aligns query sub-fingerprints against a precomputed
//! `hash -> hits` map.
//!
//! Audio sub-fingerprints are treated as collision-resistant at the index
//! layer, so hits are aligned as-is with no secondary verification. Dropping
//! over-popular hashes is also the index's job.

use std::collections::HashMap;
use std::time::Instant;

use align::{AlignedHit, AlignmentBins, MatchResult, MatchType, SceneId};
use serde::{Deserialize, Serialize};
use tracing::{debug, Level};

use crate::config::AudioParams;

/// One occurrence of an audio sub-fingerprint in another scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioHit {
    pub scene_id: SceneId,
    /// Sample index of the matching sub-fingerprint in that scene.
    pub offset: u32,
}

impl AlignedHit for AudioHit {
    fn scene_id(&self) -> SceneId {
        self.scene_id
    }

    fn offset(&self) -> i64 {
        i64::from(self.offset)
    }
}

/// Find scenes whose audio lines up with `query_hashes`.
///
/// Degenerate inputs (empty query, empty index, only self-hits, nothing
/// dense enough) produce an empty result; there is no error path.
pub fn match_audio(
    query_scene_id: SceneId,
    query_hashes: &[i32],
    hits: &HashMap<i32, Vec<AudioHit>>,
    params: &AudioParams,
) -> Vec<MatchResult> {
    if query_hashes.is_empty() || hits.is_empty() {
        return Vec::new();
    }

    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "matcher.audio",
        query_scene_id,
        query_len = query_hashes.len()
    );
    let _guard = span.enter();

    let mut bins = AlignmentBins::new(query_scene_id, params.delta_tolerance);
    for (position, hash) in query_hashes.iter().enumerate() {
        let Some(candidates) = hits.get(hash) else {
            continue;
        };
        for hit in candidates {
            bins.observe(position, hit);
        }
    }

    let results = params.scoring_policy().score(&bins, MatchType::Audio);
    debug!(
        candidate_scenes = bins.scene_count(),
        qualifying_scenes = results.len(),
        elapsed_micros = start.elapsed().as_micros() as u64,
        "audio_match_complete"
    );
    results
}
