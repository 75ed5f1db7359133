//! Library-wide duplicate rescan.
//!
//! Runs the enabled matchers once per scene against a
//! [`FingerprintLibrary`] and collects every duplicate pair. Each scene is an
//! independent matcher invocation, so the scan parallelizes across scenes
//! with rayon when enabled.

use std::time::Instant;

use matcher::{match_audio, match_visual, MatchConfig, MatchResult, MatchType, SceneId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, Level};

use crate::library::{FingerprintLibrary, SceneFingerprints};

/// Rescan settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescanConfig {
    /// Scan scenes in parallel on the rayon thread pool.
    pub parallel: bool,
    /// Which matchers to run for every scene.
    pub modalities: Vec<MatchType>,
    /// Audio hashes occurring more often than this across the library are
    /// ignored. `None` keeps every hash.
    pub max_hash_occurrences: Option<usize>,
}

impl Default for RescanConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            modalities: vec![MatchType::Audio, MatchType::Visual],
            max_hash_occurrences: None,
        }
    }
}

/// One query scene found to duplicate one candidate scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub query_scene_id: SceneId,
    pub candidate_scene_id: SceneId,
    pub match_type: MatchType,
    pub confidence: f64,
}

/// Outcome of a full rescan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RescanReport {
    pub scenes_scanned: usize,
    /// Sorted by query scene, then modality, then descending confidence.
    pub pairs: Vec<DuplicatePair>,
}

/// Match a single scene of `library` against the rest of it.
///
/// Returns `None` when `scene_id` is not in the library. Results from the
/// enabled modalities are concatenated, audio first.
pub fn match_scene(
    library: &FingerprintLibrary,
    scene_id: SceneId,
    config: &MatchConfig,
    modalities: &[MatchType],
) -> Option<Vec<MatchResult>> {
    let scene = library.scene(scene_id)?;
    Some(match_fingerprints(library, scene, config, modalities))
}

fn match_fingerprints(
    library: &FingerprintLibrary,
    scene: &SceneFingerprints,
    config: &MatchConfig,
    modalities: &[MatchType],
) -> Vec<MatchResult> {
    let mut results = Vec::new();

    if modalities.contains(&MatchType::Audio) {
        let hits = library.audio_hits(&scene.audio);
        results.extend(match_audio(scene.scene_id, &scene.audio, &hits, &config.audio));
    }

    if modalities.contains(&MatchType::Visual) {
        let lookup = Some(library.visual_lookup());
        match match_visual(scene.scene_id, &scene.visual, lookup, &config.visual) {
            Ok(visual) => results.extend(visual),
            Err(never) => match never {},
        }
    }

    results
}

/// Match every scene in `library` and collect the duplicate pairs.
pub fn rescan(
    library: &FingerprintLibrary,
    config: &MatchConfig,
    rescan_cfg: &RescanConfig,
) -> RescanReport {
    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "scenefp.rescan",
        scenes = library.len(),
        parallel = rescan_cfg.parallel
    );
    let _guard = span.enter();

    let pairs_for = |scene: &SceneFingerprints| -> Vec<DuplicatePair> {
        match_fingerprints(library, scene, config, &rescan_cfg.modalities)
            .into_iter()
            .map(|result| DuplicatePair {
                query_scene_id: scene.scene_id,
                candidate_scene_id: result.scene_id,
                match_type: result.match_type,
                confidence: result.confidence,
            })
            .collect()
    };

    let mut pairs: Vec<DuplicatePair> = if rescan_cfg.parallel {
        library.scenes().par_iter().flat_map_iter(pairs_for).collect()
    } else {
        library.scenes().iter().flat_map(pairs_for).collect()
    };

    pairs.sort_by(|a, b| {
        a.query_scene_id
            .cmp(&b.query_scene_id)
            .then_with(|| a.match_type.cmp(&b.match_type))
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.candidate_scene_id.cmp(&b.candidate_scene_id))
    });

    info!(
        pairs = pairs.len(),
        elapsed_micros = start.elapsed().as_micros() as u64,
        "rescan_complete"
    );

    RescanReport {
        scenes_scanned: library.len(),
        pairs,
    }
}
