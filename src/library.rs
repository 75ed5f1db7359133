//! In-memory fingerprint library.
//!
//! A small, JSON-loadable collection of scene fingerprints that can answer
//! the two index questions the matchers ask: "which scenes contain this audio
//! sub-fingerprint?" and "which frames share this 16-bit chunk?". It backs
//! the CLI, the integration tests, and the benchmarks; production deployments
//! plug their own index service into [`matcher::match_audio`] and
//! [`matcher::match_visual`] instead.
//!
//! ## JSON format
//!
//! ```json
//! {
//!   "scenes": [
//!     { "scene_id": 1, "audio": [12, -7, 99], "visual": [81985529216486895] }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::fs;
use std::path::Path;

use matcher::{chunk, AudioHit, ChunkLookup, SceneId, VisualHit, PARTITIONS};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors produced while building a [`FingerprintLibrary`].
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read library file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse library JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("scene {0} appears more than once")]
    DuplicateScene(SceneId),

    #[error("scene {scene_id} has {len} samples; offsets must fit in u32")]
    SceneTooLong { scene_id: SceneId, len: usize },
}

/// Fingerprints of one scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneFingerprints {
    pub scene_id: SceneId,
    /// Audio sub-fingerprints, one per audio sample window.
    #[serde(default)]
    pub audio: Vec<i32>,
    /// Perceptual frame hashes, one per sampled frame.
    #[serde(default)]
    pub visual: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct LibraryFile {
    scenes: Vec<SceneFingerprints>,
}

/// Scene fingerprints plus the audio and chunk indexes built from them.
#[derive(Debug, Clone, Default)]
pub struct FingerprintLibrary {
    scenes: Vec<SceneFingerprints>,
    positions: HashMap<SceneId, usize>,
    audio_index: HashMap<i32, Vec<AudioHit>>,
    visual_index: [HashMap<u16, Vec<VisualHit>>; PARTITIONS],
    max_hash_occurrences: Option<usize>,
}

impl FingerprintLibrary {
    /// Build a library and its indexes. Scene ids must be unique.
    pub fn from_scenes(scenes: Vec<SceneFingerprints>) -> Result<Self, LibraryError> {
        let mut library = FingerprintLibrary::default();

        for scene in &scenes {
            if library.positions.insert(scene.scene_id, library.positions.len()).is_some() {
                return Err(LibraryError::DuplicateScene(scene.scene_id));
            }

            for (offset, hash) in scene.audio.iter().enumerate() {
                let offset = sample_offset(scene.scene_id, offset, scene.audio.len())?;
                library.audio_index.entry(*hash).or_default().push(AudioHit {
                    scene_id: scene.scene_id,
                    offset,
                });
            }

            for (frame, hash) in scene.visual.iter().enumerate() {
                let frame_offset = sample_offset(scene.scene_id, frame, scene.visual.len())?;
                let hit = VisualHit {
                    scene_id: scene.scene_id,
                    frame_offset,
                    hash: *hash,
                };
                for (partition, map) in library.visual_index.iter_mut().enumerate() {
                    map.entry(chunk(*hash, partition)).or_default().push(hit);
                }
            }
        }

        library.scenes = scenes;
        info!(
            scenes = library.scenes.len(),
            audio_hashes = library.audio_index.len(),
            "library_indexed"
        );
        Ok(library)
    }

    /// Parse the JSON library format.
    pub fn from_json_str(json: &str) -> Result<Self, LibraryError> {
        let file: LibraryFile = serde_json::from_str(json)?;
        Self::from_scenes(file.scenes)
    }

    /// Load a JSON library file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LibraryError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Drop audio hashes seen more often than `limit` from lookups.
    ///
    /// Silence and other near-constant audio produce the same sub-fingerprint
    /// across most of the library; those hashes only add noise.
    pub fn with_max_hash_occurrences(mut self, limit: Option<usize>) -> Self {
        self.max_hash_occurrences = limit;
        self
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Scenes in load order.
    pub fn scenes(&self) -> &[SceneFingerprints] {
        &self.scenes
    }

    pub fn scene(&self, scene_id: SceneId) -> Option<&SceneFingerprints> {
        self.positions.get(&scene_id).map(|idx| &self.scenes[*idx])
    }

    /// Hits for every distinct hash in `query`, minus popular hashes.
    pub fn audio_hits(&self, query: &[i32]) -> HashMap<i32, Vec<AudioHit>> {
        let distinct: HashSet<i32> = query.iter().copied().collect();
        distinct
            .into_iter()
            .filter_map(|hash| {
                let hits = self.audio_index.get(&hash)?;
                match self.max_hash_occurrences {
                    Some(limit) if hits.len() > limit => None,
                    _ => Some((hash, hits.clone())),
                }
            })
            .collect()
    }

    /// A [`ChunkLookup`] over this library's per-partition chunk index.
    pub fn visual_lookup(&self) -> LibraryLookup<'_> {
        LibraryLookup { library: self }
    }
}

/// Chunk lookup backed by a [`FingerprintLibrary`]. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct LibraryLookup<'a> {
    library: &'a FingerprintLibrary,
}

impl ChunkLookup for LibraryLookup<'_> {
    type Error = Infallible;

    fn lookup(&mut self, chunks: &[u16], partition: usize) -> Result<Vec<VisualHit>, Infallible> {
        let Some(index) = self.library.visual_index.get(partition) else {
            return Ok(Vec::new());
        };
        Ok(chunks
            .iter()
            .filter_map(|value| index.get(value))
            .flatten()
            .copied()
            .collect())
    }
}

fn sample_offset(scene_id: SceneId, index: usize, len: usize) -> Result<u32, LibraryError> {
    u32::try_from(index).map_err(|_| LibraryError::SceneTooLong { scene_id, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(scene_id: SceneId, audio: Vec<i32>, visual: Vec<u64>) -> SceneFingerprints {
        SceneFingerprints {
            scene_id,
            audio,
            visual,
        }
    }

    #[test]
    fn duplicate_scene_ids_rejected() {
        let err = FingerprintLibrary::from_scenes(vec![
            scene(1, vec![1], vec![]),
            scene(1, vec![2], vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, LibraryError::DuplicateScene(1)));
    }

    #[test]
    fn audio_hits_cover_distinct_query_hashes() {
        let library = FingerprintLibrary::from_scenes(vec![
            scene(1, vec![10, 20, 10], vec![]),
            scene(2, vec![20, 30], vec![]),
        ])
        .unwrap();

        let hits = library.audio_hits(&[10, 10, 20, 99]);
        assert_eq!(hits.len(), 2);
        assert_eq!(
            hits[&10],
            vec![
                AudioHit { scene_id: 1, offset: 0 },
                AudioHit { scene_id: 1, offset: 2 },
            ]
        );
        assert_eq!(hits[&20].len(), 2);
        assert!(!hits.contains_key(&99));
    }

    #[test]
    fn popular_hashes_are_filtered() {
        let library = FingerprintLibrary::from_scenes(vec![
            scene(1, vec![0, 0, 0, 5], vec![]),
            scene(2, vec![0, 6], vec![]),
        ])
        .unwrap()
        .with_max_hash_occurrences(Some(3));

        let hits = library.audio_hits(&[0, 5, 6]);
        assert!(!hits.contains_key(&0));
        assert!(hits.contains_key(&5));
        assert!(hits.contains_key(&6));
    }

    #[test]
    fn visual_lookup_serves_each_partition() {
        let hash = 0x4444_3333_2222_1111u64;
        let library = FingerprintLibrary::from_scenes(vec![scene(7, vec![], vec![0, hash])]).unwrap();
        let mut lookup = library.visual_lookup();

        for (partition, value) in [0x1111u16, 0x2222, 0x3333, 0x4444].into_iter().enumerate() {
            let Ok(hits) = lookup.lookup(&[value, 0xFFFF], partition);
            assert_eq!(
                hits,
                vec![VisualHit { scene_id: 7, frame_offset: 1, hash }],
                "partition {partition}"
            );
        }
        let Ok(hits) = lookup.lookup(&[0x1111], PARTITIONS);
        assert!(hits.is_empty());
    }

    #[test]
    fn json_round_trip_through_loader() {
        let json = r#"{"scenes": [
            {"scene_id": 3, "audio": [1, 2, 3]},
            {"scene_id": 4, "visual": [42]}
        ]}"#;
        let library = FingerprintLibrary::from_json_str(json).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.scene(3).map(|s| s.audio.len()), Some(3));
        assert_eq!(library.scene(4).map(|s| s.visual.clone()), Some(vec![42]));
        assert!(library.scene(5).is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = FingerprintLibrary::from_json_str("{\"scenes\": 3}").unwrap_err();
        assert!(matches!(err, LibraryError::Parse(_)));
    }
}
