//! Visual matcher: partition lookup, Hamming verification, then alignment.
//!
//! A 64-bit frame hash is split into four non-overlapping 16-bit chunks
//! (bits `[0,16)`, `[16,32)`, `[32,48)`, `[48,64)`). Two hashes within a few
//! bits of each other almost always agree on at least one whole chunk, so the
//! external index is queried once per partition by chunk value. A chunk match
//! is only a hint: every returned hit is confirmed with the true Hamming
//! distance on the full hash before it reaches the aligner.
//!
//! The same true match is usually found through more than one partition.
//! Alignment bins store query positions as a set, so each query frame still
//! counts once.

use std::collections::HashMap;
use std::time::Instant;

use align::{AlignedHit, AlignmentBins, MatchResult, MatchType, SceneId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn, Level};

use crate::config::VisualParams;

/// Number of 16-bit partitions in a 64-bit frame hash.
pub const PARTITIONS: usize = 4;

/// Width of one partition in bits.
pub const CHUNK_BITS: u32 = 16;

/// Extract partition `partition` (0..4) of `hash`.
#[inline]
pub fn chunk(hash: u64, partition: usize) -> u16 {
    debug_assert!(partition < PARTITIONS, "partition {partition} out of range");
    (hash >> (partition as u32 * CHUNK_BITS)) as u16
}

/// Number of differing bits between two frame hashes.
#[inline]
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// One frame of another scene whose chunk matched a query chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHit {
    pub scene_id: SceneId,
    /// Frame index inside that scene.
    pub frame_offset: u32,
    /// Full 64-bit perceptual hash of that frame, used for verification.
    pub hash: u64,
}

impl AlignedHit for VisualHit {
    fn scene_id(&self) -> SceneId {
        self.scene_id
    }

    fn offset(&self) -> i64 {
        i64::from(self.frame_offset)
    }
}

/// Partitioned index lookup used by [`match_visual`].
///
/// Given the distinct chunk values of one partition, return every indexed
/// frame whose chunk in that partition equals one of them. Implemented for
/// any `FnMut(&[u16], usize) -> Result<Vec<VisualHit>, E>` closure.
///
/// A lookup that talks to the network or disk owns its own timeouts; the
/// matcher just stops at the first error.
pub trait ChunkLookup {
    type Error;

    fn lookup(&mut self, chunks: &[u16], partition: usize) -> Result<Vec<VisualHit>, Self::Error>;
}

impl<F, E> ChunkLookup for F
where
    F: FnMut(&[u16], usize) -> Result<Vec<VisualHit>, E>,
{
    type Error = E;

    fn lookup(&mut self, chunks: &[u16], partition: usize) -> Result<Vec<VisualHit>, E> {
        self(chunks, partition)
    }
}

/// Find scenes whose frames line up with `query_hashes`.
///
/// An empty query or a missing lookup yields `Ok` with no results. A lookup
/// error aborts the whole call and is returned unchanged; no partial results
/// are produced.
pub fn match_visual<L>(
    query_scene_id: SceneId,
    query_hashes: &[u64],
    lookup: Option<L>,
    params: &VisualParams,
) -> Result<Vec<MatchResult>, L::Error>
where
    L: ChunkLookup,
{
    let Some(mut lookup) = lookup else {
        return Ok(Vec::new());
    };
    if query_hashes.is_empty() {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "matcher.visual",
        query_scene_id,
        query_len = query_hashes.len()
    );
    let _guard = span.enter();

    let mut bins = AlignmentBins::new(query_scene_id, params.delta_tolerance);

    for partition in 0..PARTITIONS {
        let mut positions_by_chunk: HashMap<u16, Vec<usize>> = HashMap::new();
        for (position, hash) in query_hashes.iter().enumerate() {
            positions_by_chunk
                .entry(chunk(*hash, partition))
                .or_default()
                .push(position);
        }

        let mut chunk_values: Vec<u16> = positions_by_chunk.keys().copied().collect();
        chunk_values.sort_unstable();

        let hits = match lookup.lookup(&chunk_values, partition) {
            Ok(hits) => hits,
            Err(err) => {
                warn!(
                    partition,
                    elapsed_micros = start.elapsed().as_micros() as u64,
                    "visual_lookup_failure"
                );
                return Err(err);
            }
        };

        let mut accepted = 0usize;
        for hit in &hits {
            // The index may return chunks we never asked for.
            let Some(positions) = positions_by_chunk.get(&chunk(hit.hash, partition)) else {
                continue;
            };
            for &position in positions {
                if hamming_distance(query_hashes[position], hit.hash) > params.hamming_max {
                    continue;
                }
                accepted += 1;
                bins.observe(position, hit);
            }
        }

        trace!(
            partition,
            chunk_values = chunk_values.len(),
            hits = hits.len(),
            accepted,
            "visual_partition_scanned"
        );
    }

    let results = params.scoring_policy().score(&bins, MatchType::Visual);
    debug!(
        candidate_scenes = bins.scene_count(),
        qualifying_scenes = results.len(),
        elapsed_micros = start.elapsed().as_micros() as u64,
        "visual_match_complete"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    type Index = [HashMap<u16, Vec<VisualHit>>; PARTITIONS];

    fn params() -> VisualParams {
        VisualParams::new()
            .with_hamming_max(0)
            .with_min_frames(5)
            .with_density_threshold(0.5)
            .with_delta_tolerance(2)
            .with_min_span(0)
    }

    /// Hashes whose four chunks are all distinct across frames.
    fn distinct_hashes(n: usize) -> Vec<u64> {
        (0..n as u64)
            .map(|i| {
                let c = i + 1;
                c | (c + 1000) << 16 | (c + 2000) << 32 | (c + 3000) << 48
            })
            .collect()
    }

    fn build_index(frames: &[(SceneId, u32, u64)]) -> Index {
        let mut index: Index = Default::default();
        for &(scene_id, frame_offset, hash) in frames {
            for (partition, map) in index.iter_mut().enumerate() {
                map.entry(chunk(hash, partition)).or_default().push(VisualHit {
                    scene_id,
                    frame_offset,
                    hash,
                });
            }
        }
        index
    }

    fn lookup_in(
        index: &Index,
    ) -> impl FnMut(&[u16], usize) -> Result<Vec<VisualHit>, Infallible> + '_ {
        move |chunks: &[u16], partition: usize| -> Result<Vec<VisualHit>, Infallible> {
            Ok(chunks
                .iter()
                .filter_map(|c| index[partition].get(c))
                .flatten()
                .copied()
                .collect())
        }
    }

    fn scene_frames(scene_id: SceneId, hashes: &[u64], shift: u32) -> Vec<(SceneId, u32, u64)> {
        hashes
            .iter()
            .enumerate()
            .map(|(i, h)| (scene_id, i as u32 + shift, *h))
            .collect()
    }

    #[test]
    fn chunk_extracts_each_partition() {
        let hash = 0x4444_3333_2222_1111u64;
        assert_eq!(chunk(hash, 0), 0x1111);
        assert_eq!(chunk(hash, 1), 0x2222);
        assert_eq!(chunk(hash, 2), 0x3333);
        assert_eq!(chunk(hash, 3), 0x4444);
    }

    #[test]
    fn hamming_distance_counts_bits() {
        assert_eq!(hamming_distance(0, 0), 0);
        assert_eq!(hamming_distance(0, u64::MAX), 64);
        assert_eq!(hamming_distance(0b1011, 0b0001), 2);
    }

    #[test]
    fn identical_frames_match_exactly() {
        let hashes = distinct_hashes(10);
        let index = build_index(&scene_frames(2, &hashes, 0));

        let results = match_visual(1, &hashes, Some(lookup_in(&index)), &params()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scene_id, 2);
        assert_eq!(results[0].match_type, MatchType::Visual);
        assert!((results[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cross_partition_rediscovery_counts_once() {
        // Every frame matches through all four partitions.
        let hashes = distinct_hashes(12);
        let index = build_index(&scene_frames(2, &hashes, 0));
        let results = match_visual(1, &hashes, Some(lookup_in(&index)), &params()).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].confidence <= 1.0);

        // Five frames are the minimum; four real frames rediscovered four
        // times each must not be mistaken for sixteen.
        let short = &hashes[..4];
        let index = build_index(&scene_frames(2, short, 0));
        let results = match_visual(1, short, Some(lookup_in(&index)), &params()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn hamming_gate_filters_chunk_collisions() {
        let hashes = distinct_hashes(10);
        // Flip 10 bits outside partition 0: chunk 0 still matches.
        let far: Vec<u64> = hashes.iter().map(|h| h ^ (0x3FFu64 << 20)).collect();
        // Flip 3 bits outside partition 0.
        let near: Vec<u64> = hashes.iter().map(|h| h ^ (0b111u64 << 40)).collect();
        assert_eq!(hamming_distance(hashes[0], far[0]), 10);
        assert_eq!(hamming_distance(hashes[0], near[0]), 3);

        let mut frames = scene_frames(2, &far, 0);
        frames.extend(scene_frames(3, &near, 0));
        let index = build_index(&frames);

        let gate = params().with_hamming_max(5);
        let results = match_visual(1, &hashes, Some(lookup_in(&index)), &gate).unwrap();
        let scenes: Vec<_> = results.iter().map(|r| r.scene_id).collect();
        assert_eq!(scenes, vec![3]);
    }

    #[test]
    fn zero_hamming_max_means_exact_only() {
        let hashes = distinct_hashes(10);
        let near: Vec<u64> = hashes.iter().map(|h| h ^ (1u64 << 63)).collect();
        let index = build_index(&scene_frames(2, &near, 0));

        let exact = match_visual(1, &hashes, Some(lookup_in(&index)), &params()).unwrap();
        assert!(exact.is_empty());

        let loose = params().with_hamming_max(1);
        let results = match_visual(1, &hashes, Some(lookup_in(&index)), &loose).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn missing_lookup_or_empty_query_is_empty() {
        let hashes = distinct_hashes(10);
        let index = build_index(&scene_frames(2, &hashes, 0));

        let none: Option<fn(&[u16], usize) -> Result<Vec<VisualHit>, Infallible>> = None;
        assert!(match_visual(1, &hashes, none, &params()).unwrap().is_empty());
        assert!(match_visual(1, &[], Some(lookup_in(&index)), &params())
            .unwrap()
            .is_empty());
    }

    #[derive(Debug, PartialEq)]
    struct IndexDown(&'static str);

    #[test]
    fn lookup_error_aborts_without_partial_results() {
        let hashes = distinct_hashes(10);
        let index = build_index(&scene_frames(2, &hashes, 0));
        let mut calls = Vec::new();

        let failing = |chunks: &[u16], partition: usize| -> Result<Vec<VisualHit>, IndexDown> {
            calls.push(partition);
            if partition == 2 {
                return Err(IndexDown("partition 2 unavailable"));
            }
            Ok(chunks
                .iter()
                .filter_map(|c| index[partition].get(c))
                .flatten()
                .copied()
                .collect())
        };

        let err = match_visual(1, &hashes, Some(failing), &params()).unwrap_err();
        assert_eq!(err, IndexDown("partition 2 unavailable"));
        assert_eq!(calls, vec![0, 1, 2]);
    }

    #[test]
    fn lookup_receives_distinct_chunks_per_partition() {
        // All frames share chunk 3; the other chunks are distinct.
        let hashes: Vec<u64> = distinct_hashes(6)
            .into_iter()
            .map(|h| (h & 0x0000_FFFF_FFFF_FFFF) | (0xABCDu64 << 48))
            .collect();
        let mut seen: Vec<(usize, usize)> = Vec::new();
        let recorder = |chunks: &[u16], partition: usize| -> Result<Vec<VisualHit>, Infallible> {
            seen.push((partition, chunks.len()));
            Ok(Vec::new())
        };
        let results = match_visual(1, &hashes, Some(recorder), &params()).unwrap();
        assert!(results.is_empty());
        assert_eq!(seen, vec![(0, 6), (1, 6), (2, 6), (3, 1)]);
    }

    #[test]
    fn shared_chunk_fans_out_to_every_query_frame() {
        // Query frames 0..6 all share chunk 3 with one candidate frame, but
        // only the identical frame passes verification.
        let hashes: Vec<u64> = distinct_hashes(6)
            .into_iter()
            .map(|h| (h & 0x0000_FFFF_FFFF_FFFF) | (0xABCDu64 << 48))
            .collect();
        let index = build_index(&[(2, 3, hashes[3])]);
        let mut hits_returned = 0;
        let counting = |chunks: &[u16], partition: usize| -> Result<Vec<VisualHit>, Infallible> {
            let hits: Vec<VisualHit> = chunks
                .iter()
                .filter_map(|c| index[partition].get(c))
                .flatten()
                .copied()
                .collect();
            hits_returned += hits.len();
            Ok(hits)
        };
        let one_frame = params().with_min_frames(1);
        let results = match_visual(1, &hashes, Some(counting), &one_frame).unwrap();
        assert_eq!(hits_returned, 4);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scene_id, 2);
        assert!((results[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn self_matches_are_filtered() {
        let hashes = distinct_hashes(10);
        let index = build_index(&scene_frames(1, &hashes, 0));
        let results = match_visual(1, &hashes, Some(lookup_in(&index)), &params()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn large_frame_offsets_align() {
        let hashes = distinct_hashes(10);
        let index = build_index(&scene_frames(2, &hashes, u32::MAX - 20));
        let results = match_visual(1, &hashes, Some(lookup_in(&index)), &params()).unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].confidence - 1.0).abs() < 1e-9);
    }
}
