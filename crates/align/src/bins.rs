//! Delta-offset binning for fingerprint alignment.
//!
//! A hit says "query position `p` looks like candidate offset `o`". Two
//! scenes that are the same content shifted in time produce many hits with
//! the same `o - p` delta, so observations are grouped by a quantized delta
//! (the bin key) per candidate scene.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::result::SceneId;

/// Bin width used when the caller supplies a tolerance `<= 0`.
pub const DEFAULT_DELTA_TOLERANCE: i64 = 2;

/// Integer division rounding toward negative infinity.
///
/// Rust's `/` truncates toward zero, which would give bin 0 three members
/// `{-1, 0, 1}` for a tolerance of 2. Flooring keeps every bin exactly
/// `divisor` deltas wide: bin -1 is `{-2, -1}` and bin 0 is `{0, 1}`.
///
/// `divisor` must be non-zero.
#[inline]
pub fn floor_div(dividend: i64, divisor: i64) -> i64 {
    debug_assert!(divisor != 0, "floor_div by zero");
    let quotient = dividend / divisor;
    let remainder = dividend % divisor;
    if remainder != 0 && ((remainder < 0) != (divisor < 0)) {
        quotient - 1
    } else {
        quotient
    }
}

/// Resolve a caller-supplied tolerance to the bin width actually used.
#[inline]
pub fn effective_tolerance(delta_tolerance: i64) -> i64 {
    if delta_tolerance <= 0 {
        DEFAULT_DELTA_TOLERANCE
    } else {
        delta_tolerance
    }
}

/// Anything that can be aligned against a query position.
///
/// Audio and visual hits both expose the candidate scene and the offset of
/// the matching sample inside that scene's own timeline.
pub trait AlignedHit {
    /// Scene the hit belongs to.
    fn scene_id(&self) -> SceneId;
    /// Sample offset of the hit inside its scene.
    fn offset(&self) -> i64;
}

/// One alignment bucket: the unique query positions whose delta fell into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    positions: HashSet<usize>,
    min_position: usize,
    max_position: usize,
}

impl Bin {
    fn new(position: usize) -> Self {
        let mut positions = HashSet::new();
        positions.insert(position);
        Self {
            positions,
            min_position: position,
            max_position: position,
        }
    }

    /// Record a query position. Returns `false` if it was already present.
    fn record(&mut self, position: usize) -> bool {
        if !self.positions.insert(position) {
            return false;
        }
        self.min_position = self.min_position.min(position);
        self.max_position = self.max_position.max(position);
        true
    }

    /// Number of distinct query positions aligned into this bin.
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn min_position(&self) -> usize {
        self.min_position
    }

    pub fn max_position(&self) -> usize {
        self.max_position
    }

    /// Aligned duration in samples, never less than 1.
    pub fn span(&self) -> usize {
        (self.max_position - self.min_position + 1).max(1)
    }

    /// `count / span`, capped at 1.0.
    pub fn density(&self) -> f64 {
        (self.count() as f64 / self.span() as f64).min(1.0)
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.contains(&position)
    }
}

/// Per-invocation alignment state: candidate scene -> bin key -> [`Bin`].
///
/// Hits that point back at the query scene are dropped on entry, so no
/// caller can accidentally let a scene match itself.
#[derive(Debug, Clone)]
pub struct AlignmentBins {
    query_scene_id: SceneId,
    tolerance: i64,
    scenes: HashMap<SceneId, HashMap<i64, Bin>>,
}

impl AlignmentBins {
    /// Create empty bins for `query_scene_id`. A tolerance `<= 0` falls back
    /// to [`DEFAULT_DELTA_TOLERANCE`].
    pub fn new(query_scene_id: SceneId, delta_tolerance: i64) -> Self {
        Self {
            query_scene_id,
            tolerance: effective_tolerance(delta_tolerance),
            scenes: HashMap::new(),
        }
    }

    pub fn query_scene_id(&self) -> SceneId {
        self.query_scene_id
    }

    /// Bin width in use after defaulting.
    pub fn tolerance(&self) -> i64 {
        self.tolerance
    }

    /// Bin key for a raw `candidate offset - query position` delta.
    pub fn bin_key(&self, delta: i64) -> i64 {
        floor_div(delta, self.tolerance)
    }

    /// Record that `query_position` aligned with `candidate_offset` in
    /// `scene_id`.
    ///
    /// Returns `true` only when a new unique position was added to a bin.
    /// Self-hits and repeated positions return `false`.
    pub fn record(&mut self, scene_id: SceneId, query_position: usize, candidate_offset: i64) -> bool {
        if scene_id == self.query_scene_id {
            return false;
        }
        // Both sides fit comfortably in i64; the subtraction never wraps.
        let delta = candidate_offset - query_position as i64;
        let key = self.bin_key(delta);
        match self.scenes.entry(scene_id).or_default().entry(key) {
            Entry::Occupied(mut bin) => bin.get_mut().record(query_position),
            Entry::Vacant(slot) => {
                slot.insert(Bin::new(query_position));
                true
            }
        }
    }

    /// Record a hit observed for `query_position`.
    pub fn observe<H: AlignedHit + ?Sized>(&mut self, query_position: usize, hit: &H) -> bool {
        self.record(hit.scene_id(), query_position, hit.offset())
    }

    /// Number of candidate scenes with at least one bin.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Candidate scenes that produced at least one bin, in arbitrary order.
    pub fn scenes(&self) -> impl Iterator<Item = SceneId> + '_ {
        self.scenes.keys().copied()
    }

    /// All bins of one candidate scene as `(bin key, bin)` pairs.
    pub fn bins_for(&self, scene_id: SceneId) -> impl Iterator<Item = (i64, &Bin)> + '_ {
        self.scenes
            .get(&scene_id)
            .into_iter()
            .flat_map(|bins| bins.iter().map(|(key, bin)| (*key, bin)))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (SceneId, &HashMap<i64, Bin>)> + '_ {
        self.scenes.iter().map(|(scene, bins)| (*scene, bins))
    }
}
