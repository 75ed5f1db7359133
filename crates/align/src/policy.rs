//! Density scoring over alignment bins.
//!
//! Every bin of every candidate scene is checked against all gates
//! (minimum count, minimum span, density threshold). Among the bins that
//! pass, the densest one decides the scene's confidence. Choosing the bin
//! with the most raw hits first and only then checking its density would let
//! a large sparse bin hide a smaller dense one, so there is deliberately no
//! "best bin" pre-selection here.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bins::{AlignmentBins, Bin};
use crate::result::{MatchResult, MatchType};

/// Gate thresholds applied to each alignment bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Minimum unique aligned positions (`min_hashes` / `min_frames`).
    pub min_count: usize,
    /// Minimum `count / span` ratio.
    pub density_threshold: f64,
    /// Minimum aligned span in samples; `<= 0` disables the gate.
    pub min_span: i64,
}

/// Outcome of evaluating a single bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinVerdict {
    Qualifies { score: f64 },
    TooFewPositions { count: usize, min_count: usize },
    TooShort { span: usize, min_span: i64 },
    TooSparse { score: f64, threshold: f64 },
}

impl BinVerdict {
    pub fn score(&self) -> Option<f64> {
        match self {
            BinVerdict::Qualifies { score } => Some(*score),
            _ => None,
        }
    }
}

impl ScoringPolicy {
    pub fn new(min_count: usize, density_threshold: f64, min_span: i64) -> Self {
        Self {
            min_count,
            density_threshold,
            min_span,
        }
    }

    /// Run one bin through the gates in order: count, span, density.
    pub fn evaluate(&self, bin: &Bin) -> BinVerdict {
        let count = bin.count();
        if count < self.min_count {
            return BinVerdict::TooFewPositions {
                count,
                min_count: self.min_count,
            };
        }

        let span = bin.span();
        if self.min_span > 0 && (span as u64) < self.min_span as u64 {
            return BinVerdict::TooShort {
                span,
                min_span: self.min_span,
            };
        }

        let score = (count as f64 / span as f64).min(1.0);
        if score < self.density_threshold {
            return BinVerdict::TooSparse {
                score,
                threshold: self.density_threshold,
            };
        }

        BinVerdict::Qualifies { score }
    }

    /// Score every candidate scene in `bins`.
    ///
    /// Returns one result per scene with at least one qualifying bin, sorted
    /// by descending confidence and then ascending scene id.
    pub fn score(&self, bins: &AlignmentBins, match_type: MatchType) -> Vec<MatchResult> {
        let mut results = Vec::new();

        for (scene_id, scene_bins) in bins.iter() {
            let mut best: Option<f64> = None;
            for (key, bin) in scene_bins {
                match self.evaluate(bin) {
                    BinVerdict::Qualifies { score } => {
                        best = Some(best.map_or(score, |b| b.max(score)));
                    }
                    verdict => {
                        trace!(scene_id, bin_key = key, ?verdict, %match_type, "bin_rejected");
                    }
                }
            }
            if let Some(confidence) = best {
                results.push(MatchResult {
                    scene_id,
                    confidence,
                    match_type,
                });
            }
        }

        results.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.scene_id.cmp(&b.scene_id))
        });
        results
    }
}
