//! Match result types shared by every matcher.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a scene in the caller's library.
pub type SceneId = u64;

/// Which fingerprint modality produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Audio sub-fingerprint alignment.
    Audio,
    /// Per-frame perceptual hash alignment.
    Visual,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Audio => "audio",
            MatchType::Visual => "visual",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate scene judged to be a duplicate of the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The matching candidate scene. Never the query scene itself.
    pub scene_id: SceneId,
    /// Density of the best qualifying alignment bin, in `[0.0, 1.0]`.
    pub confidence: f64,
    pub match_type: MatchType,
}
