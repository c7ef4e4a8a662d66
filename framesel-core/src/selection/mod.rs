// ============================================================================
// framesel-core/src/selection/mod.rs
// ============================================================================
//
// SELECTION: Categories, Records and Results
//
// This module holds the data that flows out of the engine. The planner turns
// per-clip metric series into `SelectionRecord`s; a `SelectionResult` bundles
// those records with the cache key and the inputs that produced them, so a
// later run can compare and reuse it.
//
// KEY COMPONENTS:
// - SelectionCategory: the five pick categories (external contract)
// - SelectionRecord: one selected frame, in its persisted shape
// - SelectionMetric: metric snapshot of a selected frame
// - SelectionResult: ordered records plus key, clips and config
// - planner: the pure metrics -> selections function

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::clip::{ClipDescriptor, ClipRole};
use crate::config::SelectionConfig;

pub mod planner;
mod ranking;

pub use planner::plan;
pub use ranking::quantile;

/// Suffix appended to the engine tag for picks made from fallback metrics.
pub const FALLBACK_SUFFIX: &str = "+fallback";

/// Why a frame was picked. Spelling and casing are part of the cache format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SelectionCategory {
    Dark,
    Bright,
    Motion,
    Random,
    User,
}

impl SelectionCategory {
    pub const ALL: [SelectionCategory; 5] = [
        SelectionCategory::Dark,
        SelectionCategory::Bright,
        SelectionCategory::Motion,
        SelectionCategory::Random,
        SelectionCategory::User,
    ];

    /// Claim order used when no priority is configured.
    pub const DEFAULT_PRIORITY: [SelectionCategory; 5] = [
        SelectionCategory::User,
        SelectionCategory::Dark,
        SelectionCategory::Bright,
        SelectionCategory::Motion,
        SelectionCategory::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionCategory::Dark => "Dark",
            SelectionCategory::Bright => "Bright",
            SelectionCategory::Motion => "Motion",
            SelectionCategory::Random => "Random",
            SelectionCategory::User => "User",
        }
    }

    /// Case-insensitive parse, for command-line and environment input.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for SelectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selected frame.
///
/// Field order and names match the `selections` array of the cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub frame_index: u64,
    /// `HH:MM:SS.mmm` at the clip's frame rate.
    #[serde(rename = "ts_tc", default, skip_serializing_if = "Option::is_none")]
    pub timecode: Option<String>,
    #[serde(rename = "type")]
    pub category: SelectionCategory,
    /// Brightness for Dark/Bright, smoothed motion for Motion, none otherwise.
    pub score: Option<f64>,
    /// Engine identity; carries [`FALLBACK_SUFFIX`] in degraded mode.
    #[serde(rename = "source")]
    pub source_tag: String,
    pub clip_role: ClipRole,
    #[serde(default)]
    pub notes: String,
}

impl SelectionRecord {
    pub fn is_fallback(&self) -> bool {
        self.source_tag.ends_with(FALLBACK_SUFFIX)
    }
}

/// Metrics of a selected frame at the time it was selected.
///
/// For Random and User picks this is the nearest sampled frame; `None` when
/// the clip had no samples at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMetric {
    pub frame_index: u64,
    pub brightness: Option<f64>,
    pub motion: Option<f64>,
}

/// The outcome of one selection run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub cache_key: CacheKey,
    /// Clips in role order, exactly as fingerprinted.
    pub clips: Vec<ClipDescriptor>,
    pub config: SelectionConfig,
    /// Sorted by ascending `frame_index`, unique.
    pub selections: Vec<SelectionRecord>,
    /// Aligned 1:1 with `selections`, or empty when unavailable.
    pub metrics: Vec<SelectionMetric>,
}

impl SelectionResult {
    pub fn frame_indices(&self) -> Vec<u64> {
        self.selections.iter().map(|s| s.frame_index).collect()
    }

    pub fn by_category(&self, category: SelectionCategory) -> impl Iterator<Item = &SelectionRecord> {
        self.selections.iter().filter(move |s| s.category == category)
    }

    /// Whether any pick came from fallback metrics.
    pub fn is_degraded(&self) -> bool {
        self.selections.iter().any(SelectionRecord::is_fallback)
    }
}
