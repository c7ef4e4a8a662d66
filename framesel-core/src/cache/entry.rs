//! On-disk shape of a cache entry.
//!
//! ```json
//! {
//!   "version": "1",
//!   "created_utc": "2025-10-08T03:12:45Z",
//!   "cache_key": "sha256:<hex>",
//!   "inputs": { "clips": [...], "config_fingerprint": {...} },
//!   "selections": [ {"frame_index": 14972, "ts_tc": "00:10:23.833", "type": "Bright", ...} ],
//!   "metrics": [ {"frame_index": 14972, "brightness": 0.82, "motion": 0.01} ]
//! }
//! ```
//!
//! `metrics` is optional and, when present, aligned 1:1 with `selections`.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CacheKey;
use crate::clip::ClipDescriptor;
use crate::config::SelectionConfig;
use crate::selection::{SelectionMetric, SelectionRecord, SelectionResult};
use crate::warnings::{RunWarnings, WarningKind};

/// Format version written to and accepted from disk.
pub const CACHE_FORMAT_VERSION: &str = "1";

const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Inputs the key was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheInputs {
    pub clips: Vec<ClipDescriptor>,
    pub config_fingerprint: SelectionConfig,
}

/// One persisted selection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub version: String,
    pub created_utc: String,
    pub cache_key: CacheKey,
    pub inputs: CacheInputs,
    pub selections: Vec<SelectionRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<SelectionMetric>,
}

impl CacheEntry {
    /// Wraps a result for persisting, stamped with the current time.
    pub fn from_result(result: &SelectionResult) -> Self {
        Self::from_result_at(result, Utc::now())
    }

    pub fn from_result_at(result: &SelectionResult, created: DateTime<Utc>) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION.to_string(),
            created_utc: created.format(CREATED_FORMAT).to_string(),
            cache_key: result.cache_key.clone(),
            inputs: CacheInputs {
                clips: result.clips.clone(),
                config_fingerprint: result.config.clone(),
            },
            selections: result.selections.clone(),
            metrics: result.metrics.clone(),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.created_utc, CREATED_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Converts to a result, keeping only what can be trusted.
    ///
    /// A metric snapshot that does not line up with the selections is
    /// dropped. Selections whose frame index is outside their clip, whose
    /// clip is missing, or that repeat an earlier index are skipped. Each
    /// kind of problem is reported once through `warnings`.
    pub fn into_result(self, warnings: &RunWarnings) -> SelectionResult {
        let CacheEntry {
            cache_key,
            inputs,
            selections,
            mut metrics,
            ..
        } = self;

        let aligned = metrics.len() == selections.len()
            && metrics
                .iter()
                .zip(&selections)
                .all(|(m, s)| m.frame_index == s.frame_index);
        if !metrics.is_empty() && !aligned {
            warnings.warn_once(
                WarningKind::CacheMetricMismatch,
                &format!(
                    "Cache entry {} has {} metric snapshots for {} selections; ignoring the snapshots",
                    cache_key,
                    metrics.len(),
                    selections.len()
                ),
            );
            metrics.clear();
        }
        let keep_metrics = !metrics.is_empty();
        let mut metrics = metrics.into_iter();

        let mut seen = BTreeSet::new();
        let mut kept_selections = Vec::with_capacity(selections.len());
        let mut kept_metrics = Vec::new();
        for record in selections {
            let metric = if keep_metrics { metrics.next() } else { None };
            let in_range = inputs
                .clips
                .iter()
                .find(|c| c.role == record.clip_role)
                .is_some_and(|c| record.frame_index < c.frame_count);
            if !in_range || !seen.insert(record.frame_index) {
                warnings.warn_once(
                    WarningKind::CacheOutOfRange,
                    &format!(
                        "Cache entry {} lists unusable frame {} ({}); skipping it",
                        cache_key, record.frame_index, record.clip_role
                    ),
                );
                continue;
            }
            kept_selections.push(record);
            kept_metrics.extend(metric);
        }
        kept_selections.sort_by_key(|s| s.frame_index);

        SelectionResult {
            cache_key,
            clips: inputs.clips,
            config: inputs.config_fingerprint,
            selections: kept_selections,
            metrics: kept_metrics,
        }
    }
}
