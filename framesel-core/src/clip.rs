//! Clip descriptors and selection windows.
//!
//! A [`ClipDescriptor`] is captured once per run from filesystem metadata and
//! a probe of the clip, and is never mutated afterwards. Its serialized form
//! is what the cache file stores under `inputs.clips`.

use std::fmt;
use std::iter::StepBy;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SelectionConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::FrameSource;

/// Which side of the comparison a clip is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClipRole {
    #[serde(rename = "ref")]
    Reference,
    #[serde(rename = "tgt")]
    Target,
}

impl ClipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipRole::Reference => "ref",
            ClipRole::Target => "tgt",
        }
    }
}

impl fmt::Display for ClipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one input clip, as far as the cache is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    pub role: ClipRole,
    pub path: PathBuf,
    #[serde(rename = "size")]
    pub byte_size: u64,
    #[serde(rename = "mtime")]
    pub modified_time: DateTime<Utc>,
    /// Optional caller-supplied content digest.
    #[serde(rename = "sha1", default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(rename = "fps")]
    pub frame_rate: f64,
    #[serde(rename = "frames")]
    pub frame_count: u64,
}

impl ClipDescriptor {
    /// Captures a descriptor from filesystem metadata and a frame-source probe.
    ///
    /// The stored path is canonical, so `./a.mkv` and `a.mkv` describe the same clip.
    pub fn capture<S: FrameSource + ?Sized>(
        role: ClipRole,
        path: &Path,
        source: &S,
    ) -> CoreResult<Self> {
        // The absolute form is what gets fingerprinted.
        let path = &std::fs::canonicalize(path).map_err(|e| {
            CoreError::PathError(format!("Failed to resolve '{}': {}", path.display(), e))
        })?;
        let metadata = std::fs::metadata(path).map_err(|e| {
            CoreError::PathError(format!("Failed to read metadata for '{}': {}", path.display(), e))
        })?;
        let modified_time = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .map_err(|e| {
                CoreError::PathError(format!(
                    "Modification time unavailable for '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        let probe = source.probe(path).map_err(|e| CoreError::VideoInfoError(e.to_string()))?;

        log::debug!(
            "Captured {} clip {}: {} bytes, {:.3} fps, {} frames",
            role,
            path.display(),
            metadata.len(),
            probe.frame_rate,
            probe.frame_count
        );

        Ok(Self {
            role,
            path: path.to_path_buf(),
            byte_size: metadata.len(),
            modified_time,
            content_hash: None,
            frame_rate: probe.frame_rate,
            frame_count: probe.frame_count,
        })
    }

    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    /// Frames eligible for automatic selection under `config`.
    pub fn window(&self, config: &SelectionConfig) -> SelectionWindow {
        SelectionWindow::from_seconds(
            self.frame_count,
            self.frame_rate,
            config.ignore_lead_seconds,
            config.ignore_trail_seconds,
        )
    }
}

/// Validates a clip set before it is fingerprinted.
pub(crate) fn validate_clips(clips: &[ClipDescriptor]) -> CoreResult<()> {
    if clips.is_empty() {
        return Err(CoreError::Config("at least one clip is required".to_string()));
    }
    for (i, clip) in clips.iter().enumerate() {
        if clips[..i].iter().any(|other| other.role == clip.role) {
            return Err(CoreError::Config(format!(
                "clip role '{}' appears more than once",
                clip.role
            )));
        }
        if !clip.frame_rate.is_finite() || clip.frame_rate <= 0.0 {
            return Err(CoreError::Config(format!(
                "clip {} has invalid frame rate {}",
                clip.path.display(),
                clip.frame_rate
            )));
        }
    }
    Ok(())
}

/// The clip that user frames are attributed to: the target when present,
/// otherwise the first clip.
pub(crate) fn primary_clip(clips: &[ClipDescriptor]) -> Option<&ClipDescriptor> {
    clips
        .iter()
        .find(|c| c.role == ClipRole::Target)
        .or_else(|| clips.first())
}

/// Half-open range `[lead, trail)` of frames eligible for automatic selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionWindow {
    pub lead: u64,
    pub trail: u64,
}

impl SelectionWindow {
    /// Derives the window from lead/trail exclusions in seconds.
    ///
    /// Exclusions round up to whole frames. When they cover the whole clip the
    /// window collapses to an empty range at `lead`.
    pub fn from_seconds(frame_count: u64, frame_rate: f64, lead_seconds: f64, trail_seconds: f64) -> Self {
        let to_frames = |seconds: f64| -> u64 {
            let frames = (seconds.max(0.0) * frame_rate).ceil();
            if frames.is_finite() { frames as u64 } else { u64::MAX }
        };
        let lead = to_frames(lead_seconds).min(frame_count);
        let trail = frame_count.saturating_sub(to_frames(trail_seconds));
        if trail <= lead {
            Self { lead, trail: lead }
        } else {
            Self { lead, trail }
        }
    }

    pub fn len(&self) -> u64 {
        self.trail - self.lead
    }

    pub fn is_empty(&self) -> bool {
        self.trail <= self.lead
    }

    pub fn contains(&self, frame_index: u64) -> bool {
        frame_index >= self.lead && frame_index < self.trail
    }

    /// Sampled indices `lead, lead + step, ...` below `trail`. Lazy.
    pub fn sample_indices(&self, step: u32) -> StepBy<Range<u64>> {
        let step = step.max(1) as usize;
        (self.lead..self.trail).step_by(step)
    }

    /// Number of indices [`Self::sample_indices`] yields.
    pub fn sample_count(&self, step: u32) -> u64 {
        let step = u64::from(step.max(1));
        self.len().div_ceil(step)
    }
}
