//! TOML configuration files.
//!
//! Every key is optional and overrides the base configuration it is applied
//! to. Unknown keys are an error, so a typo never silently falls back to a
//! default that then ends up in the fingerprint.
//!
//! ```toml
//! step = 2
//! motion_method = "absdiff"
//! ignore_lead_seconds = 180.0
//! user_frames = [1200, 5400]
//!
//! [quotas]
//! dark = 3
//! random = 0
//! ```

use std::path::Path;

use serde::Deserialize;

use super::{MotionMethod, SelectionConfig, ThresholdMode};
use crate::error::{CoreError, CoreResult};
use crate::selection::SelectionCategory;

/// Partial quotas; missing categories keep their base value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaOverrides {
    pub dark: Option<usize>,
    pub bright: Option<usize>,
    pub motion: Option<usize>,
    pub random: Option<usize>,
}

/// On-disk shape of a selection config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub step: Option<u32>,
    pub downscale_height: Option<u32>,
    pub motion_method: Option<MotionMethod>,
    pub scenecut_quantile: Option<f64>,
    pub diff_radius: Option<u32>,
    pub ignore_lead_seconds: Option<f64>,
    pub ignore_trail_seconds: Option<f64>,
    pub rng_seed: Option<u64>,
    pub motion_smooth_period: Option<u32>,
    pub threshold_mode: Option<ThresholdMode>,
    pub dark_threshold: Option<f64>,
    pub bright_threshold: Option<f64>,
    pub quotas: Option<QuotaOverrides>,
    pub user_frames: Option<Vec<u64>>,
    pub priority: Option<Vec<SelectionCategory>>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> CoreResult<Self> {
        toml::from_str(text).map_err(|e| CoreError::Config(format!("config file: {e}")))
    }

    /// Applies every key present in the file on top of `base`.
    pub fn apply(self, mut base: SelectionConfig) -> SelectionConfig {
        if let Some(v) = self.step {
            base.step = v;
        }
        if let Some(v) = self.downscale_height {
            base.downscale_height = v;
        }
        if let Some(v) = self.motion_method {
            base.motion_method = v;
        }
        if let Some(v) = self.scenecut_quantile {
            base.scenecut_quantile = v;
        }
        if let Some(v) = self.diff_radius {
            base.diff_radius = v;
        }
        if let Some(v) = self.ignore_lead_seconds {
            base.ignore_lead_seconds = v;
        }
        if let Some(v) = self.ignore_trail_seconds {
            base.ignore_trail_seconds = v;
        }
        if let Some(v) = self.rng_seed {
            base.rng_seed = v;
        }
        if let Some(v) = self.motion_smooth_period {
            base.motion_smooth_period = v;
        }
        if let Some(v) = self.threshold_mode {
            base.threshold_mode = v;
        }
        if let Some(v) = self.dark_threshold {
            base.dark_threshold = v;
        }
        if let Some(v) = self.bright_threshold {
            base.bright_threshold = v;
        }
        if let Some(q) = self.quotas {
            base.quotas.dark = q.dark.unwrap_or(base.quotas.dark);
            base.quotas.bright = q.bright.unwrap_or(base.quotas.bright);
            base.quotas.motion = q.motion.unwrap_or(base.quotas.motion);
            base.quotas.random = q.random.unwrap_or(base.quotas.random);
        }
        if let Some(v) = self.user_frames {
            base.user_frames = v;
        }
        if let Some(v) = self.priority {
            base.priority = v;
        }
        base
    }
}

/// Reads `path` and applies it on top of `base`.
pub fn load_config_file(path: &Path, base: SelectionConfig) -> CoreResult<SelectionConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CoreError::PathError(format!("Failed to read config file '{}': {}", path.display(), e))
    })?;
    let file = ConfigFile::parse(&text)?;
    log::debug!("Loaded selection config overrides from {}", path.display());
    Ok(file.apply(base))
}
