// ============================================================================
// framesel-core/src/config/mod.rs
// ============================================================================
//
// CONFIGURATION: Selection Configuration and Run Flags
//
// This module defines `SelectionConfig`, the exhaustive set of options that
// influence which frames get selected. The whole struct is hashed into the
// cache key, so every field here is part of the selection outcome; options
// that only change *how* a run behaves (cache bypass, frozen mode, frame-list
// annotation) live in `RunFlags` instead and are never hashed.
//
// KEY COMPONENTS:
// - SelectionConfig: selection-relevant configuration (the fingerprint)
// - CategoryQuotas: per-category pick counts
// - MotionMethod / ThresholdMode: metric and threshold policies
// - RunFlags: cache behaviour switches for a single run
//
// Configuration is layered: defaults, then FRAMESEL_* environment variables
// (`SelectionConfig::from_env`), then an optional TOML file
// (`load_config_file`), then whatever the caller sets explicitly.

mod builder;
mod file;
mod utils;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, config_error};
use crate::selection::SelectionCategory;

pub use builder::SelectionConfigBuilder;
pub use file::{ConfigFile, load_config_file};
pub use utils::*;

// ============================================================================
// DEFAULT CONSTANTS
// ============================================================================

/// Identity and version of the selection engine. Recorded in every
/// fingerprint and in each record's `source` tag.
pub const SELECTION_ENGINE: &str = "select_v1.0";

/// Default sampling stride in frames.
pub const DEFAULT_STEP: u32 = 4;

/// Default height frames are scaled to before measuring.
pub const DEFAULT_DOWNSCALE_HEIGHT: u32 = 480;

/// Default moving-average period applied to the motion series.
pub const DEFAULT_MOTION_SMOOTH_PERIOD: u32 = 5;

/// Default quantile of the motion series that counts as a scene change.
pub const DEFAULT_SCENECUT_QUANTILE: f64 = 0.90;

/// Default suppression radius around a motion pick, in sampled frames.
pub const DEFAULT_DIFF_RADIUS: u32 = 3;

/// Default seed for random picks.
pub const DEFAULT_RNG_SEED: u64 = 20_202_020;

/// Default dark cut (quantile or absolute brightness, see [`ThresholdMode`]).
pub const DEFAULT_DARK_THRESHOLD: f64 = 0.20;

/// Default bright cut (quantile or absolute brightness, see [`ThresholdMode`]).
pub const DEFAULT_BRIGHT_THRESHOLD: f64 = 0.80;

/// Largest accepted quota for a single category.
pub const MAX_CATEGORY_QUOTA: usize = 10_000;

// ============================================================================
// POLICY ENUMS
// ============================================================================

/// How frame-to-frame motion is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MotionMethod {
    /// Absolute difference of Prewitt edge maps of consecutive samples.
    #[default]
    Edge,
    /// Absolute difference of raw luma of consecutive samples.
    AbsDiff,
}

impl MotionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionMethod::Edge => "edge",
            MotionMethod::AbsDiff => "absdiff",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "edge" => Some(MotionMethod::Edge),
            "absdiff" | "diff" => Some(MotionMethod::AbsDiff),
            _ => None,
        }
    }
}

/// How dark/bright thresholds are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Thresholds are quantiles of each clip's own brightness distribution.
    #[default]
    Quantile,
    /// Thresholds are absolute normalised brightness values in `[0, 1]`.
    Fixed,
}

impl ThresholdMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quantile" => Some(ThresholdMode::Quantile),
            "fixed" => Some(ThresholdMode::Fixed),
            _ => None,
        }
    }
}

/// Number of automatic picks per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryQuotas {
    pub dark: usize,
    pub bright: usize,
    pub motion: usize,
    pub random: usize,
}

impl Default for CategoryQuotas {
    fn default() -> Self {
        Self {
            dark: 2,
            bright: 2,
            motion: 2,
            random: 1,
        }
    }
}

impl CategoryQuotas {
    fn named(&self) -> [(&'static str, usize); 4] {
        [
            ("dark", self.dark),
            ("bright", self.bright),
            ("motion", self.motion),
            ("random", self.random),
        ]
    }

    pub fn total(&self) -> usize {
        self.named().iter().fold(0, |sum, &(_, quota)| sum.saturating_add(quota))
    }
}

// ============================================================================
// SELECTION CONFIG
// ============================================================================

/// Every option that affects the selection outcome.
///
/// The field set is closed: config files with unknown keys are rejected, and
/// the serialized form of this struct is exactly what gets fingerprinted and
/// persisted as `config_fingerprint`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Sampling stride in frames.
    pub step: u32,
    /// Height frames are scaled to (aspect preserving) before measuring.
    pub downscale_height: u32,
    pub motion_method: MotionMethod,
    /// Quantile of the smoothed motion series used as the scene-cut line.
    pub scenecut_quantile: f64,
    /// Motion picks suppress neighbours within this many sampled frames.
    pub diff_radius: u32,
    pub ignore_lead_seconds: f64,
    pub ignore_trail_seconds: f64,
    pub rng_seed: u64,
    /// Moving-average period for the motion series (1 disables smoothing).
    pub motion_smooth_period: u32,
    pub threshold_mode: ThresholdMode,
    pub dark_threshold: f64,
    pub bright_threshold: f64,
    pub quotas: CategoryQuotas,
    /// Explicit frames, inserted verbatim ahead of every automatic category.
    pub user_frames: Vec<u64>,
    /// Category claim order during deduplication. Must start with `User`.
    pub priority: Vec<SelectionCategory>,
    /// Selection engine version tag. Not user configurable.
    pub engine: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            downscale_height: DEFAULT_DOWNSCALE_HEIGHT,
            motion_method: MotionMethod::Edge,
            scenecut_quantile: DEFAULT_SCENECUT_QUANTILE,
            diff_radius: DEFAULT_DIFF_RADIUS,
            ignore_lead_seconds: 0.0,
            ignore_trail_seconds: 0.0,
            rng_seed: DEFAULT_RNG_SEED,
            motion_smooth_period: DEFAULT_MOTION_SMOOTH_PERIOD,
            threshold_mode: ThresholdMode::Quantile,
            dark_threshold: DEFAULT_DARK_THRESHOLD,
            bright_threshold: DEFAULT_BRIGHT_THRESHOLD,
            quotas: CategoryQuotas::default(),
            user_frames: Vec::new(),
            priority: SelectionCategory::DEFAULT_PRIORITY.to_vec(),
            engine: SELECTION_ENGINE.to_string(),
        }
    }
}

impl SelectionConfig {
    /// Defaults overridden by `FRAMESEL_*` environment variables.
    ///
    /// Unparseable values fall back to the default, as the other env getters do.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let motion_method = std::env::var("FRAMESEL_MOTION_METHOD")
            .ok()
            .and_then(|v| MotionMethod::parse(&v))
            .unwrap_or(defaults.motion_method);
        let threshold_mode = std::env::var("FRAMESEL_THRESHOLD_MODE")
            .ok()
            .and_then(|v| ThresholdMode::parse(&v))
            .unwrap_or(defaults.threshold_mode);

        Self {
            step: get_env_u32("FRAMESEL_STEP", defaults.step),
            downscale_height: get_env_u32("FRAMESEL_DOWNSCALE_HEIGHT", defaults.downscale_height),
            motion_method,
            scenecut_quantile: get_env_f64("FRAMESEL_SCENECUT_QUANTILE", defaults.scenecut_quantile),
            diff_radius: get_env_u32("FRAMESEL_DIFF_RADIUS", defaults.diff_radius),
            ignore_lead_seconds: get_env_f64("FRAMESEL_IGNORE_LEAD_SECONDS", defaults.ignore_lead_seconds),
            ignore_trail_seconds: get_env_f64(
                "FRAMESEL_IGNORE_TRAIL_SECONDS",
                defaults.ignore_trail_seconds,
            ),
            rng_seed: get_env_u64("FRAMESEL_RNG_SEED", defaults.rng_seed),
            motion_smooth_period: get_env_u32(
                "FRAMESEL_MOTION_SMOOTH_PERIOD",
                defaults.motion_smooth_period,
            ),
            threshold_mode,
            dark_threshold: get_env_f64("FRAMESEL_DARK_THRESHOLD", defaults.dark_threshold),
            bright_threshold: get_env_f64("FRAMESEL_BRIGHT_THRESHOLD", defaults.bright_threshold),
            quotas: CategoryQuotas {
                dark: get_env_usize("FRAMESEL_DARK_QUOTA", defaults.quotas.dark),
                bright: get_env_usize("FRAMESEL_BRIGHT_QUOTA", defaults.quotas.bright),
                motion: get_env_usize("FRAMESEL_MOTION_QUOTA", defaults.quotas.motion),
                random: get_env_usize("FRAMESEL_RANDOM_QUOTA", defaults.quotas.random),
            },
            user_frames: get_env_u64_list("FRAMESEL_USER_FRAMES", defaults.user_frames),
            ..defaults
        }
    }

    /// Rejects invalid or contradictory settings.
    ///
    /// Called during fingerprinting, before any metric work starts.
    pub fn validate(&self) -> CoreResult<()> {
        if self.step == 0 {
            return Err(config_error("step must be at least 1"));
        }
        if self.downscale_height == 0 {
            return Err(config_error("downscale_height must be at least 1"));
        }
        if self.motion_smooth_period == 0 {
            return Err(config_error("motion_smooth_period must be at least 1"));
        }
        for (name, seconds) in [
            ("ignore_lead_seconds", self.ignore_lead_seconds),
            ("ignore_trail_seconds", self.ignore_trail_seconds),
        ] {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(config_error(format!(
                    "{name} must be a non-negative number of seconds, got {seconds}"
                )));
            }
        }
        for (name, value) in [
            ("scenecut_quantile", self.scenecut_quantile),
            ("dark_threshold", self.dark_threshold),
            ("bright_threshold", self.bright_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(config_error(format!("{name} must lie in [0, 1], got {value}")));
            }
        }
        if self.dark_threshold >= self.bright_threshold {
            return Err(config_error(format!(
                "dark_threshold ({}) must be below bright_threshold ({})",
                self.dark_threshold, self.bright_threshold
            )));
        }
        self.validate_priority()?;
        for (name, quota) in self.quotas.named() {
            if quota > MAX_CATEGORY_QUOTA {
                return Err(config_error(format!(
                    "{name} quota {quota} exceeds the limit of {MAX_CATEGORY_QUOTA}"
                )));
            }
        }
        if self.quotas.total() == 0 && self.user_frames.is_empty() {
            return Err(config_error(
                "all category quotas are zero and no user frames were given; nothing to select",
            ));
        }
        if self.engine != SELECTION_ENGINE {
            return Err(config_error(format!(
                "engine tag '{}' does not match this build ({SELECTION_ENGINE})",
                self.engine
            )));
        }
        Ok(())
    }

    fn validate_priority(&self) -> CoreResult<()> {
        let mut sorted = self.priority.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != SelectionCategory::ALL.len() || self.priority.len() != sorted.len() {
            return Err(config_error(format!(
                "priority must list each of Dark, Bright, Motion, Random and User exactly once, got {:?}",
                self.priority
            )));
        }
        if self.priority.first() != Some(&SelectionCategory::User) {
            return Err(config_error("priority must start with User"));
        }
        Ok(())
    }
}

// ============================================================================
// RUN FLAGS
// ============================================================================

/// Switches that change how one run uses the cache. Never fingerprinted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFlags {
    /// Skip lookup and recompute; the fresh result still overwrites the cache.
    pub ignore_cache: bool,
    /// Frozen mode: fail instead of recomputing when no valid entry exists.
    pub require_cache: bool,
    /// Existing per-frame text artifact to annotate with selection hints.
    pub frame_list: Option<PathBuf>,
}

impl RunFlags {
    pub fn validate(&self) -> CoreResult<()> {
        if self.ignore_cache && self.require_cache {
            return Err(config_error(
                "ignore_cache and require_cache cannot both be set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SelectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine, SELECTION_ENGINE);
        assert_eq!(config.priority.first(), Some(&SelectionCategory::User));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            SelectionConfig { step: 0, ..Default::default() },
            SelectionConfig { downscale_height: 0, ..Default::default() },
            SelectionConfig { motion_smooth_period: 0, ..Default::default() },
            SelectionConfig { ignore_lead_seconds: -1.0, ..Default::default() },
            SelectionConfig { ignore_trail_seconds: f64::NAN, ..Default::default() },
            SelectionConfig { scenecut_quantile: 1.5, ..Default::default() },
            SelectionConfig { dark_threshold: 0.9, bright_threshold: 0.1, ..Default::default() },
            SelectionConfig {
                quotas: CategoryQuotas { dark: 0, bright: 0, motion: 0, random: 0 },
                ..Default::default()
            },
            SelectionConfig { engine: "select_v0".to_string(), ..Default::default() },
            SelectionConfig {
                quotas: CategoryQuotas { random: MAX_CATEGORY_QUOTA + 1, ..Default::default() },
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "expected rejection of {config:?}");
        }
    }

    #[test]
    fn test_validate_priority() {
        let mut config = SelectionConfig::default();
        config.priority = vec![
            SelectionCategory::Dark,
            SelectionCategory::User,
            SelectionCategory::Bright,
            SelectionCategory::Motion,
            SelectionCategory::Random,
        ];
        assert!(config.validate().is_err());

        config.priority = vec![
            SelectionCategory::User,
            SelectionCategory::Dark,
            SelectionCategory::Dark,
            SelectionCategory::Motion,
            SelectionCategory::Random,
        ];
        assert!(config.validate().is_err());

        config.priority = vec![
            SelectionCategory::User,
            SelectionCategory::Random,
            SelectionCategory::Motion,
            SelectionCategory::Bright,
            SelectionCategory::Dark,
        ];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_quota_is_rejected_without_overflow() {
        let config = SelectionConfig {
            quotas: CategoryQuotas { dark: usize::MAX, bright: usize::MAX, motion: 2, random: 1 },
            ..Default::default()
        };
        assert_eq!(config.quotas.total(), usize::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dark quota"), "{err}");
    }

    #[test]
    fn test_user_frames_alone_are_enough() {
        let config = SelectionConfig {
            quotas: CategoryQuotas { dark: 0, bright: 0, motion: 0, random: 0 },
            user_frames: vec![100],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_flags_conflict() {
        let flags = RunFlags {
            ignore_cache: true,
            require_cache: true,
            frame_list: None,
        };
        assert!(flags.validate().is_err());
        assert!(RunFlags::default().validate().is_ok());
    }

    #[test]
    fn test_motion_method_names() {
        assert_eq!(MotionMethod::parse("EDGE"), Some(MotionMethod::Edge));
        assert_eq!(MotionMethod::parse("absdiff"), Some(MotionMethod::AbsDiff));
        assert_eq!(MotionMethod::parse("sobel"), None);
        assert_eq!(serde_json::to_string(&MotionMethod::Edge).unwrap(), "\"edge\"");
        assert_eq!(serde_json::to_string(&MotionMethod::AbsDiff).unwrap(), "\"absdiff\"");
    }
}
