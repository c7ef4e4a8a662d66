// ============================================================================
// framesel-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for SelectionConfig
//
// Fluent construction of SelectionConfig starting from the built-in
// defaults. `build()` does not validate; validation happens when the config
// is fingerprinted so that a bad config never reaches the metrics stage.

use super::{CategoryQuotas, MotionMethod, SelectionConfig, ThresholdMode};
use crate::selection::SelectionCategory;

/// Builder for creating SelectionConfig instances.
///
/// # Examples
///
/// ```rust
/// use framesel_core::config::{MotionMethod, SelectionConfigBuilder};
///
/// let config = SelectionConfigBuilder::new()
///     .step(2)
///     .downscale_height(360)
///     .motion_method(MotionMethod::AbsDiff)
///     .ignore_seconds(180.0, 360.0)
///     .rng_seed(2020220)
///     .quotas(2, 2, 2, 1)
///     .user_frames(vec![1200])
///     .build();
///
/// assert_eq!(config.step, 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelectionConfigBuilder {
    config: SelectionConfig,
}

impl SelectionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing config, e.g. one produced by `from_env`.
    pub fn from_config(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn step(mut self, step: u32) -> Self {
        self.config.step = step;
        self
    }

    pub fn downscale_height(mut self, height: u32) -> Self {
        self.config.downscale_height = height;
        self
    }

    pub fn motion_method(mut self, method: MotionMethod) -> Self {
        self.config.motion_method = method;
        self
    }

    pub fn motion_smooth_period(mut self, period: u32) -> Self {
        self.config.motion_smooth_period = period;
        self
    }

    pub fn scenecut_quantile(mut self, quantile: f64) -> Self {
        self.config.scenecut_quantile = quantile;
        self
    }

    pub fn diff_radius(mut self, radius: u32) -> Self {
        self.config.diff_radius = radius;
        self
    }

    /// Sets both lead and trail exclusions in seconds.
    pub fn ignore_seconds(mut self, lead: f64, trail: f64) -> Self {
        self.config.ignore_lead_seconds = lead;
        self.config.ignore_trail_seconds = trail;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.config.rng_seed = seed;
        self
    }

    /// Sets the dark/bright cuts and how they are interpreted.
    pub fn thresholds(mut self, mode: ThresholdMode, dark: f64, bright: f64) -> Self {
        self.config.threshold_mode = mode;
        self.config.dark_threshold = dark;
        self.config.bright_threshold = bright;
        self
    }

    /// Sets quotas in dark, bright, motion, random order.
    pub fn quotas(mut self, dark: usize, bright: usize, motion: usize, random: usize) -> Self {
        self.config.quotas = CategoryQuotas {
            dark,
            bright,
            motion,
            random,
        };
        self
    }

    pub fn user_frames(mut self, frames: Vec<u64>) -> Self {
        self.config.user_frames = frames;
        self
    }

    pub fn priority(mut self, priority: Vec<SelectionCategory>) -> Self {
        self.config.priority = priority;
        self
    }

    pub fn build(self) -> SelectionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_default() {
        assert_eq!(SelectionConfigBuilder::new().build(), SelectionConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let config = SelectionConfigBuilder::new()
            .quotas(1, 0, 3, 5)
            .thresholds(ThresholdMode::Fixed, 0.1, 0.7)
            .diff_radius(0)
            .build();

        assert_eq!(config.quotas.motion, 3);
        assert_eq!(config.quotas.bright, 0);
        assert_eq!(config.threshold_mode, ThresholdMode::Fixed);
        assert_eq!(config.dark_threshold, 0.1);
        assert_eq!(config.diff_radius, 0);
    }
}
