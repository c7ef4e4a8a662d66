// ============================================================================
// framesel-core/src/metrics/mod.rs
// ============================================================================
//
// METRICS: Per-Frame Brightness and Motion Sampling
//
// The collector walks each clip's selection window at the configured stride,
// asks the frame source for downscaled luma frames, and measures two series:
// mean brightness and frame-to-frame motion. Motion is smoothed with a
// centered moving average before it reaches the planner.
//
// KEY COMPONENTS:
// - FrameMetric: one measured sample
// - ClipMetrics: the series of one clip plus what the planner needs about it
// - MetricStream: lazy, single-pass iterator of raw samples
// - MetricsCollector: drives the stream and applies the fallback policy
//
// FAILURE POLICY:
// A decode failure never aborts the run. The clip is measured again with
// synthetic, seed-stable metrics (see `fallback`) and flagged as degraded;
// the planner tags its picks so callers can tell. A stream that simply ends
// short of the window (probed frame counts are often estimates) keeps the
// samples it did deliver and only warns.

use std::iter::StepBy;
use std::ops::Range;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::clip::{ClipDescriptor, ClipRole, SelectionWindow};
use crate::config::{MotionMethod, SelectionConfig};
use crate::error::FrameSourceError;
use crate::external::{DynamicRange, FrameRequest, FrameSource, FrameStream};
use crate::warnings::{RunWarnings, WarningKind};

pub mod edge;
pub mod fallback;
pub mod luma;
pub mod smoothing;

use edge::FeatureMap;
use luma::BrightnessScale;
use smoothing::moving_average;

/// Measurements of one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMetric {
    pub frame_index: u64,
    /// Mean normalised brightness in `[0, 1]`.
    pub brightness: f64,
    /// Motion relative to the previous sample; smoothed once collected.
    pub motion: f64,
}

/// Everything the planner needs to know about one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipMetrics {
    pub role: ClipRole,
    pub frame_rate: f64,
    pub frame_count: u64,
    pub window: SelectionWindow,
    pub dynamic_range: DynamicRange,
    /// Samples are synthetic because the clip could not be decoded.
    pub degraded: bool,
    /// Ascending by `frame_index`, all inside `window`.
    pub samples: Vec<FrameMetric>,
}

impl ClipMetrics {
    /// The sample closest to `frame_index`; the earlier one wins a tie.
    pub fn nearest(&self, frame_index: u64) -> Option<&FrameMetric> {
        let pos = self.samples.partition_point(|m| m.frame_index < frame_index);
        let after = self.samples.get(pos);
        let before = pos.checked_sub(1).and_then(|p| self.samples.get(p));
        match (before, after) {
            (Some(b), Some(a)) => {
                if frame_index - b.frame_index <= a.frame_index - frame_index {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }
}

/// Lazy stream of raw (unsmoothed) samples for one clip.
///
/// Stops at the first error. If the source runs dry after at least one frame
/// the stream just ends and [`MetricStream::missing`] says how many sampled
/// indices were never delivered. Not restartable: call
/// [`MetricsCollector::stream`] again to re-read a clip.
pub struct MetricStream<'a> {
    frames: FrameStream<'a>,
    expected: StepBy<Range<u64>>,
    scale: BrightnessScale,
    method: MotionMethod,
    previous: Option<FeatureMap>,
    delivered: u64,
    missing: u64,
    done: bool,
}

impl MetricStream<'_> {
    fn fail(&mut self, err: FrameSourceError) -> Option<Result<FrameMetric, FrameSourceError>> {
        self.done = true;
        Some(Err(err))
    }

    /// Sampled indices the source never delivered.
    pub fn missing(&self) -> u64 {
        self.missing
    }
}

impl Iterator for MetricStream<'_> {
    type Item = Result<FrameMetric, FrameSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let expected = self.expected.next();
        match (self.frames.next(), expected) {
            (Some(Err(err)), _) => self.fail(err),
            (None, Some(frame_index)) if self.delivered == 0 => self.fail(FrameSourceError::Decode {
                frame_index,
                reason: "frame stream ended before the first sample".to_string(),
            }),
            (None, Some(_)) => {
                self.done = true;
                self.missing = 1 + self.expected.by_ref().count() as u64;
                None
            }
            (_, None) => {
                self.done = true;
                None
            }
            (Some(Ok(frame)), Some(frame_index)) => {
                if frame.frame_index != frame_index {
                    return self.fail(FrameSourceError::Decode {
                        frame_index,
                        reason: format!("source delivered frame {} out of order", frame.frame_index),
                    });
                }
                let features = FeatureMap::from_frame(&frame, self.method);
                let motion = match &self.previous {
                    Some(previous) => match features.difference(previous, frame_index) {
                        Ok(motion) => motion,
                        Err(err) => return self.fail(err),
                    },
                    None => 0.0,
                };
                self.previous = Some(features);
                self.delivered += 1;
                Some(Ok(FrameMetric {
                    frame_index,
                    brightness: self.scale.mean(&frame),
                    motion,
                }))
            }
        }
    }
}

/// Samples metrics from clips through a [`FrameSource`].
pub struct MetricsCollector<'a, S: FrameSource + ?Sized> {
    source: &'a S,
    config: &'a SelectionConfig,
    warnings: &'a RunWarnings,
}

impl<'a, S: FrameSource + ?Sized> MetricsCollector<'a, S> {
    pub fn new(source: &'a S, config: &'a SelectionConfig, warnings: &'a RunWarnings) -> Self {
        Self {
            source,
            config,
            warnings,
        }
    }

    fn request(&self, window: SelectionWindow) -> FrameRequest {
        FrameRequest {
            window,
            step: self.config.step,
            downscale_height: self.config.downscale_height,
        }
    }

    /// Starts a lazy raw-sample stream over `window` of `clip`.
    pub fn stream(
        &self,
        clip: &ClipDescriptor,
        window: SelectionWindow,
        dynamic_range: DynamicRange,
    ) -> Result<MetricStream<'a>, FrameSourceError> {
        let request = self.request(window);
        let frames = self.source.frames(clip, &request)?;
        Ok(MetricStream {
            frames,
            expected: request.window.sample_indices(request.step),
            scale: BrightnessScale::for_range(dynamic_range),
            method: self.config.motion_method,
            previous: None,
            delivered: 0,
            missing: 0,
            done: false,
        })
    }

    fn dynamic_range(&self, clip: &ClipDescriptor) -> DynamicRange {
        match self.source.dynamic_range(clip) {
            Ok(range) => range,
            Err(e) => {
                self.warnings.warn_once(
                    WarningKind::HdrProbe,
                    &format!(
                        "Could not determine dynamic range of {} ({}); assuming SDR",
                        clip.path.display(),
                        e
                    ),
                );
                DynamicRange::Sdr
            }
        }
    }

    /// Measures one clip, falling back to synthetic metrics on any failure.
    pub fn collect(&self, clip: &ClipDescriptor) -> ClipMetrics {
        let window = clip.window(self.config);
        let dynamic_range = self.dynamic_range(clip);
        let mut metrics = ClipMetrics {
            role: clip.role,
            frame_rate: clip.frame_rate,
            frame_count: clip.frame_count,
            window,
            dynamic_range,
            degraded: false,
            samples: Vec::new(),
        };

        if window.is_empty() {
            log::info!(
                "{} clip {}: selection window is empty, skipping analysis",
                clip.role,
                clip.path.display()
            );
            return metrics;
        }

        log::info!(
            "Analyzing {} clip {}: {} samples in frames [{}, {}){}",
            clip.role,
            clip.path.display(),
            window.sample_count(self.config.step),
            window.lead,
            window.trail,
            if dynamic_range.is_hdr() { " (HDR)" } else { "" }
        );
        let start = Instant::now();

        let measured = self.stream(clip, window, dynamic_range).and_then(|mut stream| {
            let samples = stream.by_ref().collect::<Result<Vec<_>, _>>()?;
            Ok((samples, stream.missing()))
        });

        match measured {
            Ok((mut samples, missing)) => {
                if missing > 0 {
                    self.warnings.warn_once(
                        WarningKind::DecodeShortfall,
                        &format!(
                            "Frame stream of {} ended {} samples early; keeping the {} measured",
                            clip.path.display(),
                            missing,
                            samples.len()
                        ),
                    );
                }
                let raw: Vec<f64> = samples.iter().map(|m| m.motion).collect();
                let smoothed = moving_average(&raw, self.config.motion_smooth_period);
                for (sample, motion) in samples.iter_mut().zip(smoothed) {
                    sample.motion = motion;
                }
                log::debug!(
                    "Measured {} samples of {} in {:.2?}",
                    samples.len(),
                    clip.path.display(),
                    start.elapsed()
                );
                metrics.samples = samples;
            }
            Err(e) => {
                self.warnings.warn_once(
                    WarningKind::DecodeFallback,
                    &format!(
                        "Frame analysis failed for {} ({}); using fallback metrics",
                        clip.path.display(),
                        e
                    ),
                );
                metrics.degraded = true;
                metrics.samples = fallback::synthetic_series(&window, self.config.step, self.config.rng_seed);
            }
        }
        metrics
    }

    /// Measures clips one after another.
    pub fn collect_all(&self, clips: &[ClipDescriptor]) -> Vec<ClipMetrics> {
        clips.iter().map(|clip| self.collect(clip)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::{FailingFrameSource, SyntheticFrameSource};
    use chrono::{DateTime, Utc};

    fn clip(frame_count: u64) -> ClipDescriptor {
        ClipDescriptor {
            role: ClipRole::Target,
            path: "tgt.mkv".into(),
            byte_size: 1,
            modified_time: DateTime::<Utc>::UNIX_EPOCH,
            content_hash: None,
            frame_rate: 24.0,
            frame_count,
        }
    }

    #[test]
    fn test_collect_measures_window_samples() {
        let source = SyntheticFrameSource::new(2000, 24.0).scene_length(1000);
        let config = SelectionConfig {
            ignore_lead_seconds: 1.0,
            ..Default::default()
        };
        let warnings = RunWarnings::new();
        let metrics = MetricsCollector::new(&source, &config, &warnings).collect(&clip(2000));

        assert!(!metrics.degraded);
        assert_eq!(metrics.window.lead, 24);
        assert_eq!(metrics.samples.len() as u64, metrics.window.sample_count(4));
        assert_eq!(metrics.samples[0].frame_index, 24);
        assert!(metrics.samples.windows(2).all(|w| w[0].brightness <= w[1].brightness));
        // Motion peaks around the scene boundary at frame 1000.
        let peak = metrics
            .samples
            .iter()
            .max_by(|a, b| a.motion.total_cmp(&b.motion))
            .unwrap();
        assert!((992..=1008).contains(&peak.frame_index), "peak at {}", peak.frame_index);
        assert_eq!(warnings.count(), 0);
    }

    #[test]
    fn test_stream_is_lazy() {
        let source = SyntheticFrameSource::new(1000, 24.0);
        let config = SelectionConfig::default();
        let warnings = RunWarnings::new();
        let collector = MetricsCollector::new(&source, &config, &warnings);
        let mut stream = collector
            .stream(&clip(1000), SelectionWindow { lead: 0, trail: 1000 }, DynamicRange::Sdr)
            .unwrap();
        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.frame_index, 0);
        assert_eq!(first.motion, 0.0);
        assert_eq!(stream.next().unwrap().unwrap().frame_index, 4);
    }

    #[test]
    fn test_decode_failure_falls_back() {
        let source = FailingFrameSource::new(1000, 24.0);
        let config = SelectionConfig::default();
        let warnings = RunWarnings::new();
        let collector = MetricsCollector::new(&source, &config, &warnings);
        let first = collector.collect(&clip(1000));
        let second = collector.collect(&clip(1000));

        assert!(first.degraded);
        assert_eq!(first.samples.len(), 250);
        assert_eq!(first, second);
        assert!(warnings.has_seen(WarningKind::DecodeFallback));
        assert!(warnings.has_seen(WarningKind::HdrProbe));
    }

    #[test]
    fn test_short_stream_keeps_measured_samples() {
        // Probed count overshoots the decodable frames by one sample.
        let source = SyntheticFrameSource::new(2000, 24.0).decodable_frames(1996);
        let config = SelectionConfig::default();
        let warnings = RunWarnings::new();
        let metrics = MetricsCollector::new(&source, &config, &warnings).collect(&clip(2000));

        assert!(!metrics.degraded);
        assert_eq!(metrics.samples.len(), 499);
        assert_eq!(metrics.samples.last().map(|m| m.frame_index), Some(1992));
        assert!(metrics.samples.windows(2).all(|w| w[0].brightness <= w[1].brightness));
        assert!(warnings.has_seen(WarningKind::DecodeShortfall));
        assert!(!warnings.has_seen(WarningKind::DecodeFallback));
    }

    #[test]
    fn test_stream_without_frames_falls_back() {
        let source = SyntheticFrameSource::new(1000, 24.0).decodable_frames(0);
        let config = SelectionConfig::default();
        let warnings = RunWarnings::new();
        let metrics = MetricsCollector::new(&source, &config, &warnings).collect(&clip(1000));

        assert!(metrics.degraded);
        assert_eq!(metrics.samples.len(), 250);
        assert!(warnings.has_seen(WarningKind::DecodeFallback));
        assert!(!warnings.has_seen(WarningKind::DecodeShortfall));
    }

    #[test]
    fn test_hdr_clip_uses_pq_brightness() {
        // Checkerboard codes 158 and 182: mid-grey on a display scale,
        // above reference white once read as PQ.
        let sdr = SyntheticFrameSource::with_brightness(1000, 24.0, |_| 170);
        let hdr = SyntheticFrameSource::with_brightness(1000, 24.0, |_| 170).hdr();
        let config = SelectionConfig::default();
        let warnings = RunWarnings::new();

        let sdr_metrics = MetricsCollector::new(&sdr, &config, &warnings).collect(&clip(1000));
        let hdr_metrics = MetricsCollector::new(&hdr, &config, &warnings).collect(&clip(1000));

        assert_eq!(sdr_metrics.dynamic_range, DynamicRange::Sdr);
        assert_eq!(hdr_metrics.dynamic_range, DynamicRange::Hdr);
        assert!(!hdr_metrics.degraded);
        assert!(sdr_metrics.samples.iter().all(|m| (m.brightness - 170.0 / 255.0).abs() < 1e-9));
        assert!(hdr_metrics.samples.iter().all(|m| m.brightness == 1.0));
        assert_eq!(warnings.count(), 0);
    }

    #[test]
    fn test_empty_window_skips_decoding() {
        let source = SyntheticFrameSource::new(100, 24.0);
        let config = SelectionConfig {
            ignore_lead_seconds: 3.0,
            ignore_trail_seconds: 3.0,
            ..Default::default()
        };
        let warnings = RunWarnings::new();
        let metrics = MetricsCollector::new(&source, &config, &warnings).collect(&clip(100));
        assert!(metrics.samples.is_empty());
        assert!(!metrics.degraded);
        assert_eq!(source.decode_calls(), 0);
    }

    #[test]
    fn test_nearest_sample() {
        let metrics = ClipMetrics {
            role: ClipRole::Target,
            frame_rate: 24.0,
            frame_count: 100,
            window: SelectionWindow { lead: 0, trail: 100 },
            dynamic_range: DynamicRange::Sdr,
            degraded: false,
            samples: [0, 4, 8]
                .into_iter()
                .map(|i| FrameMetric { frame_index: i, brightness: 0.0, motion: 0.0 })
                .collect(),
        };
        assert_eq!(metrics.nearest(5).map(|m| m.frame_index), Some(4));
        assert_eq!(metrics.nearest(6).map(|m| m.frame_index), Some(4));
        assert_eq!(metrics.nearest(7).map(|m| m.frame_index), Some(8));
        assert_eq!(metrics.nearest(50).map(|m| m.frame_index), Some(8));
    }
}
