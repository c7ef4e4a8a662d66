//! Core library for picking representative frames from video clips.
//!
//! The engine samples per-frame brightness and motion from each clip, turns
//! those series into categorized picks (Dark, Bright, Motion, Random, User)
//! and caches the outcome in a fingerprint-keyed JSON file, so an unchanged
//! run never decodes a frame twice.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use framesel_core::{CacheStore, ClipRole, FfmpegFrameSource, RunFlags, SelectionConfig};
//! use framesel_core::SelectionOrchestrator;
//! use std::path::Path;
//!
//! let source = FfmpegFrameSource::new();
//! let orchestrator = SelectionOrchestrator::new(&source, CacheStore::new("selection.json"));
//! let clips = vec![
//!     orchestrator.capture(ClipRole::Reference, Path::new("/media/source.mkv")).unwrap(),
//!     orchestrator.capture(ClipRole::Target, Path::new("/media/encode.mkv")).unwrap(),
//! ];
//! let config = SelectionConfig {
//!     ignore_lead_seconds: 180.0,
//!     ignore_trail_seconds: 360.0,
//!     ..SelectionConfig::from_env()
//! };
//!
//! let result = orchestrator.select(&clips, &config, &RunFlags::default()).unwrap();
//! for record in &result.selections {
//!     println!("{} {} {}", record.frame_index, record.category, record.clip_role);
//! }
//! ```

pub mod cache;
pub mod clip;
pub mod config;
pub mod error;
pub mod external;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod selection;
pub mod temp_files;
pub mod utils;
pub mod warnings;

// Re-exports for public API
pub use cache::{CacheEntry, CacheKey, CacheStore, Lookup, MissReason};
pub use clip::{ClipDescriptor, ClipRole, SelectionWindow};
pub use config::{
    CategoryQuotas, MotionMethod, RunFlags, SELECTION_ENGINE, SelectionConfig, SelectionConfigBuilder,
    ThresholdMode, load_config_file,
};
pub use error::{CoreError, CoreResult, FrameSourceError};
pub use external::{DynamicRange, FfmpegFrameSource, FrameSource};
pub use metrics::{ClipMetrics, FrameMetric, MetricsCollector};
pub use orchestrator::SelectionOrchestrator;
pub use selection::{SelectionCategory, SelectionMetric, SelectionRecord, SelectionResult};
pub use utils::format_timecode;
