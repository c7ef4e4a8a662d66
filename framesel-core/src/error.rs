//! Error types for the framesel-core library.
//!
//! Only configuration misuse and frozen-cache violations ever reach a caller
//! of [`crate::SelectionOrchestrator::select`]. Everything else (decode
//! failures, cache corruption, stale entries) is absorbed inside the engine
//! and only decides whether cached data is reused.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors surfaced by the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, io::Error),

    #[error("Command '{0}' failed with status {1}: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("ffprobe output could not be interpreted: {0}")]
    FfprobeParse(String),

    #[error("Video info error: {0}")]
    VideoInfoError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frozen cache: {0}")]
    FrozenCache(String),

    #[error("Failed to write cache file {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failures reported by a [`crate::external::FrameSource`].
///
/// These never propagate out of the metrics stage: the collector catches them
/// and switches the affected clip to synthetic fallback metrics.
#[derive(Error, Debug)]
pub enum FrameSourceError {
    #[error("probe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("could not start decoder for {path}: {reason}")]
    Spawn { path: PathBuf, reason: String },

    #[error("decode failed at frame {frame_index}: {reason}")]
    Decode { frame_index: u64, reason: String },

    #[error("decoder produced no frames for {0}")]
    Exhausted(PathBuf),
}

/// Creates a [`CoreError::CommandStart`] for a command that could not be spawned.
pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Creates a [`CoreError::CommandFailed`] for a command that exited unsuccessfully.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}

/// Shorthand for [`CoreError::Config`].
pub(crate) fn config_error(msg: impl Into<String>) -> CoreError {
    CoreError::Config(msg.into())
}
