// ============================================================================
// framesel-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console or File Logging for the CLI
//
// Without `--log-file` the CLI uses env_logger, so RUST_LOG works as usual
// (defaulting to info, or debug with `--verbose`). With `--log-file` it
// installs the core's log4rs setup, which writes the same lines to stderr
// and to the file.

use framesel_core::CoreError;
use log::LevelFilter;
use std::path::Path;

use crate::error::CliResult;

/// Level used when RUST_LOG is not set.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger.
pub fn init_logging(log_file: Option<&Path>, verbose: bool) -> CliResult<()> {
    let level = default_level(verbose);
    match log_file {
        Some(path) => framesel_core::logging::setup_logging(Some(path), level).map_err(|e| {
            CoreError::OperationFailed(format!("Failed to set up logging to {}: {:#}", path.display(), e))
        })?,
        None => env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(level.as_str().to_ascii_lowercase()),
        )
        .format_timestamp(None)
        .try_init()
        .map_err(|e| CoreError::OperationFailed(format!("Failed to set up logging: {e}")))?,
    }
    log::debug!("Logger initialized with level: {}", level);
    Ok(())
}
