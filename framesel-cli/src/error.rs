// ============================================================================
// framesel-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// The CLI reuses the core error type. `CliErrorContext` prefixes an error
// with what the CLI was doing, and `exit_code` maps errors to process exit
// codes so scripts can tell frozen-cache failures apart.

use framesel_core::{CoreError, CoreResult};

use std::fmt;

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Exit code for invalid arguments or configuration.
pub const EXIT_CONFIG: i32 = 2;

/// Exit code for frozen mode without a valid cache entry.
pub const EXIT_FROZEN_CACHE: i32 = 3;

/// Extension trait for adding context to errors in the CLI.
pub trait CliErrorContext<T> {
    /// Add context to an error.
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{}: {}", context, core_error))
        })
    }
}

/// Process exit code for a failed command.
pub fn exit_code(error: &CoreError) -> i32 {
    match error {
        CoreError::Config(_) => EXIT_CONFIG,
        CoreError::FrozenCache(_) => EXIT_FROZEN_CACHE,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_context() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        let err = result.cli_context("Failed to write output").unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(_)));
        assert_eq!(
            err.to_string(),
            "Operation failed: Failed to write output: I/O error: denied"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&CoreError::Config("bad".into())), EXIT_CONFIG);
        assert_eq!(exit_code(&CoreError::FrozenCache("none".into())), EXIT_FROZEN_CACHE);
        assert_eq!(exit_code(&CoreError::OperationFailed("x".into())), 1);
    }
}
