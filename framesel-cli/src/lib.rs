// framesel-cli/src/lib.rs
//
// Library portion of the framesel CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// Re-export items needed by the binary or integration tests
pub use cli::{ClearCacheArgs, Cli, Commands, InputArgs, SelectArgs};
pub use commands::cache::run_clear_cache;
pub use commands::select::{run_fingerprint, run_select};
