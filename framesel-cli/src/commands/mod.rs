//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// `clear-cache`: deletes a selection cache file.
pub mod cache;

/// `select` and `fingerprint`: resolve clips and options, then run the engine.
pub mod select;
