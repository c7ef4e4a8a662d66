// framesel-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "framesel: representative frame selection",
    long_about = "Picks dark, bright, high-motion, random and user-specified frames from \
                  video clips and caches the selection so unchanged runs skip frame analysis."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Also write logs to this file (uses the file logger instead of RUST_LOG)
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Selects frames, reusing the cache when clips and options are unchanged
    Select(SelectArgs),
    /// Prints the cache key for the given clips and options
    Fingerprint(InputArgs),
    /// Deletes a selection cache file
    ClearCache(ClearCacheArgs),
}

/// Clips and the selection options layered over env and config file.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Reference (source) clip
    #[arg(short = 'r', long = "reference", value_name = "PATH")]
    pub reference: Option<PathBuf>,

    /// Target (encoded) clip
    #[arg(short = 't', long = "target", value_name = "PATH")]
    pub target: Option<PathBuf>,

    /// TOML file with selection options
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    // --- Overrides ---
    /// Sample every Nth frame
    #[arg(long, value_name = "N")]
    pub step: Option<u32>,

    /// Seed for random picks
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Comma-separated frames to include verbatim (e.g., 1200,5400)
    #[arg(long, value_delimiter = ',', value_name = "FRAMES")]
    pub user_frames: Option<Vec<u64>>,

    /// Seconds at the start of each clip excluded from automatic picks
    #[arg(long, value_name = "SECONDS")]
    pub ignore_lead: Option<f64>,

    /// Seconds at the end of each clip excluded from automatic picks
    #[arg(long, value_name = "SECONDS")]
    pub ignore_trail: Option<f64>,
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Selection cache file to read and write
    #[arg(long, required = true, value_name = "FILE")]
    pub cache_file: PathBuf,

    /// Recompute even if the cache is valid (the result still replaces it)
    #[arg(long, default_value_t = false)]
    pub ignore_cache: bool,

    /// Fail instead of recomputing when no valid cache entry exists
    #[arg(long, default_value_t = false)]
    pub require_cache: bool,

    /// Existing per-frame text file to annotate with selection hints
    #[arg(long, value_name = "FILE")]
    pub frame_list: Option<PathBuf>,

    /// Print the cache entry as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ClearCacheArgs {
    /// Selection cache file to delete
    #[arg(long, required = true, value_name = "FILE")]
    pub cache_file: PathBuf,
}
