// framesel-cli/src/main.rs
//
// Entry point for the `framesel` binary: parses arguments, sets up logging,
// dispatches to the command implementations in the library half of this
// crate and maps errors to exit codes.

use clap::Parser;
use framesel_cli::error::exit_code;
use framesel_cli::logging::init_logging;
use framesel_cli::{Cli, Commands, run_clear_cache, run_fingerprint, run_select};
use std::process;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_deref(), cli.verbose) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let result = match &cli.command {
        Commands::Select(args) => run_select(args),
        Commands::Fingerprint(args) => run_fingerprint(args),
        Commands::ClearCache(args) => run_clear_cache(args),
    };

    if let Err(e) = result {
        log::debug!("Command failed: {e:?}");
        eprintln!("Error: {e}");
        process::exit(exit_code(&e));
    }
}
