//! Implementation of the 'clear-cache' subcommand.

use crate::cli::ClearCacheArgs;
use crate::error::CliResult;

use framesel_core::CacheStore;

/// Deletes the cache file and reports whether there was one.
pub fn run_clear_cache(args: &ClearCacheArgs) -> CliResult<()> {
    let store = CacheStore::new(&args.cache_file);
    if store.clear()? {
        println!("Removed cache file {}", args.cache_file.display());
    } else {
        println!("No cache file at {}", args.cache_file.display());
    }
    Ok(())
}
