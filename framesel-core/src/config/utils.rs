//! Configuration utility functions
//!
//! Helpers for reading typed overrides from environment variables. A value
//! that is missing or does not parse leaves the default in place.

/// Get a u32 value from an environment variable or use the default
pub fn get_env_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a u64 value from an environment variable or use the default
pub fn get_env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a usize value from an environment variable or use the default
pub fn get_env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a f64 value from an environment variable or use the default
pub fn get_env_f64(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a comma-separated list of frame indices from an environment variable.
///
/// Entries that fail to parse are skipped.
pub fn get_env_u64_list(key: &str, default: Vec<u64>) -> Vec<u64> {
    match std::env::var(key) {
        Ok(val) => parse_u64_list(&val),
        Err(_) => default,
    }
}

pub(crate) fn parse_u64_list(value: &str) -> Vec<u64> {
    value
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect()
}
