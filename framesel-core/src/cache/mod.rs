// ============================================================================
// framesel-core/src/cache/mod.rs
// ============================================================================
//
// SELECTION CACHE: Fingerprinted, Atomically Written Selection Results
//
// A `CacheStore` owns one cache file location. It computes the key for a set
// of inputs, reads back an earlier result when the key still matches, and
// replaces the file atomically with a new result. Anything wrong with the
// file on disk (missing, unreadable, truncated, stale, tampered) is a
// `Lookup::Miss`, never an error: the caller simply recomputes.
//
// KEY COMPONENTS:
// - CacheKey / fingerprint: canonical SHA-256 over clips and config
// - CacheEntry: the persisted JSON shape
// - CacheStore: lookup / persist / clear for one location
// - annotate: optional hints in an existing per-frame text file
//
// STATE MODEL:
// NoEntry --persist--> Valid --inputs change--> Stale (a Miss) --persist--> Valid
// There is no in-place repair; a bad entry is only ever overwritten.

use std::io;
use std::path::{Path, PathBuf};

use crate::clip::ClipDescriptor;
use crate::config::SelectionConfig;
use crate::error::CoreResult;
use crate::selection::{SelectionRecord, SelectionResult};
use crate::warnings::{RunWarnings, WarningKind};

pub mod annotate;
pub mod atomic;
pub mod entry;
pub mod fingerprint;

pub use entry::{CACHE_FORMAT_VERSION, CacheEntry, CacheInputs};
pub use fingerprint::{CacheKey, canonical_inputs, compute_key};

/// Why a lookup did not produce a usable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No file at the cache location.
    NoEntry,
    /// The file could not be read.
    Unreadable,
    /// The file is not a well-formed cache entry.
    Corrupt,
    /// The entry was written by an incompatible format version.
    UnsupportedVersion(String),
    /// The stored key does not match the entry's own inputs.
    IntegrityMismatch,
    /// The entry is valid but for different inputs.
    Stale,
}

impl std::fmt::Display for MissReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissReason::NoEntry => write!(f, "no cache entry"),
            MissReason::Unreadable => write!(f, "cache file unreadable"),
            MissReason::Corrupt => write!(f, "cache file corrupt"),
            MissReason::UnsupportedVersion(v) => write!(f, "unsupported cache format version '{v}'"),
            MissReason::IntegrityMismatch => write!(f, "cache key does not match cached inputs"),
            MissReason::Stale => write!(f, "cache entry is for different inputs"),
        }
    }
}

/// Outcome of [`CacheStore::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(SelectionResult),
    Miss(MissReason),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

/// The cache file for one selection location.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates inputs and computes their key. See [`fingerprint::fingerprint`].
    pub fn fingerprint(&self, clips: &[ClipDescriptor], config: &SelectionConfig) -> CoreResult<CacheKey> {
        fingerprint::fingerprint(clips, config)
    }

    /// Reads the entry at this location and checks it against `expected`.
    ///
    /// The stored key is recomputed from the stored inputs, so a hand-edited
    /// or partially overwritten entry cannot pass as a hit.
    pub fn lookup(&self, expected: &CacheKey, warnings: &RunWarnings) -> Lookup {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No cache entry at {}", self.path.display());
                return Lookup::Miss(MissReason::NoEntry);
            }
            Err(e) => {
                warnings.warn_once(
                    WarningKind::CacheCorrupt,
                    &format!("Could not read cache file {}: {}", self.path.display(), e),
                );
                return Lookup::Miss(MissReason::Unreadable);
            }
        };

        let entry = match self.parse(&text) {
            Ok(entry) => entry,
            Err(reason) => {
                if reason == MissReason::Corrupt {
                    warnings.warn_once(
                        WarningKind::CacheCorrupt,
                        &format!("Ignoring corrupt cache file {}", self.path.display()),
                    );
                } else {
                    log::info!("Ignoring cache file {}: {}", self.path.display(), reason);
                }
                return Lookup::Miss(reason);
            }
        };

        match compute_key(&entry.inputs.clips, &entry.inputs.config_fingerprint) {
            Ok(recomputed) if recomputed == entry.cache_key => {}
            _ => {
                warnings.warn_once(
                    WarningKind::CacheIntegrity,
                    &format!(
                        "Cache file {} does not match its own inputs; ignoring it",
                        self.path.display()
                    ),
                );
                return Lookup::Miss(MissReason::IntegrityMismatch);
            }
        }

        if entry.cache_key != *expected {
            log::info!(
                "Cache entry {} is stale (inputs now hash to {})",
                entry.cache_key,
                expected
            );
            return Lookup::Miss(MissReason::Stale);
        }

        log::info!("Cache hit: {} ({} selections)", entry.cache_key, entry.selections.len());
        Lookup::Hit(entry.into_result(warnings))
    }

    fn parse(&self, text: &str) -> Result<CacheEntry, MissReason> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            log::debug!("Cache JSON error in {}: {}", self.path.display(), e);
            MissReason::Corrupt
        })?;
        match value.get("version").and_then(|v| v.as_str()) {
            Some(CACHE_FORMAT_VERSION) => {}
            Some(other) => return Err(MissReason::UnsupportedVersion(other.to_string())),
            None => return Err(MissReason::Corrupt),
        }
        serde_json::from_value(value).map_err(|e| {
            log::debug!("Cache entry shape error in {}: {}", self.path.display(), e);
            MissReason::Corrupt
        })
    }

    /// Atomically writes `entry`, replacing whatever is at this location.
    pub fn persist_entry(&self, entry: &CacheEntry) -> CoreResult<()> {
        let mut bytes = serde_json::to_vec_pretty(entry)?;
        bytes.push(b'\n');
        atomic::write_atomic(&self.path, &bytes)?;
        log::info!("Cached {} selections at {}", entry.selections.len(), self.path.display());
        Ok(())
    }

    /// Persists a freshly computed result.
    pub fn persist(&self, result: &SelectionResult) -> CoreResult<()> {
        self.persist_entry(&CacheEntry::from_result(result))
    }

    /// Deletes the cache file. Returns whether there was one.
    pub fn clear(&self) -> CoreResult<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Removed cache file {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Adds selection hints to an existing per-frame text file.
    pub fn annotate_frame_list(&self, frame_list: &Path, selections: &[SelectionRecord]) -> CoreResult<usize> {
        annotate::annotate_frame_list(frame_list, selections)
    }
}
