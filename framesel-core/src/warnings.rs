//! Once-per-run warning bookkeeping.
//!
//! Recovered anomalies (corrupt cache files, decode failures, partial cache
//! data) are reported with `log::warn!` the first time a kind is seen during
//! a run. Later occurrences of the same kind are demoted to `debug!` so a
//! damaged input cannot flood the log.

use std::cell::RefCell;
use std::collections::BTreeSet;

/// Classes of recovered anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningKind {
    /// Cache file exists but could not be read or parsed.
    CacheCorrupt,
    /// Cache entry's stored key does not match its own inputs.
    CacheIntegrity,
    /// Persisted selections and metric snapshot disagree in length.
    CacheMetricMismatch,
    /// Persisted frame indices outside the clip or duplicated.
    CacheOutOfRange,
    /// Cache file could not be written.
    CacheWrite,
    /// Frame source failed; synthetic metrics were used.
    DecodeFallback,
    /// Frame stream ended before the last sampled index; partial metrics kept.
    DecodeShortfall,
    /// Dynamic range probe failed; SDR was assumed.
    HdrProbe,
    /// Frame-list annotation could not be applied.
    Annotation,
}

/// Per-run record of which warning kinds were already emitted.
#[derive(Debug, Default)]
pub struct RunWarnings {
    seen: RefCell<BTreeSet<WarningKind>>,
}

impl RunWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs `message` at warn level the first time `kind` is reported.
    ///
    /// Returns `true` when the warning was emitted.
    pub fn warn_once(&self, kind: WarningKind, message: &str) -> bool {
        let first = self.seen.borrow_mut().insert(kind);
        if first {
            log::warn!("{message}");
        } else {
            log::debug!("(repeat {kind:?}) {message}");
        }
        first
    }

    /// Whether `kind` has been reported during this run.
    pub fn has_seen(&self, kind: WarningKind) -> bool {
        self.seen.borrow().contains(&kind)
    }

    /// Number of distinct kinds reported so far.
    pub fn count(&self) -> usize {
        self.seen.borrow().len()
    }
}
