// ============================================================================
// framesel-core/src/orchestrator.rs
// ============================================================================
//
// SELECTION ORCHESTRATOR: The Public Entry Point
//
// `select` fingerprints the inputs, consults the cache and either returns the
// cached result untouched or runs metrics -> planner -> persist. A cache
// problem is fatal in exactly one case: frozen mode (`require_cache`) with no
// valid entry.
//
// FLOW:
// 1. Validate flags, config and clips; compute the key.
// 2. Unless `ignore_cache`: look up. Hit -> return it.
// 3. Miss + `require_cache` -> FrozenCache error, before any decoding.
// 4. Collect metrics per clip, plan, persist (best effort), return.
// Frame-list annotation runs after 2 or 4 when requested.

use std::path::Path;

use crate::cache::{CacheStore, Lookup};
use crate::clip::{ClipDescriptor, ClipRole};
use crate::config::{RunFlags, SelectionConfig};
use crate::error::{CoreError, CoreResult};
use crate::external::FrameSource;
use crate::metrics::MetricsCollector;
use crate::selection::{SelectionResult, plan};
use crate::warnings::{RunWarnings, WarningKind};

/// Drives one selection location with one frame source.
pub struct SelectionOrchestrator<'a, S: FrameSource + ?Sized> {
    source: &'a S,
    store: CacheStore,
}

impl<'a, S: FrameSource + ?Sized> SelectionOrchestrator<'a, S> {
    pub fn new(source: &'a S, store: CacheStore) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Captures a clip descriptor through this orchestrator's frame source.
    pub fn capture(&self, role: ClipRole, path: &Path) -> CoreResult<ClipDescriptor> {
        ClipDescriptor::capture(role, path, self.source)
    }

    /// Returns the selection for `clips` under `config`.
    ///
    /// Errors only for invalid configuration or flags, and for frozen mode
    /// without a valid cache entry. Decode failures, corrupt cache files and
    /// failed cache writes are logged (once per kind) and absorbed.
    pub fn select(
        &self,
        clips: &[ClipDescriptor],
        config: &SelectionConfig,
        flags: &RunFlags,
    ) -> CoreResult<SelectionResult> {
        flags.validate()?;
        let key = self.store.fingerprint(clips, config)?;
        log::debug!("Selection inputs hash to {}", key);
        let warnings = RunWarnings::new();

        if flags.ignore_cache {
            log::info!("Ignoring cache at {}; recomputing", self.store.path().display());
        } else {
            match self.store.lookup(&key, &warnings) {
                Lookup::Hit(result) => {
                    self.annotate(flags, &result, &warnings);
                    return Ok(result);
                }
                Lookup::Miss(reason) if flags.require_cache => {
                    return Err(CoreError::FrozenCache(format!(
                        "no valid cache entry for {} at {} ({}); refusing to recompute",
                        key,
                        self.store.path().display(),
                        reason
                    )));
                }
                Lookup::Miss(reason) => {
                    log::info!("Cache miss ({}); computing selections", reason);
                }
            }
        }

        let mut clips = clips.to_vec();
        clips.sort_by_key(|c| c.role);
        let metrics = MetricsCollector::new(self.source, config, &warnings).collect_all(&clips);
        let result = plan(key, &clips, &metrics, config);

        if let Err(e) = self.store.persist(&result) {
            warnings.warn_once(
                WarningKind::CacheWrite,
                &format!("Could not write selection cache: {e}"),
            );
        }
        self.annotate(flags, &result, &warnings);
        Ok(result)
    }

    fn annotate(&self, flags: &RunFlags, result: &SelectionResult, warnings: &RunWarnings) {
        let Some(frame_list) = flags.frame_list.as_deref() else {
            return;
        };
        if !frame_list.is_file() {
            log::debug!("Frame list {} does not exist; not annotating", frame_list.display());
            return;
        }
        if let Err(e) = self.store.annotate_frame_list(frame_list, &result.selections) {
            warnings.warn_once(
                WarningKind::Annotation,
                &format!("Could not annotate {}: {}", frame_list.display(), e),
            );
        }
    }
}
