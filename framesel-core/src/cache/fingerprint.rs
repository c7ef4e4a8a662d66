//! Cache keys.
//!
//! The key is a SHA-256 digest over a canonical JSON rendering of the clip
//! descriptors (sorted by role) and the selection config. Object keys are
//! sorted recursively before serialising, so field order in the structs or
//! in a config file never changes the key. User frames are hashed as a sorted
//! set, since their order and repeats never change the selection.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::clip::{ClipDescriptor, primary_clip, validate_clips};
use crate::config::SelectionConfig;
use crate::error::{CoreResult, config_error};

const KEY_ALGORITHM: &str = "sha256";

/// Digest identifying one set of selection inputs, rendered `sha256:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_hex(hex: impl AsRef<str>) -> Self {
        Self(format!("{KEY_ALGORITHM}:{}", hex.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digest without its algorithm prefix.
    pub fn hex(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, hex)| hex)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct FingerprintInputs<'a> {
    clips: Vec<&'a ClipDescriptor>,
    config_fingerprint: &'a SelectionConfig,
}

/// Rebuilds every object with its keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Canonical byte rendering of the selection inputs.
pub fn canonical_inputs(clips: &[ClipDescriptor], config: &SelectionConfig) -> CoreResult<Vec<u8>> {
    let mut sorted: Vec<&ClipDescriptor> = clips.iter().collect();
    sorted.sort_by_key(|c| c.role);
    let mut config = config.clone();
    config.user_frames.sort_unstable();
    config.user_frames.dedup();
    let value = serde_json::to_value(FingerprintInputs {
        clips: sorted,
        config_fingerprint: &config,
    })?;
    Ok(serde_json::to_vec(&canonicalize(value))?)
}

/// Hashes inputs without validating them. Used to re-check stored entries.
pub fn compute_key(clips: &[ClipDescriptor], config: &SelectionConfig) -> CoreResult<CacheKey> {
    let bytes = canonical_inputs(clips, config)?;
    Ok(CacheKey::from_hex(format!("{:x}", Sha256::digest(&bytes))))
}

/// Validates the config and clip set, then hashes them.
///
/// All configuration errors surface here, before any metric work.
pub fn fingerprint(clips: &[ClipDescriptor], config: &SelectionConfig) -> CoreResult<CacheKey> {
    config.validate()?;
    validate_clips(clips)?;
    if let Some(primary) = primary_clip(clips) {
        if let Some(&frame) = config.user_frames.iter().find(|&&f| f >= primary.frame_count) {
            return Err(config_error(format!(
                "user frame {} is outside {} ({} frames)",
                frame,
                primary.path.display(),
                primary.frame_count
            )));
        }
    }
    compute_key(clips, config)
}
