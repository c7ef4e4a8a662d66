//! Crash-safe file replacement.
//!
//! Sequence: write a uniquely named temp file in the destination directory,
//! flush and fsync it, close the handle, then rename it over the destination.
//! Readers see either the old file or the complete new one.

use std::io::Write;
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::temp_files::create_temp_file;

/// Atomically replaces `path` with `bytes`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> CoreResult<()> {
    let wrap = |source| CoreError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        ".{}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "framesel".to_string())
    );

    let mut temp = create_temp_file(dir, &prefix, "tmp")?;
    temp.write_all(bytes).map_err(wrap)?;
    temp.flush().map_err(wrap)?;
    temp.as_file().sync_all().map_err(wrap)?;

    // The handle is closed here, before the rename.
    let temp_path = temp.into_temp_path();
    temp_path.persist(path).map_err(|e| wrap(e.error))?;
    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("selection.json");
        write_atomic(&path, b"first")?;
        write_atomic(&path, b"second")?;
        assert_eq!(std::fs::read_to_string(&path)?, "second");

        // No temp files are left behind.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
            .filter_map(Result::ok)
            .filter(|e| e.file_name() != "selection.json")
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[test]
    fn test_write_atomic_creates_parent_dirs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/cache/selection.json");
        write_atomic(&path, b"{}")?;
        assert_eq!(std::fs::read(&path)?, b"{}");
        Ok(())
    }
}
