//! Temporary file management utilities.
//!
//! Cache writes stage their bytes in a temp file next to the destination so
//! the final rename never crosses filesystems. The tempfile crate removes
//! the file on drop, which covers every early-return path.

use crate::error::CoreResult;
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, NamedTempFile};

/// Creates a temporary file with prefix and extension. Auto-deleted when dropped.
///
/// The process id is part of the name so concurrent writers never share a
/// temp path; the random suffix separates writers inside one process.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let temp_file = TempFileBuilder::new()
        .prefix(&format!("{prefix}.{}.", std::process::id()))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;

    Ok(temp_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_file_is_named_and_cleaned_up() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = {
            let file = create_temp_file(dir.path(), ".selection.json", "tmp")?;
            let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with(&format!(".selection.json.{}.", std::process::id())));
            assert!(name.ends_with(".tmp"));
            file.path().to_path_buf()
        };
        assert!(!path.exists());
        Ok(())
    }
}
