//! Scratch Files
//!
//! Temporary artifacts produced while editing. A scratch file is deleted when
//! dropped unless it was persisted to a final location first.

use std::io;
use std::path::Path;

use tempfile::TempPath;

/// Temporary file owned by whoever holds it
#[derive(Debug)]
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    /// Creates an empty scratch file in the system temp directory
    pub fn create(suffix: &str) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("tanto-")
            .suffix(suffix)
            .tempfile()?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Creates an empty scratch file inside `dir`.
    ///
    /// Use this when the file will later be persisted next to its final
    /// location, so the rename stays on one filesystem.
    pub fn create_in(dir: &Path, suffix: &str) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(".tanto-")
            .suffix(suffix)
            .tempfile_in(dir)?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the file to `dest`, replacing anything there
    pub fn persist(self, dest: &Path) -> io::Result<()> {
        self.path.persist(dest).map_err(|e| e.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scratch_deleted_on_drop() {
        let dir = TempDir::new().unwrap();
        let scratch = ScratchFile::create_in(dir.path(), ".mkv").unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "mkv");

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_persist_keeps_file() {
        let dir = TempDir::new().unwrap();
        let scratch = ScratchFile::create_in(dir.path(), ".wav").unwrap();
        std::fs::write(scratch.path(), b"data").unwrap();

        let dest = dir.path().join("0.wav");
        scratch.persist(&dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");
    }
}
