//! Staged file writes: render to a hidden temp file, then rename into place.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A destination written through `.{filename}.tmp` in the same directory.
///
/// Dropping an uncommitted stage removes the temp file, so a failed write
/// never leaves a partial workbook at the destination.
pub(crate) struct StagedFile {
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
}

impl StagedFile {
    pub(crate) fn new(final_path: &Path) -> Result<Self> {
        let filename = final_path
            .file_name()
            .with_context(|| format!("Destination has no file name: {}", final_path.display()))?
            .to_string_lossy();
        let temp_filename = format!(".{}.tmp", filename);
        let temp_path = match final_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(temp_filename),
            _ => PathBuf::from(temp_filename),
        };

        debug!(
            "Staging workbook: {} (temp: {})",
            final_path.display(),
            temp_path.display()
        );

        Ok(Self {
            temp_path: Some(temp_path),
            final_path: final_path.to_path_buf(),
        })
    }

    pub(crate) fn write_all(&self, bytes: &[u8]) -> Result<()> {
        let temp_path = self
            .temp_path
            .as_ref()
            .context("Staged file already committed")?;
        let mut file = File::create(temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync temp file: {}", temp_path.display()))?;
        Ok(())
    }

    pub(crate) fn commit(mut self) -> Result<()> {
        if let Some(temp_path) = self.temp_path.take() {
            std::fs::rename(&temp_path, &self.final_path).with_context(|| {
                format!(
                    "Failed to rename {} -> {}",
                    temp_path.display(),
                    self.final_path.display()
                )
            })?;
            info!("Committed workbook: {}", self.final_path.display());
        }
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Some(temp_path) = &self.temp_path {
            if temp_path.exists() {
                let _ = std::fs::remove_file(temp_path);
                warn!("Cleaned up orphaned temp file: {}", temp_path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_moves_temp_into_place() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.xlsx");

        let stage = StagedFile::new(&dest).unwrap();
        stage.write_all(b"payload").unwrap();
        assert!(dir.path().join(".out.xlsx.tmp").exists());
        assert!(!dest.exists());

        stage.commit().unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
        assert!(!dir.path().join(".out.xlsx.tmp").exists());
    }

    #[test]
    fn test_drop_without_commit_cleans_up() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.xlsx");

        {
            let stage = StagedFile::new(&dest).unwrap();
            stage.write_all(b"partial").unwrap();
        }

        assert!(!dir.path().join(".out.xlsx.tmp").exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_commit_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.xlsx");
        std::fs::write(&dest, b"old").unwrap();

        let stage = StagedFile::new(&dest).unwrap();
        stage.write_all(b"new").unwrap();
        stage.commit().unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }
}
