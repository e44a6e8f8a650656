use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Writes generated artifacts into the output directory. Job ids make
/// artifact names unique, so a name collision means a duplicate handoff and
/// is treated as an error rather than resolved with a suffix.
pub struct ArtifactStorage {
    output_directory: PathBuf,
}

impl ArtifactStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.output_directory.join(filename)
    }

    pub fn store(&self, content: &[u8], filename: &str) -> Result<PathBuf, StorageError> {
        if !self.output_directory.exists() {
            std::fs::create_dir_all(&self.output_directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.output_directory.clone(),
                    source: e,
                }
            })?;
        }

        let path = self.output_directory.join(filename);

        // create_new gives atomic check-and-create; no TOCTOU window.
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::FileExists(path));
            }
            Err(e) => {
                return Err(StorageError::WriteFile { path, source: e });
            }
        };

        file.write_all(content)
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;

        Ok(path)
    }

    /// Best-effort removal of a stored artifact, used when a later handoff
    /// step fails and earlier outputs must not be left behind.
    pub fn discard(&self, filename: &str) {
        let _ = std::fs::remove_file(self.output_directory.join(filename));
    }
}
