use std::fs;
use std::io;
use std::path::PathBuf;

use earlybird_core::{ArtifactName, ArtifactStore};
use tracing::info;

/// Writes boarding pass pages into one directory, one file per flight.
#[derive(Debug, Clone)]
pub struct DirectoryArtifactStore {
    directory: PathBuf,
}

impl DirectoryArtifactStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }
}

impl ArtifactStore for DirectoryArtifactStore {
    fn persist(&self, name: &ArtifactName, body: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(name.file_name());
        fs::write(&path, body)?;
        info!("Saved boarding pass to {}", path.display());
        Ok(path)
    }
}
