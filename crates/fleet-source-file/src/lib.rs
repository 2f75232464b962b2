use std::io::ErrorKind;
use std::path::PathBuf;

use bytes::Bytes;
use fleet_source_core::*;

#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Snapshot file written by the simulation.
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("map_viewer/state.json") }
    }
}

/// Reads the snapshot straight from disk. The producer replaces the file
/// atomically, so a read never sees a half-written document.
pub struct FileSource { cfg: FileConfig }
impl FileSource { pub fn new(cfg: FileConfig) -> Self { Self { cfg } } }

#[async_trait::async_trait]
impl SnapshotSource for FileSource {
    async fn fetch(&self) -> Result<Bytes, SourceError> {
        match tokio::fs::read(&self.cfg.path).await {
            Ok(body) => Ok(Bytes::from(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SourceError::NotFound),
            Err(e) => Err(SourceError::Io(e)),
        }
    }

    fn describe(&self) -> String {
        self.cfg.path.display().to_string()
    }
}
