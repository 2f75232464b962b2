//! Snapshot source trait shared by the viewer's connectors

use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("snapshot not found")]
    NotFound,
    #[error("snapshot source responded with {0}")]
    Status(u16),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Anything that can hand over the current snapshot document.
///
/// Implementations must not serve cached bodies: every call should reach
/// the underlying store.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Bytes, SourceError>;

    /// Short label for log lines.
    fn describe(&self) -> String;
}

#[async_trait::async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    async fn fetch(&self) -> Result<Bytes, SourceError> {
        (**self).fetch().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
