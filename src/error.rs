use std::path::PathBuf;

use thiserror::Error;

use crate::contract::StoreError;

/// Errors raised while reading an archive or publishing its activities.
///
/// Unreadable or malformed archive files are not represented here: document
/// loading logs and skips them.
#[derive(Debug, Error)]
pub enum ApError {
    /// A required field or referenced node is absent.
    #[error("missing ActivityStreams data: {0}")]
    MissingData(String),
    #[error("attachment url cannot be resolved to a local path: {0}")]
    AttachmentUrl(String),
    #[error("failed to read attachment {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize activity: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("blob store request failed: {0}")]
    Store(#[from] StoreError),
}

impl ApError {
    pub fn missing(what: impl Into<String>) -> Self {
        ApError::MissingData(what.into())
    }
}
