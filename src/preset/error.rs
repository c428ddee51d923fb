//! Preset store error types.

use thiserror::Error;

/// Errors that can occur while persisting the preset collection.
#[derive(Debug, Error)]
pub enum PresetStoreError {
    /// Reading or writing the store file failed.
    #[error("preset store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the store document failed.
    #[error("preset store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
