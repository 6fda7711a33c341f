//! Error types for loading scenes.

use std::path::PathBuf;

use onefile_decode::DecodeError;
use thiserror::Error;

/// Errors that can abort a scene load.
#[derive(Debug, Error)]
pub enum Error {
    /// The container could not be opened or read.
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container bytes are not a valid `.ONE` file.
    #[error("failed to decode container: {0}")]
    Decode(#[from] DecodeError),

    /// The load was abandoned because its controller is being dropped.
    #[error("load cancelled")]
    Cancelled,

    /// The background runtime could not be started.
    #[error("failed to start loader runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Result type for loading operations.
pub type Result<T> = std::result::Result<T, Error>;
