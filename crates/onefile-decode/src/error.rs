//! Error types for container decoding.

use thiserror::Error;

/// Errors that can occur while decoding a `.ONE` container.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A read ran past the end of the available bytes.
    #[error("unexpected end of data at offset {offset}")]
    Truncated { offset: u64 },

    /// The underlying reader failed for a reason other than end of data.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The trailer points before the start of the file.
    #[error("header offset is negative ({0})")]
    NegativeHeaderOffset(i64),

    /// The trailer holds a header length that cannot describe a region of the file.
    #[error("invalid header length {0}")]
    InvalidHeaderLength(i64),

    /// The header does not start with the container signature.
    #[error("invalid container signature {found} (expected {expected})")]
    BadSignature { found: i32, expected: i32 },

    /// A record count was negative.
    #[error("invalid {what} count {count}")]
    InvalidCount { what: &'static str, count: i32 },

    /// The voxel stream announced a different texture than the header.
    #[error("texture id mismatch: header declares {expected}, voxel stream has {found}")]
    TextureIdMismatch { expected: i64, found: i64 },

    /// The declared voxel count exceeds the configured bound.
    #[error("texture {texture_id} declares {count} voxels (limit {limit})")]
    TooManyVoxels {
        texture_id: i64,
        count: u64,
        limit: u64,
    },

    /// The voxel bounding box would need a dense field above the configured bound.
    #[error("texture {texture_id} needs {cells} dense cells (limit {limit})")]
    FieldTooLarge {
        texture_id: i64,
        cells: u64,
        limit: u64,
    },
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
