/*!
    Error types for the ndio crate ecosystem.
*/

use std::path::Path;

use thiserror::Error;

/**
    Error type for the ndio crate ecosystem.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Process-wide backend initialization failed.
    #[error("backend initialization failed: {0}")]
    InitFailed(String),

    /// A container, stream or codec could not be created.
    #[error("failed to open {path}: {message}")]
    OpenFailed { path: String, message: String },

    /// The open mode was not recognized, or the session does not support the operation.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),

    /// A pixel format has no array-model equivalent.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A four-dimensional array has no dimension of one to four elements to use as channels.
    #[error("unsupported number of color channels: {0}")]
    UnsupportedChannelCount(usize),

    /// An array has fewer than two or more than four dimensions.
    #[error("unsupported number of dimensions: {0}")]
    UnsupportedRank(usize),

    /// A frame index outside `0..count`, or a read from a file with no frames.
    #[error("frame {index} is out of range for {count} frames")]
    OutOfRange { index: i64, count: u64 },

    /// Frames written after the first must match the geometry the encoder was opened with.
    #[error("frame geometry {actual} does not match encoder geometry {expected}")]
    GeometryMismatch { expected: String, actual: String },

    /// An array does not have the shape or element type an operation requires.
    #[error("array shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Reading a packet or decoding a frame failed.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// Opening the encoder or encoding a frame failed.
    #[error("encode failed: {0}")]
    EncodeFailed(String),

    /// Container write, header or trailer failure.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The container could not seek to the requested frame.
    #[error("seek failed: {0}")]
    SeekFailed(String),

    /// The file handle was already closed.
    #[error("file is closed")]
    Closed,
}

impl Error {
    /**
        Create an open error for the given path.
    */
    pub fn open_failed(path: &Path, message: impl ToString) -> Self {
        Self::OpenFailed {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /**
        Create an unsupported format error with the given message.
    */
    pub fn unsupported_format(message: impl ToString) -> Self {
        Self::UnsupportedFormat(message.to_string())
    }

    /**
        Create a shape mismatch error with the given message.
    */
    pub fn shape_mismatch(message: impl ToString) -> Self {
        Self::ShapeMismatch(message.to_string())
    }

    /**
        Create a decode error with the given message.
    */
    pub fn decode(message: impl ToString) -> Self {
        Self::DecodeFailed(message.to_string())
    }

    /**
        Create an encode error with the given message.
    */
    pub fn encode(message: impl ToString) -> Self {
        Self::EncodeFailed(message.to_string())
    }

    /**
        Create a write error with the given message.
    */
    pub fn write(message: impl ToString) -> Self {
        Self::WriteFailed(message.to_string())
    }

    /**
        Create a seek error with the given message.
    */
    pub fn seek(message: impl ToString) -> Self {
        Self::SeekFailed(message.to_string())
    }
}

/**
    Result type alias for the ndio crate ecosystem.
*/
pub type Result<T> = std::result::Result<T, Error>;
