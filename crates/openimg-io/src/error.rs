//! Error types for I/O operations.
//!
//! Provides unified error handling for all image format operations. Every
//! fallible call in the reader/writer contract returns [`IoResult`]; there
//! is no side-channel error state to poll.

use std::io;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No registered format can handle the file.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid or corrupted file.
    #[error("invalid file: {0}")]
    InvalidFile(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// A header field exceeds a configured resource limit.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Caller passed an out-of-contract argument (bad range, bad index,
    /// misaligned tile corner).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation requires an open file but none is open.
    #[error("no file open")]
    NotOpen,

    /// The format exists but cannot do what was asked (tiles on a
    /// scanline format, deep data, random-access rewrites).
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A progress callback requested cancellation.
    #[error("operation aborted by progress callback")]
    Aborted,

    /// Subimage or MIP level index beyond what the file holds.
    #[error("no subimage {subimage} miplevel {miplevel}")]
    NoSuchSubimage {
        /// Requested subimage index.
        subimage: i32,
        /// Requested MIP level.
        miplevel: i32,
    },
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
