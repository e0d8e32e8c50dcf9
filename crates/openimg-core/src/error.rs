//! Error types for core spec operations.
//!
//! Almost everything in this crate is a total function: metadata lookups
//! miss softly with `None` and size computations saturate. The only
//! fallible operations are the parsers, so the error surface is small.
//!
//! # Usage
//!
//! ```rust
//! use openimg_core::ImageSpec;
//!
//! let err = ImageSpec::from_xml("<not-a-spec/>").unwrap_err();
//! assert!(err.to_string().contains("ImageSpec"));
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from core spec parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed serialized spec (bad XML, bad number, missing element).
    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Creates an [`Error::Parse`] error.
    #[inline]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
