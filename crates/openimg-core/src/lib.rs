//! # openimg-core
//!
//! Core value types for image I/O.
//!
//! This crate provides the foundational types used throughout the openimg
//! ecosystem:
//!
//! - [`Roi`] - Half-open region of interest over (x, y, z, channel)
//! - [`DataFormat`] - Per-channel sample storage types
//! - [`ImageSpec`] - Image geometry, channels, and metadata
//! - [`AttrValue`], [`ParamValue`] - Typed named metadata
//!
//! ## Design Philosophy
//!
//! Everything here is a plain value type: freely cloned, no hidden
//! ownership, no I/O. Metadata lookups miss softly with `None`, size
//! computations saturate instead of overflowing, and parsing is the only
//! fallible surface. The format plugins and the reader/writer contract
//! live in `openimg-io`, which builds on these types.
//!
//! ## Crate Structure
//!
//! ```text
//! openimg-core (this crate)
//!    ^
//!    |
//!    +-- openimg-io (ImageInput/ImageOutput, format registry, plugins)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use openimg_core::{DataFormat, ImageSpec, Roi};
//!
//! let mut spec = ImageSpec::from_dimensions(1920, 1080, 4, DataFormat::F16);
//! spec.attribute("compression", "zip");
//!
//! let crop = Roi::new_2d(0, 960, 0, 540, 0, 4);
//! assert!(spec.roi().contains_roi(&crop));
//! assert_eq!(spec.pixel_bytes(false), 8);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attr;
pub mod error;
pub mod format;
pub mod roi;
pub mod serialize;
pub mod spec;

// Re-exports for convenience
pub use attr::{AttrKind, AttrValue, ParamValue};
pub use error::{Error, Result};
pub use format::DataFormat;
pub use roi::{Roi, roi_intersection, roi_union};
pub use serialize::{SpecFormat, SpecVerbosity};
pub use spec::ImageSpec;

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use openimg_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::attr::{AttrKind, AttrValue, ParamValue};
    pub use crate::error::{Error, Result};
    pub use crate::format::DataFormat;
    pub use crate::roi::Roi;
    pub use crate::serialize::{SpecFormat, SpecVerbosity};
    pub use crate::spec::ImageSpec;
}
