//! # openimg-io
//!
//! Reading and writing image files through a uniform contract.
//!
//! This crate defines the reader/writer traits every format handler
//! implements, a registry that resolves files to handlers, and the
//! conversion plumbing between a file's native pixel layout and whatever
//! the caller asks for:
//!
//! - [`ImageInput`] / [`ImageOutput`] - the per-format contract
//! - [`open`] / [`create`] - entry points with format auto-detection
//! - [`registry`] - format registration and lookup
//! - [`convert`] - data type conversion and strided placement
//! - [`DeepData`] - variable-sample-count ("deep") pixel storage
//! - [`global`] - process-wide attributes and hardening limits
//!
//! # Architecture
//!
//! A format handler implements only the `*_native_*` methods, which move
//! bytes in the file's own layout. Everything callers actually use -
//! data type conversion, strides, whole-image reads with progress and
//! parallelism - is provided by the traits on top of those primitives,
//! so every format gets the full API for the price of a scanline (or
//! tile) reader.
//!
//! Readers take `&self` and are usable from several threads at once;
//! writers take `&mut self` and are single-stream.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use openimg_core::DataFormat;
//!
//! // Read: format auto-detected by extension, then content.
//! let input = openimg_io::open(Path::new("input.ppm"))?;
//! let spec = input.spec(0, 0)?;
//! let mut pixels = vec![0u8; spec.image_pixels() as usize * spec.nchannels as usize];
//! input.read_image(0, 0, 0, spec.nchannels, DataFormat::U8,
//!     &mut pixels, None, None, None, None)?;
//!
//! // Write it back out.
//! let mut output = openimg_io::create(Path::new("copy.ppm"))?;
//! output.open(Path::new("copy.ppm"), &spec, Default::default())?;
//! output.write_image(DataFormat::U8, &pixels, None, None, None, None)?;
//! output.close()?;
//! # Ok::<(), openimg_io::IoError>(())
//! ```
//!
//! # Built-in Formats
//!
//! | Format | Read | Write | Notes |
//! |--------|------|-------|-------|
//! | pnm | Yes | Yes | Binary PGM/PPM, 8/16-bit |
//! | null | Yes | Yes | Synthetic fill source, discarding sink |
//!
//! # Dependencies
//!
//! - [`openimg_core`] - specs, ROIs, metadata
//! - [`rayon`] - parallel whole-image reads
//! - [`half`] - f16 sample conversion

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod capability;
pub mod convert;
pub mod deepdata;
mod error;
pub mod global;
pub mod input;
pub mod ioproxy;
pub mod nullimg;
pub mod output;
pub mod pnm;
pub mod registry;

pub use capability::Capability;
pub use deepdata::DeepData;
pub use error::{IoError, IoResult};
pub use input::{ImageInput, ProgressCallback};
pub use ioproxy::{IoProxy, IoSink};
pub use output::{ImageOutput, OpenMode};
pub use registry::{FormatInfo, create, create_format, declare_format, open, open_with_config};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use openimg_io::prelude::*;
/// ```
pub mod prelude {
    pub use crate::capability::Capability;
    pub use crate::deepdata::DeepData;
    pub use crate::error::{IoError, IoResult};
    pub use crate::input::{ImageInput, ProgressCallback};
    pub use crate::output::{ImageOutput, OpenMode};
    pub use crate::registry::{create, create_format, open, open_with_config};
    pub use openimg_core::prelude::*;
}
