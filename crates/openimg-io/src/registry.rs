//! The format registry and the `open`/`create` entry points.
//!
//! Every format handler is described by a [`FormatInfo`]: its name, file
//! extensions, a magic-byte probe, and constructors for its reader and
//! writer. The built-in formats are registered on first use; applications
//! add their own with [`declare_format`].
//!
//! [`open`] resolves a file in two passes. The extension is tried first;
//! if no format claims it (or the claimant fails to parse the file), the
//! first bytes of the file are probed against every registered
//! [`FormatInfo::can_read`]. Files are what they contain, not what they
//! are called.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let input = openimg_io::open(Path::new("render.ppm"))?;
//! let spec = input.spec(0, 0)?;
//! println!("{} x {}", spec.width, spec.height);
//! # Ok::<(), openimg_io::IoError>(())
//! ```

use std::io::Read;
use std::path::Path;
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use openimg_core::ImageSpec;
use tracing::{debug, warn};

use crate::capability::Capability;
use crate::error::{IoError, IoResult};
use crate::input::ImageInput;
use crate::output::ImageOutput;
use crate::{nullimg, pnm};

/// How many leading bytes of a file the content probe may look at.
const PROBE_BYTES: usize = 64;

/// Everything the registry needs to know about one format handler.
#[derive(Clone, Copy)]
pub struct FormatInfo {
    /// Short lowercase format name ("pnm", "null", ...).
    pub name: &'static str,
    /// File extensions claimed by this format, lowercase, no dot.
    pub extensions: &'static [&'static str],
    /// Magic-byte probe over the first bytes of a file.
    pub can_read: fn(&[u8]) -> bool,
    /// Opens a reader, optionally with configuration hints.
    pub open_input: fn(&Path, Option<&ImageSpec>) -> IoResult<Box<dyn ImageInput>>,
    /// Creates an unopened writer, or None for read-only formats.
    pub create_output: Option<fn() -> Box<dyn ImageOutput>>,
    /// What the format can do, for capability queries without opening.
    pub capabilities: &'static [Capability],
}

impl std::fmt::Debug for FormatInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatInfo")
            .field("name", &self.name)
            .field("extensions", &self.extensions)
            .field("writable", &self.create_output.is_some())
            .finish()
    }
}

fn open_pnm(path: &Path, config: Option<&ImageSpec>) -> IoResult<Box<dyn ImageInput>> {
    Ok(Box::new(pnm::PnmInput::open(path, config)?))
}

fn make_pnm_output() -> Box<dyn ImageOutput> {
    Box::new(pnm::PnmOutput::new())
}

fn open_null(path: &Path, config: Option<&ImageSpec>) -> IoResult<Box<dyn ImageInput>> {
    Ok(Box::new(nullimg::NullInput::open(path, config)?))
}

fn make_null_output() -> Box<dyn ImageOutput> {
    Box::new(nullimg::NullOutput::new())
}

fn never_matches(_header: &[u8]) -> bool {
    false
}

fn builtin_formats() -> Vec<FormatInfo> {
    vec![
        FormatInfo {
            name: "pnm",
            extensions: &["ppm", "pgm", "pnm"],
            can_read: pnm::matches_header,
            open_input: open_pnm,
            create_output: Some(make_pnm_output),
            capabilities: &[Capability::IoProxy],
        },
        FormatInfo {
            name: "null",
            extensions: &["null", "nul"],
            can_read: never_matches,
            open_input: open_null,
            create_output: Some(make_null_output),
            capabilities: &[
                Capability::Tiles,
                Capability::MultiImage,
                Capability::MipMap,
                Capability::AppendSubimage,
                Capability::RandomAccess,
            ],
        },
    ]
}

fn registry() -> &'static RwLock<Vec<FormatInfo>> {
    static REGISTRY: OnceLock<RwLock<Vec<FormatInfo>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(builtin_formats()))
}

fn read_registry() -> RwLockReadGuard<'static, Vec<FormatInfo>> {
    match registry().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_registry() -> RwLockWriteGuard<'static, Vec<FormatInfo>> {
    match registry().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registers a format handler, replacing any existing one with the same
/// name.
pub fn declare_format(info: FormatInfo) {
    let mut formats = write_registry();
    if let Some(existing) = formats.iter_mut().find(|f| f.name == info.name) {
        debug!(name = info.name, "replacing registered format");
        *existing = info;
    } else {
        debug!(name = info.name, "registering format");
        formats.push(info);
    }
}

/// Whether `name` is a registered format name.
pub fn is_format_name(name: &str) -> bool {
    read_registry().iter().any(|f| f.name == name)
}

/// Names of all registered formats, in registration order.
pub fn format_names() -> Vec<&'static str> {
    read_registry().iter().map(|f| f.name).collect()
}

/// All formats and their extensions in `name:ext1,ext2;name2:...` form.
pub fn extension_list() -> String {
    read_registry()
        .iter()
        .map(|f| format!("{}:{}", f.name, f.extensions.join(",")))
        .collect::<Vec<_>>()
        .join(";")
}

fn find_by_extension(ext: &str) -> Option<FormatInfo> {
    read_registry()
        .iter()
        .find(|f| f.extensions.contains(&ext))
        .copied()
}

fn find_by_name(name: &str) -> Option<FormatInfo> {
    read_registry().iter().find(|f| f.name == name).copied()
}

/// Opens an image file for reading, resolving the format by extension
/// and then by content.
pub fn open(path: &Path) -> IoResult<Box<dyn ImageInput>> {
    open_impl(path, None)
}

/// Like [`open`], but passes configuration hints through to the format
/// handler (for formats that synthesize or reinterpret their content).
pub fn open_with_config(path: &Path, config: &ImageSpec) -> IoResult<Box<dyn ImageInput>> {
    open_impl(path, Some(config))
}

fn open_impl(path: &Path, config: Option<&ImageSpec>) -> IoResult<Box<dyn ImageInput>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if let Some(ext) = &ext {
        if let Some(info) = find_by_extension(ext) {
            match (info.open_input)(path, config) {
                Ok(input) => return Ok(input),
                Err(err) => {
                    debug!(
                        path = %path.display(),
                        format = info.name,
                        %err,
                        "extension match failed to open, probing content"
                    );
                }
            }
        }
    }

    // Content probe: the extension lied or was missing.
    let mut header = [0u8; PROBE_BYTES];
    let n = {
        let mut file = std::fs::File::open(path)?;
        read_up_to(&mut file, &mut header)?
    };
    let candidates: Vec<FormatInfo> = read_registry()
        .iter()
        .filter(|f| (f.can_read)(&header[..n]))
        .copied()
        .collect();
    for info in candidates {
        debug!(path = %path.display(), format = info.name, "content probe matched");
        match (info.open_input)(path, config) {
            Ok(input) => return Ok(input),
            Err(err) => debug!(format = info.name, %err, "probed format failed to open"),
        }
    }

    warn!(path = %path.display(), "no format handler recognizes file");
    Err(IoError::UnsupportedFormat(path.display().to_string()))
}

/// Reads as many bytes as the file has, up to the buffer size.
fn read_up_to(file: &mut std::fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        let got = file.read(&mut buf[n..])?;
        if got == 0 {
            break;
        }
        n += got;
    }
    Ok(n)
}

/// Creates an unopened writer for the format implied by the path's
/// extension.
pub fn create(path: &Path) -> IoResult<Box<dyn ImageOutput>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| IoError::UnsupportedFormat(path.display().to_string()))?;
    let info = find_by_extension(&ext)
        .ok_or_else(|| IoError::UnsupportedFormat(path.display().to_string()))?;
    let make = info
        .create_output
        .ok_or_else(|| IoError::UnsupportedFormat(format!("{} is read-only", info.name)))?;
    Ok(make())
}

/// Creates an unopened writer for a format by name.
pub fn create_format(name: &str) -> IoResult<Box<dyn ImageOutput>> {
    let info =
        find_by_name(name).ok_or_else(|| IoError::UnsupportedFormat(name.to_string()))?;
    let make = info
        .create_output
        .ok_or_else(|| IoError::UnsupportedFormat(format!("{name} is read-only")))?;
    Ok(make())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        assert!(is_format_name("pnm"));
        assert!(is_format_name("null"));
        assert!(!is_format_name("exr"));
    }

    #[test]
    fn test_extension_list_shape() {
        let list = extension_list();
        assert!(list.contains("pnm:ppm,pgm,pnm"));
        assert!(list.contains("null:null"));
    }

    #[test]
    fn test_create_by_name_and_extension() {
        assert_eq!(create_format("pnm").unwrap().format_name(), "pnm");
        assert!(create_format("webp").is_err());
        let out = create(Path::new("/tmp/out.PGM")).unwrap();
        assert_eq!(out.format_name(), "pnm");
        assert!(create(Path::new("/tmp/out")).is_err());
        assert!(create(Path::new("/tmp/out.xyz")).is_err());
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let err = open(Path::new("/no/such/file.ppm")).err().unwrap();
        assert!(matches!(err, IoError::Io(_)));
    }
}
