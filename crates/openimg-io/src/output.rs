//! The image writing contract.
//!
//! [`ImageOutput`] mirrors [`ImageInput`](crate::ImageInput) for the write
//! side. Implementors supply `open`, `write_native_scanlines`, and
//! optionally `write_native_tile`; the provided methods convert the
//! caller's format and strides to native and delegate.
//!
//! # Ordering and exclusivity
//!
//! All writes take `&mut self`: the exclusive borrow is the concurrency
//! story, there is no separate locking surface. Unless a format supports
//! [`Capability::RandomAccess`], scanlines and tiles must arrive in
//! increasing y (then z); implementations reject violations with
//! `InvalidArgument`.
//!
//! # Multi-image files
//!
//! A writer holds one open subimage at a time. Appending another is a new
//! `open` with [`OpenMode::AppendSubimage`] (or `AppendMipLevel` for the
//! next MIP level), valid only when the format advertises the matching
//! capability.

use std::path::Path;

use openimg_core::{DataFormat, ImageSpec};
use tracing::warn;

use crate::capability::Capability;
use crate::convert::{self, convert_pixels, copy_strided, gather_strided, native_formats};
use crate::deepdata::DeepData;
use crate::error::{IoError, IoResult};
use crate::input::{ImageInput, ProgressCallback};

/// How [`ImageOutput::open`] should treat an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Create or truncate; the file will hold this one subimage.
    #[default]
    Create,
    /// Keep existing subimages and append a new one.
    AppendSubimage,
    /// Append the next MIP level of the current subimage.
    AppendMipLevel,
}

/// A writer for one image file.
///
/// Obtained from [`create`](crate::create) /
/// [`create_format`](crate::create_format), then driven through
/// `open` / `write_*` / `close`.
pub trait ImageOutput: Send {
    /// Short lowercase format name ("pnm", "null").
    fn format_name(&self) -> &'static str;

    /// Whether this handler supports an optional capability.
    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    /// Opens (or re-opens for append) the file for writing pixels
    /// described by `spec`.
    fn open(&mut self, path: &Path, spec: &ImageSpec, mode: OpenMode) -> IoResult<()>;

    /// The spec of the currently open subimage. `undefined()` when
    /// nothing is open.
    fn spec(&self) -> &ImageSpec;

    /// Writes scanlines [ybegin, yend) at depth plane `z` from `data`,
    /// which holds full pixels (all channels) in native format,
    /// contiguously.
    fn write_native_scanlines(&mut self, ybegin: i32, yend: i32, z: i32, data: &[u8])
    -> IoResult<()>;

    /// Writes the full tile whose corner is (x, y, z) from native-format
    /// `data`. Only for formats with [`Capability::Tiles`].
    fn write_native_tile(&mut self, _x: i32, _y: i32, _z: i32, _data: &[u8]) -> IoResult<()> {
        Err(IoError::UnsupportedFeature(format!(
            "{} does not support tiles",
            self.format_name()
        )))
    }

    /// Finishes and closes the file. Idempotent.
    fn close(&mut self) -> IoResult<()> {
        Ok(())
    }

    /// Writes a single scanline; see [`write_scanlines`](Self::write_scanlines).
    fn write_scanline(
        &mut self,
        y: i32,
        z: i32,
        format: DataFormat,
        data: &[u8],
        xstride: Option<usize>,
    ) -> IoResult<()> {
        self.write_scanlines(y, y + 1, z, format, data, xstride, None)
    }

    /// Writes scanlines [ybegin, yend) from a caller buffer in `format`
    /// (`Unknown` = already native) with optional strides.
    #[allow(clippy::too_many_arguments)]
    fn write_scanlines(
        &mut self,
        ybegin: i32,
        yend: i32,
        z: i32,
        format: DataFormat,
        data: &[u8],
        xstride: Option<usize>,
        ystride: Option<usize>,
    ) -> IoResult<()> {
        let spec = self.spec().clone();
        if spec.undefined() {
            return Err(IoError::NotOpen);
        }
        if ybegin < spec.y || yend > spec.y + spec.height || ybegin >= yend {
            return Err(IoError::InvalidArgument(format!(
                "scanline range [{ybegin},{yend}) outside image y range [{},{})",
                spec.y,
                spec.y + spec.height
            )));
        }
        if z < spec.z || z >= spec.z + spec.depth {
            return Err(IoError::InvalidArgument(format!("z={z} outside image")));
        }

        let width = spec.width as usize;
        let nscan = (yend - ybegin) as usize;
        let native = gather_to_native(&spec, format, data, width, nscan, 1, xstride, ystride, None)?;
        self.write_native_scanlines(ybegin, yend, z, &native)
    }

    /// Writes one full tile from a caller buffer in `format`.
    ///
    /// (x, y, z) must be a tile corner of a tiled spec.
    #[allow(clippy::too_many_arguments)]
    fn write_tile(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        format: DataFormat,
        data: &[u8],
        xstride: Option<usize>,
        ystride: Option<usize>,
        zstride: Option<usize>,
    ) -> IoResult<()> {
        let spec = self.spec().clone();
        if spec.undefined() {
            return Err(IoError::NotOpen);
        }
        if spec.tile_width <= 0 {
            return Err(IoError::UnsupportedFeature(format!(
                "write_tile on untiled {} image",
                self.format_name()
            )));
        }
        if (x - spec.x) % spec.tile_width != 0
            || (y - spec.y) % spec.tile_height != 0
            || (z - spec.z) % spec.tile_depth != 0
        {
            return Err(IoError::InvalidArgument(format!(
                "({x}, {y}, {z}) is not a tile corner"
            )));
        }
        let native = gather_to_native(
            &spec,
            format,
            data,
            spec.tile_width as usize,
            spec.tile_height as usize,
            spec.tile_depth as usize,
            xstride,
            ystride,
            zstride,
        )?;
        self.write_native_tile(x, y, z, &native)
    }

    /// Writes the block of tiles covering the given pixel range, which
    /// must satisfy [`valid_tile_range`](openimg_core::ImageSpec::valid_tile_range).
    ///
    /// Edge tiles are zero-padded out to the full tile extent.
    #[allow(clippy::too_many_arguments)]
    fn write_tiles(
        &mut self,
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
        format: DataFormat,
        data: &[u8],
        xstride: Option<usize>,
        ystride: Option<usize>,
        zstride: Option<usize>,
    ) -> IoResult<()> {
        let spec = self.spec().clone();
        if spec.undefined() {
            return Err(IoError::NotOpen);
        }
        if spec.tile_width <= 0 {
            return Err(IoError::UnsupportedFeature(format!(
                "write_tiles on untiled {} image",
                self.format_name()
            )));
        }
        if !spec.valid_tile_range(xbegin, xend, ybegin, yend, zbegin, zend) {
            return Err(IoError::InvalidArgument(format!(
                "[{xbegin},{xend}) x [{ybegin},{yend}) x [{zbegin},{zend}) is not a valid tile range"
            )));
        }

        let src_formats: Vec<DataFormat> = if format.is_unknown() {
            native_formats(&spec, 0, spec.nchannels)
        } else {
            vec![format; spec.nchannels as usize]
        };
        let src_pixel: usize = src_formats.iter().map(|f| f.size()).sum();
        let region_w = (xend - xbegin) as usize;
        let region_h = (yend - ybegin) as usize;
        let (xs, ys, zs) =
            convert::resolve_strides(src_pixel, region_w, region_h, xstride, ystride, zstride);

        let tw = spec.tile_width;
        let th = spec.tile_height;
        let td = spec.tile_depth;
        let native_formats_all = native_formats(&spec, 0, spec.nchannels);
        let native_pixel: usize = native_formats_all.iter().map(|f| f.size()).sum();

        let mut tz = zbegin;
        while tz < zend {
            let mut ty = ybegin;
            while ty < yend {
                let mut tx = xbegin;
                while tx < xend {
                    let cw = tw.min(xend - tx) as usize;
                    let ch = th.min(yend - ty) as usize;
                    let cd = td.min(zend - tz) as usize;

                    let src_off = (tz - zbegin) as usize * zs
                        + (ty - ybegin) as usize * ys
                        + (tx - xbegin) as usize * xs;
                    let mut clipped = vec![0u8; cw * ch * cd * src_pixel];
                    gather_strided(
                        &data[src_off..],
                        &mut clipped,
                        src_pixel,
                        cw,
                        ch,
                        cd,
                        Some(xs),
                        Some(ys),
                        Some(zs),
                    )?;

                    let mut conv = vec![0u8; cw * ch * cd * native_pixel];
                    convert_pixels(
                        &clipped,
                        &src_formats,
                        &mut conv,
                        &native_formats_all,
                        cw * ch * cd,
                    )?;

                    // Pad edge tiles out to the full tile footprint.
                    let mut tile = vec![0u8; spec.tile_bytes(true)];
                    copy_strided(
                        &conv,
                        &mut tile,
                        native_pixel,
                        cw,
                        ch,
                        cd,
                        None,
                        Some(native_pixel * tw as usize),
                        Some(native_pixel * (tw * th) as usize),
                    )?;
                    self.write_native_tile(tx, ty, tz, &tile)?;
                    tx += tw;
                }
                ty += th;
            }
            tz += td;
        }
        Ok(())
    }

    /// Rewrites an arbitrary pixel rectangle.
    ///
    /// Only meaningful for formats with [`Capability::RandomAccess`];
    /// everything else reports `UnsupportedFeature`.
    #[allow(clippy::too_many_arguments)]
    fn write_rectangle(
        &mut self,
        _xbegin: i32,
        _xend: i32,
        _ybegin: i32,
        _yend: i32,
        _zbegin: i32,
        _zend: i32,
        _format: DataFormat,
        _data: &[u8],
    ) -> IoResult<()> {
        Err(IoError::UnsupportedFeature(format!(
            "{} does not support random-access rewrites",
            self.format_name()
        )))
    }

    /// Writes the whole data window from one caller buffer, with
    /// conversion, strides, and progress reporting.
    #[allow(clippy::too_many_arguments)]
    fn write_image(
        &mut self,
        format: DataFormat,
        data: &[u8],
        xstride: Option<usize>,
        ystride: Option<usize>,
        zstride: Option<usize>,
        progress: Option<ProgressCallback<'_>>,
    ) -> IoResult<()> {
        let spec = self.spec().clone();
        if spec.undefined() {
            return Err(IoError::NotOpen);
        }
        let width = spec.width as usize;
        let height = spec.height as usize;
        let depth = spec.depth as usize;

        let src_pixel: usize = if format.is_unknown() {
            spec.pixel_bytes(true)
        } else {
            spec.nchannels as usize * format.size()
        };
        let (xs, ys, zs) =
            convert::resolve_strides(src_pixel, width, height, xstride, ystride, zstride);
        let needed = convert::strided_extent(src_pixel, width, height, depth, xs, ys, zs);
        if data.len() < needed {
            return Err(IoError::InvalidArgument(format!(
                "image buffer too small: {} < {}",
                data.len(),
                needed
            )));
        }

        if spec.tile_width > 0 {
            // One tile row per band.
            let nbands = (spec.height as usize).div_ceil(spec.tile_height as usize) * depth;
            let mut done = 0usize;
            let mut tz = spec.z;
            while tz < spec.z + spec.depth {
                let mut ty = spec.y;
                while ty < spec.y + spec.height {
                    let yend = (ty + spec.tile_height).min(spec.y + spec.height);
                    let off =
                        ((tz - spec.z) as usize) * zs + ((ty - spec.y) as usize) * ys;
                    self.write_tiles(
                        spec.x,
                        spec.x + spec.width,
                        ty,
                        yend,
                        tz,
                        tz + spec.tile_depth.min(spec.z + spec.depth - tz),
                        format,
                        &data[off..],
                        Some(xs),
                        Some(ys),
                        Some(zs),
                    )?;
                    done += 1;
                    if let Some(cb) = progress {
                        if cb(done as f32 / nbands as f32) {
                            return Err(IoError::Aborted);
                        }
                    }
                    ty = yend;
                }
                tz += spec.tile_depth;
            }
            return Ok(());
        }

        let band = 64usize;
        let nbands = height.div_ceil(band) * depth;
        let mut done = 0usize;
        for zi in 0..depth {
            let z = spec.z + zi as i32;
            let mut ybegin = spec.y;
            while ybegin < spec.y + spec.height {
                let yend = (ybegin + band as i32).min(spec.y + spec.height);
                let off = zi * zs + ((ybegin - spec.y) as usize) * ys;
                self.write_scanlines(
                    ybegin,
                    yend,
                    z,
                    format,
                    &data[off..],
                    Some(xs),
                    Some(ys),
                )?;
                done += 1;
                if let Some(cb) = progress {
                    if cb(done as f32 / nbands as f32) {
                        return Err(IoError::Aborted);
                    }
                }
                ybegin = yend;
            }
        }
        if let Some(cb) = progress {
            cb(1.0);
        }
        Ok(())
    }

    /// Writes deep scanlines. Only for formats with
    /// [`Capability::DeepData`].
    fn write_deep_scanlines(
        &mut self,
        _ybegin: i32,
        _yend: i32,
        _z: i32,
        _deepdata: &DeepData,
    ) -> IoResult<()> {
        Err(IoError::UnsupportedFeature(format!(
            "{} does not support deep data",
            self.format_name()
        )))
    }

    /// Copies one subimage wholesale from an open input into this open
    /// output, in native format when the layouts agree, else through f32.
    fn copy_image(&mut self, input: &dyn ImageInput, subimage: i32) -> IoResult<()> {
        let inspec = input.spec(subimage, 0)?;
        let outspec = self.spec().clone();
        if outspec.undefined() {
            return Err(IoError::NotOpen);
        }
        if inspec.width != outspec.width
            || inspec.height != outspec.height
            || inspec.depth != outspec.depth
            || inspec.nchannels != outspec.nchannels
        {
            return Err(IoError::InvalidArgument(format!(
                "copy_image geometry mismatch: {}x{}x{}/{}ch vs {}x{}x{}/{}ch",
                inspec.width,
                inspec.height,
                inspec.depth,
                inspec.nchannels,
                outspec.width,
                outspec.height,
                outspec.depth,
                outspec.nchannels
            )));
        }

        let same_native = inspec.format == outspec.format
            && inspec.channelformats == outspec.channelformats;
        let (format, bytes_per_image) = if same_native {
            (DataFormat::Unknown, inspec.image_bytes(true))
        } else {
            (
                DataFormat::F32,
                inspec.image_pixels() as usize
                    * inspec.nchannels as usize
                    * DataFormat::F32.size(),
            )
        };

        let mut buf = vec![0u8; bytes_per_image];
        input.read_image(
            subimage,
            0,
            0,
            inspec.nchannels,
            format,
            &mut buf,
            None,
            None,
            None,
            None,
        )?;
        self.write_image(format, &buf, None, None, None, None)
    }
}

/// Gathers a (possibly strided) caller buffer into a contiguous
/// native-format block covering width x height x depth pixels.
#[allow(clippy::too_many_arguments)]
fn gather_to_native(
    spec: &ImageSpec,
    format: DataFormat,
    data: &[u8],
    width: usize,
    height: usize,
    depth: usize,
    xstride: Option<usize>,
    ystride: Option<usize>,
    zstride: Option<usize>,
) -> IoResult<Vec<u8>> {
    let npixels = width * height * depth;
    let dst_formats = native_formats(spec, 0, spec.nchannels);
    let dst_pixel: usize = dst_formats.iter().map(|f| f.size()).sum();
    let src_formats: Vec<DataFormat> = if format.is_unknown() {
        dst_formats.clone()
    } else {
        vec![format; spec.nchannels as usize]
    };
    let src_pixel: usize = src_formats.iter().map(|f| f.size()).sum();

    let mut gathered = vec![0u8; npixels * src_pixel];
    gather_strided(
        data,
        &mut gathered,
        src_pixel,
        width,
        height,
        depth,
        xstride,
        ystride,
        zstride,
    )?;

    if src_formats == dst_formats {
        return Ok(gathered);
    }
    let mut native = vec![0u8; npixels * dst_pixel];
    convert_pixels(&gathered, &src_formats, &mut native, &dst_formats, npixels)?;
    Ok(native)
}

/// Validates an output spec and open mode against a format's
/// capabilities before any file is touched.
///
/// Concrete `open` implementations call this first: it applies the same
/// header/limit hardening as the read side plus the mode/capability
/// cross-checks.
pub fn check_open(mode: OpenMode, spec: &ImageSpec, caps: &[Capability]) -> IoResult<()> {
    crate::input::check_open(spec)?;
    match mode {
        OpenMode::Create => {}
        OpenMode::AppendSubimage => {
            if !caps.contains(&Capability::AppendSubimage) {
                return Err(IoError::UnsupportedFeature(
                    "format cannot append subimages".to_string(),
                ));
            }
        }
        OpenMode::AppendMipLevel => {
            if !caps.contains(&Capability::MipMap) {
                return Err(IoError::UnsupportedFeature(
                    "format cannot append MIP levels".to_string(),
                ));
            }
        }
    }
    if spec.tile_width > 0 && !caps.contains(&Capability::Tiles) {
        return Err(IoError::UnsupportedFeature(
            "format cannot write tiled images".to_string(),
        ));
    }
    if spec.deep && !caps.contains(&Capability::DeepData) {
        return Err(IoError::UnsupportedFeature(
            "format cannot write deep data".to_string(),
        ));
    }
    if !spec.channelformats.is_empty() && !caps.contains(&Capability::PerChannelFormats) {
        warn!(
            format = ?spec.format,
            "format ignores per-channel formats; all channels will use the base format"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_open_mode_capabilities() {
        let spec = ImageSpec::from_dimensions(8, 8, 3, DataFormat::U8);
        assert!(check_open(OpenMode::Create, &spec, &[]).is_ok());
        assert!(matches!(
            check_open(OpenMode::AppendSubimage, &spec, &[]),
            Err(IoError::UnsupportedFeature(_))
        ));
        assert!(
            check_open(
                OpenMode::AppendSubimage,
                &spec,
                &[Capability::AppendSubimage]
            )
            .is_ok()
        );
        assert!(matches!(
            check_open(OpenMode::AppendMipLevel, &spec, &[]),
            Err(IoError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_check_open_tiled_and_deep() {
        let mut spec = ImageSpec::from_dimensions(8, 8, 3, DataFormat::U8);
        spec.tile_width = 4;
        spec.tile_height = 4;
        spec.tile_depth = 1;
        assert!(matches!(
            check_open(OpenMode::Create, &spec, &[]),
            Err(IoError::UnsupportedFeature(_))
        ));
        assert!(check_open(OpenMode::Create, &spec, &[Capability::Tiles]).is_ok());

        let mut deep = ImageSpec::from_dimensions(8, 8, 2, DataFormat::F32);
        deep.deep = true;
        assert!(matches!(
            check_open(OpenMode::Create, &deep, &[]),
            Err(IoError::UnsupportedFeature(_))
        ));
    }
}
