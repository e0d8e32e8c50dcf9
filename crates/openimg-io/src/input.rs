//! The image reading contract.
//!
//! [`ImageInput`] is what a format handler implements to expose decoded
//! pixels. Implementors supply the native-layout primitives
//! (`read_native_scanlines`, optionally `read_native_tile`); the trait's
//! provided methods layer format conversion, channel subsetting, strided
//! placement, and whole-image assembly on top, so every format gets the
//! full read API from a handful of required methods.
//!
//! # Addressing
//!
//! Every read names its subimage and MIP level explicitly. Reads take
//! `&self`: two threads may read different regions (or different
//! subimages) of one shared input concurrently, with any interior
//! mutability hidden inside the implementation.
//!
//! # Native vs. requested format
//!
//! `read_native_*` always yields the file's own layout. The conversion
//! wrappers take a requested [`DataFormat`]; passing `Unknown` means "no
//! conversion, give me native bytes".
//!
//! # Example
//!
//! ```no_run
//! use openimg_core::DataFormat;
//!
//! let input = openimg_io::open("render.ppm".as_ref())?;
//! let spec = input.spec(0, 0)?;
//! let mut pixels = vec![0u8; spec.image_bytes(false)];
//! input.read_image(
//!     0, 0, 0, spec.nchannels,
//!     spec.format,
//!     &mut pixels,
//!     None, None, None,
//!     None,
//! )?;
//! # Ok::<(), openimg_io::IoError>(())
//! ```

use openimg_core::{DataFormat, ImageSpec};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::warn;

use crate::capability::Capability;
use crate::convert::{self, convert_pixels, copy_strided, native_formats};
use crate::deepdata::DeepData;
use crate::error::{IoError, IoResult};
use crate::global;

/// Periodic completion callback for long reads/writes.
///
/// Receives the fraction done in [0, 1]; returning `true` requests
/// cancellation, which surfaces as [`IoError::Aborted`].
pub type ProgressCallback<'a> = &'a (dyn Fn(f32) -> bool + Send + Sync);

/// A reader for one opened image file (or synthetic source).
///
/// Obtained from [`open`](crate::open) /
/// [`open_with_config`](crate::open_with_config). See the module docs for
/// the contract.
pub trait ImageInput: Send + Sync {
    /// Short lowercase format name ("pnm", "null").
    fn format_name(&self) -> &'static str;

    /// Whether this handler supports an optional capability.
    fn supports(&self, _capability: Capability) -> bool {
        false
    }

    /// Number of subimages in the open file.
    fn num_subimages(&self) -> i32 {
        1
    }

    /// Number of MIP levels of the given subimage (0 if the subimage
    /// does not exist).
    fn num_miplevels(&self, subimage: i32) -> i32 {
        if subimage == 0 { 1 } else { 0 }
    }

    /// The spec of one subimage/miplevel, as a fresh copy the caller owns.
    fn spec(&self, subimage: i32, miplevel: i32) -> IoResult<ImageSpec>;

    /// Like [`spec`](Self::spec) but without the metadata: geometry and
    /// formats only, skipping channel names and `extra_attribs`. The cheap
    /// variant for dimension-only queries on metadata-heavy files.
    fn spec_dimensions(&self, subimage: i32, miplevel: i32) -> IoResult<ImageSpec> {
        let full = self.spec(subimage, miplevel)?;
        let mut dims = ImageSpec::new(full.format);
        dims.copy_dimensions(&full);
        Ok(dims)
    }

    /// Reads scanlines [ybegin, yend) at depth plane `z`, channels
    /// [chbegin, chend), into `data` in the file's native format,
    /// contiguously.
    #[allow(clippy::too_many_arguments)]
    fn read_native_scanlines(
        &self,
        subimage: i32,
        miplevel: i32,
        ybegin: i32,
        yend: i32,
        z: i32,
        chbegin: i32,
        chend: i32,
        data: &mut [u8],
    ) -> IoResult<()>;

    /// Reads the tile whose upper-left corner is (x, y, z) into `data` in
    /// native format, all channels, full tile extent (edge tiles included).
    ///
    /// Only for formats with [`Capability::Tiles`].
    fn read_native_tile(
        &self,
        _subimage: i32,
        _miplevel: i32,
        _x: i32,
        _y: i32,
        _z: i32,
        _data: &mut [u8],
    ) -> IoResult<()> {
        Err(IoError::UnsupportedFeature(format!(
            "{} does not support tiles",
            self.format_name()
        )))
    }

    /// Reads deep scanlines [ybegin, yend) for channels [chbegin, chend)
    /// into `deepdata`.
    ///
    /// Only for formats with [`Capability::DeepData`].
    #[allow(clippy::too_many_arguments)]
    fn read_native_deep_scanlines(
        &self,
        _subimage: i32,
        _miplevel: i32,
        _ybegin: i32,
        _yend: i32,
        _z: i32,
        _chbegin: i32,
        _chend: i32,
        _deepdata: &mut DeepData,
    ) -> IoResult<()> {
        Err(IoError::UnsupportedFeature(format!(
            "{} does not support deep data",
            self.format_name()
        )))
    }

    /// Closes the file. Idempotent: closing a closed input is a no-op.
    fn close(&mut self) -> IoResult<()> {
        Ok(())
    }

    /// Per-instance thread override for large reads. 0 defers to the
    /// global "threads" attribute, 1 forces serial. Any other value
    /// enables the shared rayon pool; it is not a hard cap on fan-out.
    fn set_threads(&mut self, _n: i32) {}

    /// Current per-instance thread override.
    fn threads(&self) -> i32 {
        0
    }

    /// Reads scanlines with format conversion and strided placement.
    ///
    /// `format == Unknown` skips conversion. Strides are byte counts;
    /// `None` means contiguous.
    #[allow(clippy::too_many_arguments)]
    fn read_scanlines(
        &self,
        subimage: i32,
        miplevel: i32,
        ybegin: i32,
        yend: i32,
        z: i32,
        chbegin: i32,
        chend: i32,
        format: DataFormat,
        data: &mut [u8],
        xstride: Option<usize>,
        ystride: Option<usize>,
    ) -> IoResult<()> {
        let spec = self.spec(subimage, miplevel)?;
        check_channel_range(&spec, chbegin, chend)?;
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
        let npixels = width * nscan;
        let src_formats = native_formats(&spec, chbegin, chend);
        let native_pixel: usize = src_formats.iter().map(|f| f.size()).sum();

        let mut nbuf = vec![0u8; npixels * native_pixel];
        self.read_native_scanlines(
            subimage, miplevel, ybegin, yend, z, chbegin, chend, &mut nbuf,
        )?;

        place_converted(
            &nbuf,
            &src_formats,
            format,
            data,
            width,
            nscan,
            1,
            xstride,
            ystride,
            None,
        )
    }

    /// Reads one full tile (all channels) with format conversion.
    ///
    /// (x, y, z) must be a tile corner; untiled files and misaligned
    /// corners are errors.
    #[allow(clippy::too_many_arguments)]
    fn read_tile(
        &self,
        subimage: i32,
        miplevel: i32,
        x: i32,
        y: i32,
        z: i32,
        format: DataFormat,
        data: &mut [u8],
    ) -> IoResult<()> {
        let spec = self.spec(subimage, miplevel)?;
        if spec.tile_width <= 0 {
            return Err(IoError::UnsupportedFeature(format!(
                "read_tile on untiled {} image",
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
        if !spec.roi().contains(x, y, z, 0) {
            return Err(IoError::InvalidArgument(format!(
                "tile corner ({x}, {y}, {z}) outside image"
            )));
        }

        let src_formats = native_formats(&spec, 0, spec.nchannels);
        let mut nbuf = vec![0u8; spec.tile_bytes(true)];
        self.read_native_tile(subimage, miplevel, x, y, z, &mut nbuf)?;

        place_converted(
            &nbuf,
            &src_formats,
            format,
            data,
            spec.tile_width as usize,
            spec.tile_height as usize,
            spec.tile_depth as usize,
            None,
            None,
            None,
        )
    }

    /// Reads the block of tiles covering pixel range [xbegin,xend) x
    /// [ybegin,yend) x [zbegin,zend), channels [chbegin, chend), with
    /// conversion and strided placement.
    ///
    /// The range must satisfy
    /// [`valid_tile_range`](openimg_core::ImageSpec::valid_tile_range).
    #[allow(clippy::too_many_arguments)]
    fn read_tiles(
        &self,
        subimage: i32,
        miplevel: i32,
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
        chbegin: i32,
        chend: i32,
        format: DataFormat,
        data: &mut [u8],
        xstride: Option<usize>,
        ystride: Option<usize>,
        zstride: Option<usize>,
    ) -> IoResult<()> {
        let spec = self.spec(subimage, miplevel)?;
        if spec.tile_width <= 0 {
            return Err(IoError::UnsupportedFeature(format!(
                "read_tiles on untiled {} image",
                self.format_name()
            )));
        }
        check_channel_range(&spec, chbegin, chend)?;
        if !spec.valid_tile_range(xbegin, xend, ybegin, yend, zbegin, zend) {
            return Err(IoError::InvalidArgument(format!(
                "[{xbegin},{xend}) x [{ybegin},{yend}) x [{zbegin},{zend}) is not a valid tile range"
            )));
        }

        let all_formats = native_formats(&spec, 0, spec.nchannels);
        let native_tile_bytes = spec.tile_bytes(true);
        // Channels are interleaved contiguously, so a channel subset is a
        // fixed byte range within each native pixel.
        let sub_off: usize = all_formats[..chbegin as usize].iter().map(|f| f.size()).sum();
        let sub_formats = &all_formats[chbegin as usize..chend as usize];
        let sub_pixel: usize = sub_formats.iter().map(|f| f.size()).sum();
        let full_pixel: usize = all_formats.iter().map(|f| f.size()).sum();

        let nch = (chend - chbegin) as usize;
        let out_formats: Vec<DataFormat> = if format.is_unknown() {
            sub_formats.to_vec()
        } else {
            vec![format; nch]
        };
        let out_pixel: usize = out_formats.iter().map(|f| f.size()).sum();

        let region_w = (xend - xbegin) as usize;
        let region_h = (yend - ybegin) as usize;
        let (xs, ys, zs) =
            convert::resolve_strides(out_pixel, region_w, region_h, xstride, ystride, zstride);

        let tw = spec.tile_width;
        let th = spec.tile_height;
        let td = spec.tile_depth;
        let mut ntile = vec![0u8; native_tile_bytes];

        let mut tz = zbegin;
        while tz < zend {
            let mut ty = ybegin;
            while ty < yend {
                let mut tx = xbegin;
                while tx < xend {
                    self.read_native_tile(subimage, miplevel, tx, ty, tz, &mut ntile)?;

                    // Clip the tile to the requested region (edge tiles).
                    let cw = tw.min(xend - tx) as usize;
                    let ch = th.min(yend - ty) as usize;
                    let cd = td.min(zend - tz) as usize;

                    // Gather the clipped channel subset out of the native
                    // tile, convert, and scatter into the caller's buffer.
                    let mut sub = vec![0u8; cw * ch * cd * sub_pixel];
                    convert::gather_strided(
                        &ntile[sub_off..],
                        &mut sub,
                        sub_pixel,
                        cw,
                        ch,
                        cd,
                        Some(full_pixel),
                        Some(full_pixel * tw as usize),
                        Some(full_pixel * (tw * th) as usize),
                    )?;
                    let mut conv = vec![0u8; cw * ch * cd * out_pixel];
                    convert_pixels(&sub, sub_formats, &mut conv, &out_formats, cw * ch * cd)?;

                    let dst_off = (tz - zbegin) as usize * zs
                        + (ty - ybegin) as usize * ys
                        + (tx - xbegin) as usize * xs;
                    copy_strided(
                        &conv,
                        &mut data[dst_off..],
                        out_pixel,
                        cw,
                        ch,
                        cd,
                        Some(xs),
                        Some(ys),
                        Some(zs),
                    )?;
                    tx += tw;
                }
                ty += th;
            }
            tz += td;
        }
        Ok(())
    }

    /// Reads the entire data window of one subimage/miplevel, channels
    /// [chbegin, chend), with conversion, strided placement, optional
    /// progress reporting, and internal parallelism for large images.
    #[allow(clippy::too_many_arguments)]
    fn read_image(
        &self,
        subimage: i32,
        miplevel: i32,
        chbegin: i32,
        chend: i32,
        format: DataFormat,
        data: &mut [u8],
        xstride: Option<usize>,
        ystride: Option<usize>,
        zstride: Option<usize>,
        progress: Option<ProgressCallback<'_>>,
    ) -> IoResult<()> {
        let spec = self.spec(subimage, miplevel)?;
        check_channel_range(&spec, chbegin, chend)?;

        let width = spec.width as usize;
        let height = spec.height as usize;
        let depth = spec.depth as usize;
        let nch = (chend - chbegin) as usize;

        let src_formats = native_formats(&spec, chbegin, chend);
        let out_pixel: usize = if format.is_unknown() {
            src_formats.iter().map(|f| f.size()).sum()
        } else {
            nch * format.size()
        };
        let (xs, ys, zs) =
            convert::resolve_strides(out_pixel, width, height, xstride, ystride, zstride);
        let needed = convert::strided_extent(out_pixel, width, height, depth, xs, ys, zs);
        if data.len() < needed {
            return Err(IoError::InvalidArgument(format!(
                "image buffer too small: {} < {}",
                data.len(),
                needed
            )));
        }

        // Band height: one tile row for tiled files, a fixed chunk of
        // scanlines otherwise.
        let band = if spec.tile_height > 0 {
            spec.tile_height as usize
        } else {
            64
        };
        let nbands_per_plane = height.div_ceil(band);
        let nbands = nbands_per_plane * depth;

        let contiguous = xs == out_pixel && ys == xs * width && zs == ys * height;
        let nthreads = effective_threads(self.threads());
        let parallel = nthreads != 1 && contiguous && depth == 1 && nbands > 1;

        if parallel {
            let done = AtomicUsize::new(0);
            let aborted = AtomicBool::new(false);
            let band_bytes = band * ys;
            data[..needed]
                .par_chunks_mut(band_bytes)
                .enumerate()
                .try_for_each(|(bi, chunk)| {
                    if aborted.load(Ordering::Relaxed) {
                        return Err(IoError::Aborted);
                    }
                    let ybegin = spec.y + (bi * band) as i32;
                    let yend = (ybegin + band as i32).min(spec.y + spec.height);
                    self.read_scanlines(
                        subimage,
                        miplevel,
                        ybegin,
                        yend,
                        spec.z,
                        chbegin,
                        chend,
                        format,
                        chunk,
                        Some(xs),
                        Some(ys),
                    )?;
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(cb) = progress {
                        if cb(finished as f32 / nbands as f32) {
                            aborted.store(true, Ordering::Relaxed);
                            return Err(IoError::Aborted);
                        }
                    }
                    Ok(())
                })?;
            return Ok(());
        }

        let mut done = 0usize;
        for zi in 0..depth {
            let z = spec.z + zi as i32;
            let mut ybegin = spec.y;
            while ybegin < spec.y + spec.height {
                let yend = (ybegin + band as i32).min(spec.y + spec.height);
                let off = zi * zs + ((ybegin - spec.y) as usize) * ys;
                self.read_scanlines(
                    subimage,
                    miplevel,
                    ybegin,
                    yend,
                    z,
                    chbegin,
                    chend,
                    format,
                    &mut data[off..],
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
}

/// Resolves the effective worker count: per-instance override first, then
/// the global "threads" attribute. 0 still means "rayon's default".
fn effective_threads(instance: i32) -> i32 {
    if instance != 0 {
        instance
    } else {
        global::get_int_attribute("threads", 0)
    }
}

fn check_channel_range(spec: &ImageSpec, chbegin: i32, chend: i32) -> IoResult<()> {
    if chbegin < 0 || chend <= chbegin || chend > spec.nchannels {
        return Err(IoError::InvalidArgument(format!(
            "channel range [{chbegin},{chend}) invalid for {} channels",
            spec.nchannels
        )));
    }
    Ok(())
}

/// Converts a contiguous native buffer to the requested format and places
/// it into a (possibly strided) destination. `Unknown` means no
/// conversion.
#[allow(clippy::too_many_arguments)]
fn place_converted(
    native: &[u8],
    src_formats: &[DataFormat],
    format: DataFormat,
    data: &mut [u8],
    width: usize,
    height: usize,
    depth: usize,
    xstride: Option<usize>,
    ystride: Option<usize>,
    zstride: Option<usize>,
) -> IoResult<()> {
    let npixels = width * height * depth;
    let out_formats: Vec<DataFormat> = if format.is_unknown() {
        src_formats.to_vec()
    } else {
        vec![format; src_formats.len()]
    };
    let out_pixel: usize = out_formats.iter().map(|f| f.size()).sum();

    if out_formats == src_formats {
        return copy_strided(
            native, data, out_pixel, width, height, depth, xstride, ystride, zstride,
        );
    }
    let mut conv = vec![0u8; npixels * out_pixel];
    convert_pixels(native, src_formats, &mut conv, &out_formats, npixels)?;
    copy_strided(
        &conv, data, out_pixel, width, height, depth, xstride, ystride, zstride,
    )
}

/// Validates an [`ImageSpec`] decoded from untrusted header fields before
/// any allocation is sized from it.
///
/// Every concrete `open` calls this: nonpositive dimensions, inconsistent
/// tile fields, channel counts over `limit:channels`, and total pixel
/// data over `limit:imagesize_MB` are all rejected up front.
pub fn check_open(spec: &ImageSpec) -> IoResult<()> {
    if spec.width <= 0 || spec.height <= 0 || spec.depth <= 0 {
        return Err(IoError::InvalidFile(format!(
            "invalid resolution {}x{}x{}",
            spec.width, spec.height, spec.depth
        )));
    }
    if spec.nchannels <= 0 {
        return Err(IoError::InvalidFile(format!(
            "invalid channel count {}",
            spec.nchannels
        )));
    }
    if spec.tile_width < 0 || spec.tile_height < 0 || spec.tile_depth < 0 {
        return Err(IoError::InvalidFile("negative tile size".to_string()));
    }
    if (spec.tile_width > 0) != (spec.tile_height > 0) {
        return Err(IoError::InvalidFile(
            "inconsistent tile dimensions".to_string(),
        ));
    }
    if !spec.channelformats.is_empty() && spec.channelformats.len() != spec.nchannels as usize {
        return Err(IoError::InvalidFile(format!(
            "channelformats has {} entries for {} channels",
            spec.channelformats.len(),
            spec.nchannels
        )));
    }

    let chan_limit = global::get_int_attribute("limit:channels", 1024);
    if chan_limit > 0 && spec.nchannels > chan_limit {
        warn!(
            nchannels = spec.nchannels,
            limit = chan_limit,
            "rejecting file over channel limit"
        );
        return Err(IoError::LimitExceeded(format!(
            "{} channels exceeds limit:channels ({chan_limit})",
            spec.nchannels
        )));
    }

    let mb_limit = global::get_int_attribute("limit:imagesize_MB", 32768) as u64;
    let bytes = spec.image_bytes(true) as u64;
    if !spec.size_t_safe() || (mb_limit > 0 && bytes > mb_limit.saturating_mul(1024 * 1024)) {
        warn!(bytes, limit_mb = mb_limit, "rejecting file over size limit");
        return Err(IoError::LimitExceeded(format!(
            "image size {} MB exceeds limit:imagesize_MB ({mb_limit})",
            bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_open_rejects_bad_headers() {
        let good = ImageSpec::from_dimensions(64, 64, 3, DataFormat::U8);
        assert!(check_open(&good).is_ok());

        let mut bad = good.clone();
        bad.width = 0;
        assert!(matches!(check_open(&bad), Err(IoError::InvalidFile(_))));

        let mut bad = good.clone();
        bad.nchannels = -2;
        assert!(matches!(check_open(&bad), Err(IoError::InvalidFile(_))));

        let mut bad = good.clone();
        bad.tile_width = 16; // height left at 0
        assert!(matches!(check_open(&bad), Err(IoError::InvalidFile(_))));

        let mut bad = good;
        bad.channelformats = vec![DataFormat::U8];
        assert!(matches!(check_open(&bad), Err(IoError::InvalidFile(_))));
    }

    #[test]
    fn test_check_open_limits() {
        let huge = ImageSpec::from_dimensions(5000, 5000, 2000, DataFormat::F32);
        assert!(matches!(check_open(&huge), Err(IoError::LimitExceeded(_))));

        let wide = ImageSpec::from_dimensions(4, 4, 100_000, DataFormat::U8);
        assert!(matches!(check_open(&wide), Err(IoError::LimitExceeded(_))));
    }
}
