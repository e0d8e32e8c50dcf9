//! The "null" format: a synthetic image source and a discarding sink.
//!
//! Reads succeed without touching the filesystem; the content is a solid
//! fill color. Writes validate everything and throw the pixels away.
//! Because it can claim any geometry (tiles, subimages, MIP levels) it is
//! the test double for the generic read/write paths and a handy
//! throughput baseline.
//!
//! The geometry comes from configuration hints passed to
//! [`open_with_config`](crate::open_with_config):
//!
//! | hint                | type      | default |
//! |---------------------|-----------|---------|
//! | `null:width`        | int       | 640     |
//! | `null:height`       | int       | 480     |
//! | `null:channels`     | int       | 4       |
//! | `null:format`       | string    | "u8"    |
//! | `null:tile_width`   | int       | 0       |
//! | `null:tile_height`  | int       | 0       |
//! | `null:subimages`    | int       | 1       |
//! | `null:miplevels`    | int       | 1       |
//! | `null:pixel`        | float[]   | zeros   |
//!
//! `null:pixel` is the per-channel fill. Each subimage `s` reads as
//! `fill[c] + s`, so multi-subimage tests can tell their data apart.
//! MIP level `m` halves each dimension `m` times (floor at 1).

use std::path::Path;

use openimg_core::{AttrValue, DataFormat, ImageSpec};
use tracing::{debug, warn};

use crate::capability::Capability;
use crate::convert::write_sample;
use crate::error::{IoError, IoResult};
use crate::input::{self, ImageInput};
use crate::output::{self, ImageOutput, OpenMode};

const NULL_INPUT_CAPS: &[Capability] = &[
    Capability::Tiles,
    Capability::MultiImage,
    Capability::MipMap,
    Capability::RandomAccess,
];

const NULL_OUTPUT_CAPS: &[Capability] = &[
    Capability::Tiles,
    Capability::MultiImage,
    Capability::MipMap,
    Capability::AppendSubimage,
    Capability::RandomAccess,
    Capability::PerChannelFormats,
    Capability::ArbitraryMetadata,
];

/// Whether (x, y, z) is the upper-left corner of a tile inside the data
/// window.
fn tile_corner(spec: &ImageSpec, x: i32, y: i32, z: i32) -> bool {
    (spec.x..spec.x + spec.width).contains(&x)
        && (spec.y..spec.y + spec.height).contains(&y)
        && (spec.z..spec.z + spec.depth).contains(&z)
        && (x - spec.x) % spec.tile_width == 0
        && (y - spec.y) % spec.tile_height == 0
        && (z - spec.z) % spec.tile_depth == 0
}

/// Synthetic reader producing solid-fill pixels.
pub struct NullInput {
    base: ImageSpec,
    subimages: i32,
    miplevels: i32,
    fill: Vec<f32>,
    threads: i32,
}

impl NullInput {
    /// "Opens" a synthetic image. The path is only logged; geometry comes
    /// from the `null:*` hints in `config`.
    pub fn open(path: &Path, config: Option<&ImageSpec>) -> IoResult<Self> {
        let hints = config.cloned().unwrap_or_default();
        for p in &hints.extra_attribs {
            if let Some(hint) = p.name.strip_prefix("null:") {
                if !matches!(
                    hint,
                    "width"
                        | "height"
                        | "channels"
                        | "format"
                        | "tile_width"
                        | "tile_height"
                        | "subimages"
                        | "miplevels"
                        | "pixel"
                ) {
                    warn!(name = %p.name, "ignoring unknown null hint");
                }
            }
        }

        let width = hints.get_int_attribute("null:width", 640);
        let height = hints.get_int_attribute("null:height", 480);
        let channels = hints.get_int_attribute("null:channels", 4);
        let format_name = hints.get_string_attribute("null:format", "u8");
        let format = DataFormat::from_name(&format_name).ok_or_else(|| {
            IoError::InvalidArgument(format!("unknown null:format '{format_name}'"))
        })?;
        let subimages = hints.get_int_attribute("null:subimages", 1).max(1);
        let miplevels = hints.get_int_attribute("null:miplevels", 1).max(1);

        let mut base = ImageSpec::from_dimensions(width, height, channels, format);
        let tw = hints.get_int_attribute("null:tile_width", 0);
        let th = hints.get_int_attribute("null:tile_height", 0);
        if tw > 0 && th > 0 {
            base.tile_width = tw;
            base.tile_height = th;
            base.tile_depth = 1;
        }

        let mut fill = vec![0.0f32; channels.max(0) as usize];
        if let Some(p) = hints.find_attribute("null:pixel", openimg_core::AttrKind::Unknown, false)
        {
            if let AttrValue::FloatList(values) = &p.value {
                for (dst, src) in fill.iter_mut().zip(values) {
                    *dst = *src;
                }
            }
        }

        input::check_open(&base)?;
        debug!(path = %path.display(), width, height, channels, subimages, "opened null input");
        Ok(Self {
            base,
            subimages,
            miplevels,
            fill,
            threads: 0,
        })
    }

    fn check_index(&self, subimage: i32, miplevel: i32) -> IoResult<()> {
        if !(0..self.subimages).contains(&subimage) || !(0..self.miplevels).contains(&miplevel) {
            return Err(IoError::NoSuchSubimage { subimage, miplevel });
        }
        Ok(())
    }

    /// Fill value of one channel in one subimage.
    fn value(&self, channel: i32, subimage: i32) -> f32 {
        self.fill.get(channel as usize).copied().unwrap_or(0.0) + subimage as f32
    }

    /// Writes `npixels` repetitions of the native pixel pattern for
    /// channels [chbegin, chend) of one subimage.
    fn fill_pixels(
        &self,
        spec: &ImageSpec,
        subimage: i32,
        chbegin: i32,
        chend: i32,
        npixels: usize,
        data: &mut [u8],
    ) -> IoResult<()> {
        let pixel_bytes: usize = (chbegin..chend).map(|c| spec.channelformat(c).size()).sum();
        let need = npixels * pixel_bytes;
        if data.len() < need {
            return Err(IoError::InvalidArgument(format!(
                "buffer too small: {} < {need}",
                data.len()
            )));
        }
        let mut pattern = vec![0u8; pixel_bytes];
        let mut off = 0;
        for c in chbegin..chend {
            let fmt = spec.channelformat(c);
            write_sample(self.value(c, subimage), fmt, &mut pattern[off..]);
            off += fmt.size();
        }
        for chunk in data[..need].chunks_exact_mut(pixel_bytes) {
            chunk.copy_from_slice(&pattern);
        }
        Ok(())
    }
}

impl ImageInput for NullInput {
    fn format_name(&self) -> &'static str {
        "null"
    }

    fn supports(&self, capability: Capability) -> bool {
        NULL_INPUT_CAPS.contains(&capability)
    }

    fn num_subimages(&self) -> i32 {
        self.subimages
    }

    fn num_miplevels(&self, subimage: i32) -> i32 {
        if (0..self.subimages).contains(&subimage) {
            self.miplevels
        } else {
            0
        }
    }

    fn spec(&self, subimage: i32, miplevel: i32) -> IoResult<ImageSpec> {
        self.check_index(subimage, miplevel)?;
        let mut spec = self.base.clone();
        for _ in 0..miplevel {
            spec.width = (spec.width / 2).max(1);
            spec.height = (spec.height / 2).max(1);
        }
        spec.full_width = spec.width;
        spec.full_height = spec.height;
        Ok(spec)
    }

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
    ) -> IoResult<()> {
        let spec = self.spec(subimage, miplevel)?;
        if ybegin < spec.y || yend > spec.y + spec.height || ybegin >= yend {
            return Err(IoError::InvalidArgument(format!(
                "scanline range [{ybegin},{yend}) outside [{},{})",
                spec.y,
                spec.y + spec.height
            )));
        }
        if z != spec.z {
            return Err(IoError::InvalidArgument(format!("no depth plane z={z}")));
        }
        if chbegin < 0 || chend <= chbegin || chend > spec.nchannels {
            return Err(IoError::InvalidArgument(format!(
                "channel range [{chbegin},{chend}) invalid"
            )));
        }
        let npixels = spec.width as usize * (yend - ybegin) as usize;
        self.fill_pixels(&spec, subimage, chbegin, chend, npixels, data)
    }

    fn read_native_tile(
        &self,
        subimage: i32,
        miplevel: i32,
        x: i32,
        y: i32,
        z: i32,
        data: &mut [u8],
    ) -> IoResult<()> {
        let spec = self.spec(subimage, miplevel)?;
        if spec.tile_width == 0 {
            return Err(IoError::UnsupportedFeature(
                "image is not tiled".to_string(),
            ));
        }
        if !tile_corner(&spec, x, y, z) {
            return Err(IoError::InvalidArgument(format!(
                "({x}, {y}, {z}) is not a tile corner"
            )));
        }
        self.fill_pixels(
            &spec,
            subimage,
            0,
            spec.nchannels,
            spec.tile_pixels() as usize,
            data,
        )
    }

    fn set_threads(&mut self, n: i32) {
        self.threads = n;
    }

    fn threads(&self) -> i32 {
        self.threads
    }
}

/// Writer that validates everything and discards the pixels.
#[derive(Default)]
pub struct NullOutput {
    spec: ImageSpec,
    open: bool,
}

impl NullOutput {
    /// Creates an unopened writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn require_open(&self) -> IoResult<()> {
        if self.open { Ok(()) } else { Err(IoError::NotOpen) }
    }
}

impl ImageOutput for NullOutput {
    fn format_name(&self) -> &'static str {
        "null"
    }

    fn supports(&self, capability: Capability) -> bool {
        NULL_OUTPUT_CAPS.contains(&capability)
    }

    fn open(&mut self, path: &Path, spec: &ImageSpec, mode: OpenMode) -> IoResult<()> {
        output::check_open(mode, spec, NULL_OUTPUT_CAPS)?;
        debug!(path = %path.display(), ?mode, "opened null output");
        self.spec = spec.clone();
        self.open = true;
        Ok(())
    }

    fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    fn write_native_scanlines(
        &mut self,
        ybegin: i32,
        yend: i32,
        _z: i32,
        data: &[u8],
    ) -> IoResult<()> {
        self.require_open()?;
        let need = self.spec.scanline_bytes(true) * (yend - ybegin).max(0) as usize;
        if data.len() < need {
            return Err(IoError::InvalidArgument(format!(
                "scanline buffer too small: {} < {need}",
                data.len()
            )));
        }
        Ok(())
    }

    fn write_native_tile(&mut self, x: i32, y: i32, z: i32, data: &[u8]) -> IoResult<()> {
        self.require_open()?;
        if self.spec.tile_width == 0 || !tile_corner(&self.spec, x, y, z) {
            return Err(IoError::InvalidArgument(format!(
                "({x}, {y}, {z}) is not a tile corner"
            )));
        }
        let need = self.spec.tile_bytes(true);
        if data.len() < need {
            return Err(IoError::InvalidArgument(format!(
                "tile buffer too small: {} < {need}",
                data.len()
            )));
        }
        Ok(())
    }

    fn write_rectangle(
        &mut self,
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
        _format: DataFormat,
        _data: &[u8],
    ) -> IoResult<()> {
        self.require_open()?;
        if xbegin >= xend || ybegin >= yend || zbegin >= zend {
            return Err(IoError::InvalidArgument(format!(
                "empty rectangle [{xbegin},{xend}) x [{ybegin},{yend}) x [{zbegin},{zend})"
            )));
        }
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        if self.open {
            debug!("closed null output");
            self.spec = ImageSpec::default();
            self.open = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hints(width: i32, height: i32, channels: i32, format: &str) -> ImageSpec {
        let mut config = ImageSpec::default();
        config.attribute("null:width", width);
        config.attribute("null:height", height);
        config.attribute("null:channels", channels);
        config.attribute("null:format", format);
        config
    }

    #[test]
    fn test_defaults_without_config() {
        let input = NullInput::open(Path::new("x.null"), None).unwrap();
        let spec = input.spec(0, 0).unwrap();
        assert_eq!((spec.width, spec.height, spec.nchannels), (640, 480, 4));
        assert_eq!(spec.format, DataFormat::U8);
        assert_eq!(input.num_subimages(), 1);
        assert!(input.spec(1, 0).is_err());
    }

    #[test]
    fn test_fill_and_subimage_offset() {
        let mut config = hints(4, 2, 3, "f32");
        config.attribute("null:subimages", 2);
        config.attribute("null:pixel", vec![0.25f32, 0.5, 0.75]);
        let input = NullInput::open(Path::new("x.null"), Some(&config)).unwrap();

        let spec = input.spec(1, 0).unwrap();
        let mut row = vec![0u8; spec.scanline_bytes(true)];
        input
            .read_native_scanlines(1, 0, 0, 1, 0, 0, 3, &mut row)
            .unwrap();
        let g = f32::from_ne_bytes([row[4], row[5], row[6], row[7]]);
        assert_eq!(g, 1.5); // fill 0.5 + subimage 1
    }

    #[test]
    fn test_miplevel_halving() {
        let mut config = hints(64, 48, 1, "u8");
        config.attribute("null:miplevels", 8);
        let input = NullInput::open(Path::new("x.null"), Some(&config)).unwrap();
        assert_eq!(input.spec(0, 1).unwrap().width, 32);
        assert_eq!(input.spec(0, 3).unwrap().height, 6);
        // floors at 1x1
        let top = input.spec(0, 7).unwrap();
        assert_eq!((top.width, top.height), (1, 1));
        assert!(input.spec(0, 8).is_err());
    }

    #[test]
    fn test_tiled_geometry() {
        let mut config = hints(100, 80, 1, "u8");
        config.attribute("null:tile_width", 32);
        config.attribute("null:tile_height", 32);
        let input = NullInput::open(Path::new("x.null"), Some(&config)).unwrap();
        let spec = input.spec(0, 0).unwrap();
        assert_eq!(spec.tile_depth, 1);

        let mut tile = vec![0u8; spec.tile_bytes(true)];
        input.read_native_tile(0, 0, 96, 64, 0, &mut tile).unwrap();
        assert!(input.read_native_tile(0, 0, 10, 0, 0, &mut tile).is_err());
    }

    #[test]
    fn test_output_discards_and_closes() {
        let spec = ImageSpec::from_dimensions(8, 4, 3, DataFormat::U8);
        let mut out = NullOutput::new();

        let row = vec![0u8; spec.scanline_bytes(true)];
        assert!(matches!(
            out.write_native_scanlines(0, 1, 0, &row),
            Err(IoError::NotOpen)
        ));

        out.open(Path::new("x.null"), &spec, OpenMode::Create).unwrap();
        out.write_native_scanlines(0, 4, 0, &vec![0u8; spec.scanline_bytes(true) * 4])
            .unwrap();
        out.write_rectangle(2, 4, 1, 3, 0, 1, DataFormat::U8, &[0u8; 12])
            .unwrap();

        out.close().unwrap();
        assert!(out.spec().undefined());
        out.close().unwrap();
    }

    #[test]
    fn test_output_rejects_z_outside_image() {
        let spec = ImageSpec::from_dimensions(4, 2, 1, DataFormat::U8);
        let mut out = NullOutput::new();
        out.open(Path::new("x.null"), &spec, OpenMode::Create).unwrap();
        let err = out.write_scanlines(0, 1, 1, DataFormat::U8, &[0u8; 4], None, None);
        assert!(matches!(err, Err(IoError::InvalidArgument(_))));
    }

    #[test]
    fn test_append_subimage_allowed() {
        let spec = ImageSpec::from_dimensions(8, 4, 3, DataFormat::U8);
        let mut out = NullOutput::new();
        out.open(Path::new("x.null"), &spec, OpenMode::Create).unwrap();
        out.open(Path::new("x.null"), &spec, OpenMode::AppendSubimage)
            .unwrap();
    }
}
