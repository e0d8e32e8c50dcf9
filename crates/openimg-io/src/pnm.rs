//! Binary PNM (PGM/PPM) reader and writer.
//!
//! Covers the binary variants only: P5 (grayscale) and P6 (RGB), 8- or
//! 16-bit, big-endian sample order as the format dictates. PNM is the
//! simplest real on-disk format and serves as the end-to-end exercise of
//! the scanline contract; it supports neither tiles, subimages, nor MIP
//! levels.
//!
//! Header oddities handled: `#` comments anywhere in the header
//! whitespace, arbitrary maxval (samples are rescaled to the full range
//! of the storage type), and the single whitespace byte separating the
//! header from raster data.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use openimg_core::{DataFormat, ImageSpec};
use tracing::debug;

use crate::capability::Capability;
use crate::error::{IoError, IoResult};
use crate::input::{self, ImageInput};
use crate::ioproxy::{FileProxy, FileSink, IoProxy, IoSink};
use crate::output::{self, ImageOutput, OpenMode};

const PNM_CAPS: &[Capability] = &[Capability::IoProxy];

/// Reader for binary PGM/PPM files.
pub struct PnmInput {
    proxy: Mutex<Option<Box<dyn IoProxy>>>,
    spec: ImageSpec,
    data_start: u64,
    maxval: u32,
    threads: i32,
}

/// Reads one header token, skipping whitespace and `#` comments, and
/// consuming the single delimiter byte that follows it.
fn read_token(r: &mut dyn IoProxy) -> IoResult<String> {
    let mut byte = [0u8; 1];
    // skip whitespace and comments
    loop {
        r.read_exact(&mut byte)
            .map_err(|_| IoError::InvalidFile("truncated pnm header".to_string()))?;
        match byte[0] {
            b' ' | b'\t' | b'\r' | b'\n' => continue,
            b'#' => {
                while byte[0] != b'\n' {
                    r.read_exact(&mut byte)
                        .map_err(|_| IoError::InvalidFile("truncated pnm comment".to_string()))?;
                }
            }
            _ => break,
        }
    }
    let mut token = String::new();
    loop {
        token.push(byte[0] as char);
        r.read_exact(&mut byte)
            .map_err(|_| IoError::InvalidFile("truncated pnm header".to_string()))?;
        if byte[0].is_ascii_whitespace() {
            break;
        }
    }
    Ok(token)
}

fn parse_dim(token: &str) -> IoResult<i32> {
    token
        .parse::<i32>()
        .map_err(|_| IoError::InvalidFile(format!("bad pnm header field '{token}'")))
}

impl PnmInput {
    /// Opens a PNM file on disk.
    pub fn open(path: &Path, config: Option<&ImageSpec>) -> IoResult<Self> {
        Self::open_proxy(Box::new(FileProxy::open(path)?), config)
    }

    /// Opens a PNM stream from a caller-supplied proxy.
    pub fn open_proxy(
        mut proxy: Box<dyn IoProxy>,
        _config: Option<&ImageSpec>,
    ) -> IoResult<Self> {
        let mut magic = [0u8; 2];
        proxy
            .read_exact(&mut magic)
            .map_err(|_| IoError::InvalidFile("truncated pnm magic".to_string()))?;
        let nchannels = match &magic {
            b"P5" => 1,
            b"P6" => 3,
            _ => {
                return Err(IoError::InvalidFile(
                    "not a binary pnm file (want P5/P6)".to_string(),
                ));
            }
        };

        let width = parse_dim(&read_token(proxy.as_mut())?)?;
        let height = parse_dim(&read_token(proxy.as_mut())?)?;
        let maxval = parse_dim(&read_token(proxy.as_mut())?)?;
        if !(1..=65535).contains(&maxval) {
            return Err(IoError::InvalidFile(format!("bad pnm maxval {maxval}")));
        }
        let data_start = proxy.stream_position()?;

        let format = if maxval < 256 {
            DataFormat::U8
        } else {
            DataFormat::U16
        };
        let mut spec = ImageSpec::from_dimensions(width, height, nchannels, format);
        spec.attribute("pnm:maxval", maxval);
        input::check_open(&spec)?;
        debug!(width, height, nchannels, maxval, "opened pnm input");

        Ok(Self {
            proxy: Mutex::new(Some(proxy)),
            spec,
            data_start,
            maxval: maxval as u32,
            threads: 0,
        })
    }

    fn check_index(&self, subimage: i32, miplevel: i32) -> IoResult<()> {
        if subimage != 0 || miplevel != 0 {
            return Err(IoError::NoSuchSubimage { subimage, miplevel });
        }
        Ok(())
    }
}

impl ImageInput for PnmInput {
    fn format_name(&self) -> &'static str {
        "pnm"
    }

    fn supports(&self, capability: Capability) -> bool {
        PNM_CAPS.contains(&capability)
    }

    fn spec(&self, subimage: i32, miplevel: i32) -> IoResult<ImageSpec> {
        self.check_index(subimage, miplevel)?;
        Ok(self.spec.clone())
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
        self.check_index(subimage, miplevel)?;
        if z != 0 {
            return Err(IoError::InvalidArgument(format!("z={z} in a 2D pnm file")));
        }
        if ybegin < 0 || yend > self.spec.height || ybegin >= yend {
            return Err(IoError::InvalidArgument(format!(
                "scanline range [{ybegin},{yend}) outside [0,{})",
                self.spec.height
            )));
        }
        if chbegin < 0 || chend <= chbegin || chend > self.spec.nchannels {
            return Err(IoError::InvalidArgument(format!(
                "channel range [{chbegin},{chend}) invalid"
            )));
        }

        let width = self.spec.width as usize;
        let nscan = (yend - ybegin) as usize;
        let nch = self.spec.nchannels as usize;
        let sample_bytes = self.spec.format.size();
        let row_bytes = width * nch * sample_bytes;

        let mut raw = vec![0u8; row_bytes * nscan];
        {
            let mut guard = match self.proxy.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            let proxy = guard.as_mut().ok_or(IoError::NotOpen)?;
            proxy.seek(SeekFrom::Start(
                self.data_start + ybegin as u64 * row_bytes as u64,
            ))?;
            proxy
                .read_exact(&mut raw)
                .map_err(|_| IoError::InvalidFile("truncated pnm pixel data".to_string()))?;
        }

        // File samples are big-endian and scaled by maxval; native output
        // is native-endian at full range.
        match self.spec.format {
            DataFormat::U8 => {
                if self.maxval != 255 {
                    for v in &mut raw {
                        *v = ((*v as u32 * 255) / self.maxval).min(255) as u8;
                    }
                }
            }
            _ => {
                for chunk in raw.chunks_exact_mut(2) {
                    let mut v = BigEndian::read_u16(chunk) as u32;
                    if self.maxval != 65535 {
                        v = (v * 65535 / self.maxval).min(65535);
                    }
                    chunk.copy_from_slice(&(v as u16).to_ne_bytes());
                }
            }
        }

        // Channel subset is a contiguous byte range within each pixel.
        let sub_off = chbegin as usize * sample_bytes;
        let sub_len = (chend - chbegin) as usize * sample_bytes;
        let full_pixel = nch * sample_bytes;
        let need = sub_len * width * nscan;
        if data.len() < need {
            return Err(IoError::InvalidArgument(format!(
                "buffer too small: {} < {need}",
                data.len()
            )));
        }
        if sub_len == full_pixel {
            data[..raw.len()].copy_from_slice(&raw);
        } else {
            crate::convert::gather_strided(
                &raw[sub_off..],
                &mut data[..sub_len * width * nscan],
                sub_len,
                width,
                nscan,
                1,
                Some(full_pixel),
                None,
                None,
            )?;
        }
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        let mut guard = match self.proxy.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            debug!("closed pnm input");
        }
        Ok(())
    }

    fn set_threads(&mut self, n: i32) {
        self.threads = n;
    }

    fn threads(&self) -> i32 {
        self.threads
    }
}

/// Writer for binary PGM/PPM files.
///
/// Scanlines must arrive in increasing y; the storage type is snapped to
/// U8 unless the caller's spec asks for U16.
#[derive(Default)]
pub struct PnmOutput {
    sink: Option<Box<dyn IoSink>>,
    spec: ImageSpec,
    next_y: i32,
}

impl PnmOutput {
    /// Creates an unopened writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`open`](ImageOutput::open), but writing into a
    /// caller-supplied sink instead of a file.
    pub fn open_sink(
        &mut self,
        sink: Box<dyn IoSink>,
        spec: &ImageSpec,
        mode: OpenMode,
    ) -> IoResult<()> {
        output::check_open(mode, spec, PNM_CAPS)?;
        if spec.nchannels != 1 && spec.nchannels != 3 {
            return Err(IoError::UnsupportedFeature(format!(
                "pnm stores 1 or 3 channels, not {}",
                spec.nchannels
            )));
        }

        let mut spec = spec.clone();
        if spec.format != DataFormat::U16 {
            spec.set_format(DataFormat::U8);
        } else {
            spec.channelformats.clear();
        }
        let maxval: u32 = if spec.format == DataFormat::U16 {
            65535
        } else {
            255
        };
        let magic = if spec.nchannels == 1 { "P5" } else { "P6" };

        let mut sink = sink;
        write!(sink, "{magic}\n{} {}\n{maxval}\n", spec.width, spec.height)?;
        debug!(
            magic,
            width = spec.width,
            height = spec.height,
            "opened pnm output"
        );
        self.next_y = spec.y;
        self.spec = spec;
        self.sink = Some(sink);
        Ok(())
    }
}

impl ImageOutput for PnmOutput {
    fn format_name(&self) -> &'static str {
        "pnm"
    }

    fn supports(&self, capability: Capability) -> bool {
        PNM_CAPS.contains(&capability)
    }

    fn open(&mut self, path: &Path, spec: &ImageSpec, mode: OpenMode) -> IoResult<()> {
        self.open_sink(Box::new(FileSink::create(path)?), spec, mode)
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
        let sink = self.sink.as_mut().ok_or(IoError::NotOpen)?;
        if ybegin != self.next_y {
            return Err(IoError::InvalidArgument(format!(
                "pnm scanlines must be written in order: got y={ybegin}, expected y={}",
                self.next_y
            )));
        }
        let nbytes = self.spec.scanline_bytes(true) * (yend - ybegin).max(0) as usize;
        if data.len() < nbytes {
            return Err(IoError::InvalidArgument(format!(
                "scanline buffer too small: {} < {nbytes}",
                data.len()
            )));
        }

        match self.spec.format {
            DataFormat::U16 => {
                for chunk in data[..nbytes].chunks_exact(2) {
                    let v = u16::from_ne_bytes([chunk[0], chunk[1]]);
                    sink.write_u16::<BigEndian>(v)?;
                }
            }
            _ => sink.write_all(&data[..nbytes])?,
        }
        self.next_y = yend;
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        if let Some(mut sink) = self.sink.take() {
            sink.flush()?;
            debug!("closed pnm output");
        }
        Ok(())
    }
}

/// Magic-byte probe for the registry.
pub(crate) fn matches_header(header: &[u8]) -> bool {
    header.len() >= 3
        && header[0] == b'P'
        && (header[1] == b'5' || header[1] == b'6')
        && header[2].is_ascii_whitespace()
}
