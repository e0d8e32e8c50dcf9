//! Pixel format conversion and strided buffer placement.
//!
//! Readers decode into the file's native layout; callers usually want a
//! different data type and sometimes a non-contiguous destination. The two
//! halves of that translation live here:
//!
//! - [`convert_pixels`] - per-sample data type conversion. Integer types
//!   are treated as normalized (u8 255 == f32 1.0); converting goes
//!   through f32, clamping and rounding on the way back to integers.
//! - [`copy_strided`] / [`gather_strided`] - scatter contiguous pixels
//!   into a strided caller buffer and back. Strides are byte counts;
//!   `None` means "contiguous/auto".
//!
//! Same-format conversion and contiguous placement degrade to plain
//! copies.

use half::f16;
use openimg_core::{DataFormat, ImageSpec};

use crate::error::{IoError, IoResult};

/// Reads one sample as a normalized f32.
#[inline]
pub(crate) fn read_sample(bytes: &[u8], fmt: DataFormat) -> f32 {
    match fmt {
        DataFormat::U8 => bytes[0] as f32 / 255.0,
        DataFormat::U16 => u16::from_ne_bytes([bytes[0], bytes[1]]) as f32 / 65535.0,
        DataFormat::U32 => {
            let v = u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (v as f64 / u32::MAX as f64) as f32
        }
        DataFormat::F16 => f16::from_ne_bytes([bytes[0], bytes[1]]).to_f32(),
        DataFormat::F32 => f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        DataFormat::Unknown => 0.0,
    }
}

/// Writes one normalized f32 sample in the given format.
#[inline]
pub(crate) fn write_sample(v: f32, fmt: DataFormat, out: &mut [u8]) {
    match fmt {
        DataFormat::U8 => out[0] = (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8,
        DataFormat::U16 => {
            let q = (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
            out[..2].copy_from_slice(&q.to_ne_bytes());
        }
        DataFormat::U32 => {
            let q = (v.clamp(0.0, 1.0) as f64 * u32::MAX as f64 + 0.5) as u32;
            out[..4].copy_from_slice(&q.to_ne_bytes());
        }
        DataFormat::F16 => out[..2].copy_from_slice(&f16::from_f32(v).to_ne_bytes()),
        DataFormat::F32 => out[..4].copy_from_slice(&v.to_ne_bytes()),
        DataFormat::Unknown => {}
    }
}

/// The per-channel formats of the channel range [chbegin, chend) in a
/// spec's native layout.
pub fn native_formats(spec: &ImageSpec, chbegin: i32, chend: i32) -> Vec<DataFormat> {
    (chbegin..chend).map(|c| spec.channelformat(c)).collect()
}

/// Converts `npixels` interleaved pixels between data types.
///
/// `src_formats` and `dst_formats` give the per-channel types and must
/// have the same length. Both buffers must hold at least `npixels` pixels
/// of their respective layouts.
pub fn convert_pixels(
    src: &[u8],
    src_formats: &[DataFormat],
    dst: &mut [u8],
    dst_formats: &[DataFormat],
    npixels: usize,
) -> IoResult<()> {
    if src_formats.len() != dst_formats.len() {
        return Err(IoError::InvalidArgument(format!(
            "channel count mismatch: {} vs {}",
            src_formats.len(),
            dst_formats.len()
        )));
    }
    let src_pixel: usize = src_formats.iter().map(|f| f.size()).sum();
    let dst_pixel: usize = dst_formats.iter().map(|f| f.size()).sum();
    let need_src = npixels.saturating_mul(src_pixel);
    let need_dst = npixels.saturating_mul(dst_pixel);
    if src.len() < need_src || dst.len() < need_dst {
        return Err(IoError::InvalidArgument(format!(
            "conversion buffer too small: have {}/{}, need {}/{}",
            src.len(),
            dst.len(),
            need_src,
            need_dst
        )));
    }

    if src_formats == dst_formats {
        dst[..need_dst].copy_from_slice(&src[..need_src]);
        return Ok(());
    }

    let mut sp = 0usize;
    let mut dp = 0usize;
    for _ in 0..npixels {
        for (sf, df) in src_formats.iter().zip(dst_formats) {
            let v = read_sample(&src[sp..], *sf);
            write_sample(v, *df, &mut dst[dp..]);
            sp += sf.size();
            dp += df.size();
        }
    }
    Ok(())
}

/// Resolves optional strides against the contiguous layout of a
/// width x height x depth block.
#[inline]
pub(crate) fn resolve_strides(
    pixel_bytes: usize,
    width: usize,
    height: usize,
    xstride: Option<usize>,
    ystride: Option<usize>,
    zstride: Option<usize>,
) -> (usize, usize, usize) {
    let xs = xstride.unwrap_or(pixel_bytes);
    let ys = ystride.unwrap_or(xs * width);
    let zs = zstride.unwrap_or(ys * height);
    (xs, ys, zs)
}

pub(crate) fn strided_extent(
    pixel_bytes: usize,
    width: usize,
    height: usize,
    depth: usize,
    xs: usize,
    ys: usize,
    zs: usize,
) -> usize {
    if width == 0 || height == 0 || depth == 0 {
        return 0;
    }
    (depth - 1)
        .saturating_mul(zs)
        .saturating_add((height - 1).saturating_mul(ys))
        .saturating_add((width - 1).saturating_mul(xs))
        .saturating_add(pixel_bytes)
}

/// Scatters a contiguous width x height x depth pixel block into a
/// strided destination.
#[allow(clippy::too_many_arguments)]
pub fn copy_strided(
    src: &[u8],
    dst: &mut [u8],
    pixel_bytes: usize,
    width: usize,
    height: usize,
    depth: usize,
    xstride: Option<usize>,
    ystride: Option<usize>,
    zstride: Option<usize>,
) -> IoResult<()> {
    let (xs, ys, zs) = resolve_strides(pixel_bytes, width, height, xstride, ystride, zstride);
    let need_src = pixel_bytes * width * height * depth;
    let need_dst = strided_extent(pixel_bytes, width, height, depth, xs, ys, zs);
    if src.len() < need_src || dst.len() < need_dst {
        return Err(IoError::InvalidArgument(
            "strided copy out of bounds".to_string(),
        ));
    }

    // Contiguous destination collapses to one copy.
    if xs == pixel_bytes && ys == pixel_bytes * width && zs == ys * height {
        dst[..need_src].copy_from_slice(&src[..need_src]);
        return Ok(());
    }

    let row_bytes = pixel_bytes * width;
    for z in 0..depth {
        for y in 0..height {
            let srow = (z * height + y) * row_bytes;
            let drow = z * zs + y * ys;
            if xs == pixel_bytes {
                dst[drow..drow + row_bytes].copy_from_slice(&src[srow..srow + row_bytes]);
            } else {
                for x in 0..width {
                    let s = srow + x * pixel_bytes;
                    let d = drow + x * xs;
                    dst[d..d + pixel_bytes].copy_from_slice(&src[s..s + pixel_bytes]);
                }
            }
        }
    }
    Ok(())
}

/// Gathers a strided source block into a contiguous destination, the
/// inverse of [`copy_strided`].
#[allow(clippy::too_many_arguments)]
pub fn gather_strided(
    src: &[u8],
    dst: &mut [u8],
    pixel_bytes: usize,
    width: usize,
    height: usize,
    depth: usize,
    xstride: Option<usize>,
    ystride: Option<usize>,
    zstride: Option<usize>,
) -> IoResult<()> {
    let (xs, ys, zs) = resolve_strides(pixel_bytes, width, height, xstride, ystride, zstride);
    let need_src = strided_extent(pixel_bytes, width, height, depth, xs, ys, zs);
    let need_dst = pixel_bytes * width * height * depth;
    if src.len() < need_src || dst.len() < need_dst {
        return Err(IoError::InvalidArgument(
            "strided gather out of bounds".to_string(),
        ));
    }

    if xs == pixel_bytes && ys == pixel_bytes * width && zs == ys * height {
        dst[..need_dst].copy_from_slice(&src[..need_dst]);
        return Ok(());
    }

    let row_bytes = pixel_bytes * width;
    for z in 0..depth {
        for y in 0..height {
            let srow = z * zs + y * ys;
            let drow = (z * height + y) * row_bytes;
            if xs == pixel_bytes {
                dst[drow..drow + row_bytes].copy_from_slice(&src[srow..srow + row_bytes]);
            } else {
                for x in 0..width {
                    let s = srow + x * xs;
                    let d = drow + x * pixel_bytes;
                    dst[d..d + pixel_bytes].copy_from_slice(&src[s..s + pixel_bytes]);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_to_f32() {
        let src = [0u8, 128, 255];
        let mut dst = [0u8; 12];
        convert_pixels(
            &src,
            &[DataFormat::U8; 3],
            &mut dst,
            &[DataFormat::F32; 3],
            1,
        )
        .unwrap();
        let v: Vec<f32> = dst
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(v[0], 0.0);
        assert!((v[1] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(v[2], 1.0);
    }

    #[test]
    fn test_f32_to_u16_clamps() {
        let src: Vec<u8> = [-0.5f32, 0.5, 2.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let mut dst = [0u8; 6];
        convert_pixels(
            &src,
            &[DataFormat::F32; 3],
            &mut dst,
            &[DataFormat::U16; 3],
            1,
        )
        .unwrap();
        let v: Vec<u16> = dst
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(v, [0, 32768, 65535]);
    }

    #[test]
    fn test_half_round_trip() {
        let src: Vec<u8> = [0.25f32, 1.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let mut mid = [0u8; 4];
        convert_pixels(
            &src,
            &[DataFormat::F32; 2],
            &mut mid,
            &[DataFormat::F16; 2],
            1,
        )
        .unwrap();
        let mut back = [0u8; 8];
        convert_pixels(
            &mid,
            &[DataFormat::F16; 2],
            &mut back,
            &[DataFormat::F32; 2],
            1,
        )
        .unwrap();
        let v0 = f32::from_ne_bytes([back[0], back[1], back[2], back[3]]);
        assert_eq!(v0, 0.25);
    }

    #[test]
    fn test_mixed_per_channel_formats() {
        // f16 color + u8 mask pixel, converted to uniform f32
        let mut src = Vec::new();
        src.extend_from_slice(&f16::from_f32(0.5).to_ne_bytes());
        src.push(255u8);
        let mut dst = [0u8; 8];
        convert_pixels(
            &src,
            &[DataFormat::F16, DataFormat::U8],
            &mut dst,
            &[DataFormat::F32, DataFormat::F32],
            1,
        )
        .unwrap();
        let mask = f32::from_ne_bytes([dst[4], dst[5], dst[6], dst[7]]);
        assert_eq!(mask, 1.0);
    }

    #[test]
    fn test_buffer_size_checked() {
        let src = [0u8; 2];
        let mut dst = [0u8; 2];
        let err = convert_pixels(
            &src,
            &[DataFormat::U8; 3],
            &mut dst,
            &[DataFormat::U8; 3],
            1,
        );
        assert!(matches!(err, Err(IoError::InvalidArgument(_))));
    }

    #[test]
    fn test_copy_strided_with_row_gap() {
        // two 2-pixel rows of 1-byte pixels into rows padded to 4 bytes
        let src = [1u8, 2, 3, 4];
        let mut dst = [0u8; 8];
        copy_strided(&src, &mut dst, 1, 2, 2, 1, None, Some(4), None).unwrap();
        assert_eq!(dst, [1, 2, 0, 0, 3, 4, 0, 0]);

        let mut back = [0u8; 4];
        gather_strided(&dst, &mut back, 1, 2, 2, 1, None, Some(4), None).unwrap();
        assert_eq!(back, src);
    }

    #[test]
    fn test_copy_strided_pixel_gap() {
        // scatter 3 single-byte pixels into every other byte
        let src = [7u8, 8, 9];
        let mut dst = [0u8; 5];
        copy_strided(&src, &mut dst, 1, 3, 1, 1, Some(2), None, None).unwrap();
        assert_eq!(dst, [7, 0, 8, 0, 9]);
    }

    #[test]
    fn test_strided_bounds_rejected() {
        let src = [0u8; 4];
        let mut dst = [0u8; 3];
        let err = copy_strided(&src, &mut dst, 1, 2, 2, 1, None, Some(4), None);
        assert!(matches!(err, Err(IoError::InvalidArgument(_))));
    }
}
