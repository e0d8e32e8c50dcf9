//! Storage for "deep" pixels - pixels with a variable number of samples.
//!
//! Deep images store several samples per pixel (typically color + Z at
//! multiple depths) for deep-compositing workflows. [`DeepData`] holds one
//! rectangle of such pixels: per-channel types, a per-pixel sample count,
//! and one flat sample buffer addressed through prefix sums.
//!
//! Mutation takes `&mut self`; shared read access is plain `&self`.
//!
//! # Example
//!
//! ```rust
//! use openimg_core::DataFormat;
//! use openimg_io::DeepData;
//!
//! let mut deep = DeepData::new(
//!     4,
//!     &[DataFormat::F32, DataFormat::F32],
//!     &["A", "Z"],
//! );
//! deep.set_samples(0, 2);
//! deep.set_deep_value(0, 1, 0, 1.5); // Z of first sample
//! assert_eq!(deep.deep_value(0, 1, 0), 1.5);
//! assert_eq!(deep.samples(1), 0);
//! ```

use openimg_core::{DataFormat, ImageSpec};
use smallvec::SmallVec;

use crate::convert::{read_sample, write_sample};

/// One rectangle of deep pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepData {
    npixels: usize,
    channeltypes: SmallVec<[DataFormat; 8]>,
    channelnames: SmallVec<[String; 8]>,
    channeloffsets: SmallVec<[usize; 8]>,
    samplesize: usize,
    z_channel: i32,
    alpha_channel: i32,
    nsamples: Vec<u32>,
    /// Samples preceding each pixel in `data` (prefix sums of nsamples).
    cumsamples: Vec<u64>,
    data: Vec<u8>,
    allocated: bool,
}

impl DeepData {
    /// Creates deep storage for `npixels` pixels with the given channel
    /// layout. All sample counts start at 0.
    pub fn new(npixels: usize, channeltypes: &[DataFormat], channelnames: &[&str]) -> Self {
        let mut offsets: SmallVec<[usize; 8]> = SmallVec::new();
        let mut offset = 0usize;
        for t in channeltypes {
            offsets.push(offset);
            offset += t.size();
        }
        let mut z_channel = -1;
        let mut alpha_channel = -1;
        for (i, name) in channelnames.iter().enumerate() {
            match name.to_ascii_lowercase().as_str() {
                "z" => z_channel = i as i32,
                "a" | "alpha" => alpha_channel = i as i32,
                _ => {}
            }
        }
        Self {
            npixels,
            channeltypes: channeltypes.iter().copied().collect(),
            channelnames: channelnames.iter().map(|s| s.to_string()).collect(),
            channeloffsets: offsets,
            samplesize: offset,
            z_channel,
            alpha_channel,
            nsamples: vec![0; npixels],
            cumsamples: vec![0; npixels],
            data: Vec::new(),
            allocated: false,
        }
    }

    /// Creates deep storage sized and typed from a spec (F32 channels
    /// when the spec has no per-channel formats).
    pub fn from_spec(spec: &ImageSpec) -> Self {
        let npixels = spec.image_pixels() as usize;
        let types: Vec<DataFormat> = if spec.channelformats.is_empty() {
            vec![
                if spec.format.is_unknown() {
                    DataFormat::F32
                } else {
                    spec.format
                };
                spec.nchannels.max(0) as usize
            ]
        } else {
            spec.channelformats.clone()
        };
        let names: Vec<&str> = spec.channelnames.iter().map(|s| s.as_str()).collect();
        Self::new(npixels, &types, &names)
    }

    /// Resets to an empty, zero-pixel state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Total number of pixels.
    pub fn pixels(&self) -> usize {
        self.npixels
    }

    /// Number of channels per sample.
    pub fn channels(&self) -> usize {
        self.channeltypes.len()
    }

    /// Name of channel `c`, or "" when out of range.
    pub fn channel_name(&self, c: usize) -> &str {
        self.channelnames.get(c).map(|s| s.as_str()).unwrap_or("")
    }

    /// Data type of channel `c`.
    pub fn channel_type(&self, c: usize) -> DataFormat {
        self.channeltypes.get(c).copied().unwrap_or_default()
    }

    /// Bytes of one full sample (all channels).
    pub fn samplesize(&self) -> usize {
        self.samplesize
    }

    /// Index of the Z channel, or -1.
    pub fn z_channel(&self) -> i32 {
        self.z_channel
    }

    /// Index of the alpha channel, or -1.
    pub fn alpha_channel(&self) -> i32 {
        self.alpha_channel
    }

    /// Whether `other` has the identical per-channel types.
    pub fn same_channeltypes(&self, other: &DeepData) -> bool {
        self.channeltypes == other.channeltypes
    }

    /// Sample count of one pixel (0 when out of range).
    pub fn samples(&self, pixel: usize) -> u32 {
        self.nsamples.get(pixel).copied().unwrap_or(0)
    }

    /// All per-pixel sample counts.
    pub fn all_samples(&self) -> &[u32] {
        &self.nsamples
    }

    /// The flat sample buffer (empty until a value is written).
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Sets the sample count of one pixel.
    ///
    /// Growing after values were written splices zeroed samples at the
    /// pixel's tail; shrinking discards its trailing samples.
    pub fn set_samples(&mut self, pixel: usize, n: u32) {
        if pixel >= self.npixels {
            return;
        }
        let old = self.nsamples[pixel];
        if old == n {
            return;
        }
        if self.allocated {
            let end = (self.cumsamples[pixel] + old as u64) as usize * self.samplesize;
            if n > old {
                let added = (n - old) as usize * self.samplesize;
                self.data.splice(end..end, std::iter::repeat_n(0u8, added));
            } else {
                let removed = (old - n) as usize * self.samplesize;
                self.data.drain(end - removed..end);
            }
            let delta = n as i64 - old as i64;
            for c in &mut self.cumsamples[pixel + 1..] {
                *c = (*c as i64 + delta) as u64;
            }
        }
        self.nsamples[pixel] = n;
    }

    /// Sets every pixel's sample count at once (lengths must match).
    pub fn set_all_samples(&mut self, samples: &[u32]) {
        if samples.len() != self.npixels {
            return;
        }
        if self.allocated {
            for (pixel, &n) in samples.iter().enumerate() {
                self.set_samples(pixel, n);
            }
        } else {
            self.nsamples.copy_from_slice(samples);
        }
    }

    fn ensure_allocated(&mut self) {
        if self.allocated {
            return;
        }
        let mut total = 0u64;
        for (i, &n) in self.nsamples.iter().enumerate() {
            self.cumsamples[i] = total;
            total += n as u64;
        }
        self.data = vec![0u8; total as usize * self.samplesize];
        self.allocated = true;
    }

    fn sample_offset(&self, pixel: usize, channel: usize, sample: usize) -> Option<usize> {
        if pixel >= self.npixels
            || channel >= self.channeltypes.len()
            || sample >= self.nsamples[pixel] as usize
        {
            return None;
        }
        Some(
            (self.cumsamples[pixel] as usize + sample) * self.samplesize
                + self.channeloffsets[channel],
        )
    }

    /// One sample value as normalized f32 (0.0 for out-of-range indices).
    pub fn deep_value(&self, pixel: usize, channel: usize, sample: usize) -> f32 {
        if !self.allocated {
            return 0.0;
        }
        match self.sample_offset(pixel, channel, sample) {
            Some(off) => read_sample(&self.data[off..], self.channeltypes[channel]),
            None => 0.0,
        }
    }

    /// Writes one sample value; out-of-range indices are ignored.
    pub fn set_deep_value(&mut self, pixel: usize, channel: usize, sample: usize, value: f32) {
        self.ensure_allocated();
        if let Some(off) = self.sample_offset(pixel, channel, sample) {
            let fmt = self.channeltypes[channel];
            write_sample(value, fmt, &mut self.data[off..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_and_special_channels() {
        let deep = DeepData::new(
            100,
            &[DataFormat::F32; 5],
            &["R", "G", "B", "A", "Z"],
        );
        assert_eq!(deep.pixels(), 100);
        assert_eq!(deep.channels(), 5);
        assert_eq!(deep.z_channel(), 4);
        assert_eq!(deep.alpha_channel(), 3);
        assert_eq!(deep.samplesize(), 20);
        assert_eq!(deep.samples(0), 0);
    }

    #[test]
    fn test_value_round_trip() {
        let mut deep = DeepData::new(10, &[DataFormat::F32, DataFormat::F32], &["A", "Z"]);
        deep.set_samples(3, 2);
        deep.set_deep_value(3, 0, 0, 0.5);
        deep.set_deep_value(3, 1, 1, 7.25);
        assert_eq!(deep.deep_value(3, 0, 0), 0.5);
        assert_eq!(deep.deep_value(3, 1, 1), 7.25);
        // untouched samples read as zero
        assert_eq!(deep.deep_value(3, 1, 0), 0.0);
        // out-of-range indices miss softly
        assert_eq!(deep.deep_value(3, 0, 2), 0.0);
        assert_eq!(deep.deep_value(99, 0, 0), 0.0);
    }

    #[test]
    fn test_grow_after_allocation_preserves_neighbors() {
        let mut deep = DeepData::new(3, &[DataFormat::F32], &["Z"]);
        deep.set_samples(0, 1);
        deep.set_samples(1, 1);
        deep.set_samples(2, 1);
        deep.set_deep_value(0, 0, 0, 1.0);
        deep.set_deep_value(1, 0, 0, 2.0);
        deep.set_deep_value(2, 0, 0, 3.0);

        deep.set_samples(1, 3);
        assert_eq!(deep.samples(1), 3);
        assert_eq!(deep.deep_value(0, 0, 0), 1.0);
        assert_eq!(deep.deep_value(1, 0, 0), 2.0);
        assert_eq!(deep.deep_value(1, 0, 1), 0.0); // spliced-in zeros
        assert_eq!(deep.deep_value(2, 0, 0), 3.0);

        deep.set_samples(1, 1);
        assert_eq!(deep.deep_value(2, 0, 0), 3.0);
    }

    #[test]
    fn test_integer_channels_normalized() {
        let mut deep = DeepData::new(1, &[DataFormat::U16], &["A"]);
        deep.set_samples(0, 1);
        deep.set_deep_value(0, 0, 0, 1.0);
        assert_eq!(deep.deep_value(0, 0, 0), 1.0);
    }

    #[test]
    fn test_from_spec() {
        let mut spec = ImageSpec::from_dimensions(4, 2, 3, DataFormat::Unknown);
        spec.deep = true;
        let deep = DeepData::from_spec(&spec);
        assert_eq!(deep.pixels(), 8);
        assert_eq!(deep.channels(), 3);
        assert_eq!(deep.channel_type(0), DataFormat::F32);
        assert_eq!(deep.channel_name(0), "R");
    }
}
