//! Image specification: geometry, pixel formats, channels, and metadata.
//!
//! [`ImageSpec`] is the "header" of an image: everything a reader reports
//! about a subimage and everything a writer needs to lay one down. It is a
//! plain value type with copy-in/copy-out semantics; whoever holds one owns
//! it outright.
//!
//! # Data window vs. display window
//!
//! The data window (`x, y, z, width, height, depth`) is where pixel data
//! actually exists; the display window (`full_*`) is the nominal frame.
//! They differ for crops and overscan:
//!
//! ```text
//! ┌─────────────────────────────┐
//! │       Display Window        │
//! │   ┌───────────────────┐     │
//! │   │    Data Window    │     │
//! │   │  (actual pixels)  │     │
//! │   └───────────────────┘     │
//! └─────────────────────────────┘
//! ```
//!
//! # Metadata
//!
//! Arbitrary named attributes live in `extra_attribs`, an ordered list that
//! preserves insertion order for serialization. Metadata operations never
//! panic and never error: malformed input degrades to "attribute not
//! found". Hard failures are reserved for the I/O layer.
//!
//! # Example
//!
//! ```rust
//! use openimg_core::{DataFormat, ImageSpec};
//!
//! let mut spec = ImageSpec::from_dimensions(1920, 1080, 4, DataFormat::F16);
//! assert_eq!(spec.channelnames, ["R", "G", "B", "A"]);
//! assert_eq!(spec.alpha_channel, 3);
//!
//! spec.attribute("Software", "openimg");
//! spec.attribute("FrameRate", 24);
//! assert_eq!(spec.get_int_attribute("FrameRate", 0), 24);
//! ```

use regex::Regex;

use crate::attr::{AttrKind, AttrValue, ParamValue};
use crate::format::DataFormat;
use crate::roi::Roi;

/// Description of one subimage: geometry, pixel type(s), channel layout,
/// and named metadata.
///
/// # Invariants
///
/// - `width`, `height`, `depth` are >= 0.
/// - Untiled storage is `tile_width == tile_height == tile_depth == 0`;
///   tiled storage has all three > 0.
/// - `channelformats`, when non-empty, has exactly `nchannels` entries.
/// - `alpha_channel` / `z_channel` are valid indices or -1.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    /// Data window origin, x.
    pub x: i32,
    /// Data window origin, y.
    pub y: i32,
    /// Data window origin, z (0 for 2D images).
    pub z: i32,
    /// Data window width in pixels.
    pub width: i32,
    /// Data window height in pixels.
    pub height: i32,
    /// Data window depth; > 1 signals a volumetric image.
    pub depth: i32,
    /// Display window origin, x.
    pub full_x: i32,
    /// Display window origin, y.
    pub full_y: i32,
    /// Display window origin, z.
    pub full_z: i32,
    /// Display window width.
    pub full_width: i32,
    /// Display window height.
    pub full_height: i32,
    /// Display window depth.
    pub full_depth: i32,
    /// Tile width; 0 means scanline-oriented storage.
    pub tile_width: i32,
    /// Tile height; 0 when untiled.
    pub tile_height: i32,
    /// Tile depth; 0 when untiled.
    pub tile_depth: i32,
    /// Number of channels per pixel.
    pub nchannels: i32,
    /// Default data type for all channels.
    pub format: DataFormat,
    /// Per-channel type overrides; empty means all channels use `format`.
    pub channelformats: Vec<DataFormat>,
    /// Channel names, one per channel.
    pub channelnames: Vec<String>,
    /// Index of the alpha channel, or -1 if unknown/absent.
    pub alpha_channel: i32,
    /// Index of the depth (Z) channel, or -1 if unknown/absent.
    pub z_channel: i32,
    /// True if each pixel holds a variable-length list of samples.
    pub deep: bool,
    /// Arbitrary named metadata, insertion-ordered.
    pub extra_attribs: Vec<ParamValue>,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self::new(DataFormat::Unknown)
    }
}

impl ImageSpec {
    /// Creates a spec with no geometry set, only a pixel format.
    ///
    /// This is the canonical "freshly constructed, nothing set" state when
    /// `format` is `Unknown` (also available as `ImageSpec::default()`);
    /// see [`undefined`](Self::undefined).
    pub fn new(format: DataFormat) -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            width: 0,
            height: 0,
            depth: 1,
            full_x: 0,
            full_y: 0,
            full_z: 0,
            full_width: 0,
            full_height: 0,
            full_depth: 0,
            tile_width: 0,
            tile_height: 0,
            tile_depth: 0,
            nchannels: 0,
            format,
            channelformats: Vec::new(),
            channelnames: Vec::new(),
            alpha_channel: -1,
            z_channel: -1,
            deep: false,
            extra_attribs: Vec::new(),
        }
    }

    /// Creates a 2D spec with the given resolution and channel count.
    ///
    /// The display window matches the data window, storage is scanline
    /// oriented, and channels get their default names.
    pub fn from_dimensions(xres: i32, yres: i32, nchannels: i32, format: DataFormat) -> Self {
        let mut spec = Self::new(format);
        spec.width = xres;
        spec.height = yres;
        spec.full_width = xres;
        spec.full_height = yres;
        spec.full_depth = 1;
        spec.nchannels = nchannels;
        spec.default_channel_names();
        spec
    }

    /// Creates a spec whose data and display windows both match `roi`.
    pub fn from_roi(roi: &Roi, format: DataFormat) -> Self {
        let mut spec = Self::from_dimensions(roi.width(), roi.height(), roi.nchannels(), format);
        spec.set_roi(roi);
        spec.set_roi_full(roi);
        spec
    }

    /// True iff nothing has been set: no channels and an unknown format.
    #[inline]
    pub fn undefined(&self) -> bool {
        self.nchannels == 0 && self.format.is_unknown()
    }

    /// Rederives `channelnames`, `alpha_channel` and `z_channel` from
    /// `nchannels`.
    ///
    /// 1 channel is "A"; 2 channels "I","A"; 3 channels "R","G","B";
    /// 4 or more "R","G","B","A" then "channel4", "channel5", ...
    pub fn default_channel_names(&mut self) {
        self.channelnames.clear();
        self.alpha_channel = -1;
        self.z_channel = -1;
        match self.nchannels {
            n if n <= 0 => {}
            1 => self.channelnames.push("A".to_string()),
            2 => {
                self.channelnames.push("I".to_string());
                self.channelnames.push("A".to_string());
                self.alpha_channel = 1;
            }
            3 => {
                for name in ["R", "G", "B"] {
                    self.channelnames.push(name.to_string());
                }
            }
            n => {
                for name in ["R", "G", "B", "A"] {
                    self.channelnames.push(name.to_string());
                }
                self.alpha_channel = 3;
                for c in 4..n {
                    self.channelnames.push(format!("channel{}", c));
                }
            }
        }
    }

    /// Sets the blanket pixel format and clears any per-channel overrides.
    ///
    /// Callers wanting per-channel formats must populate `channelformats`
    /// *after* this call.
    pub fn set_format(&mut self, format: DataFormat) {
        self.format = format;
        self.channelformats.clear();
    }

    // === Derived sizes ===
    //
    // All byte counts saturate at usize::MAX instead of wrapping, so a
    // hostile header can never produce a small-looking allocation size.

    /// Bytes of one channel sample in the requested format.
    #[inline]
    pub fn channel_bytes(&self) -> usize {
        self.format.size()
    }

    /// Bytes of one sample of channel `chan`.
    ///
    /// With `native`, uses the per-channel format when present. Returns 0
    /// for out-of-range channels.
    pub fn channel_bytes_for(&self, chan: i32, native: bool) -> usize {
        if chan < 0 || chan >= self.nchannels {
            return 0;
        }
        if native {
            self.channelformat(chan).size()
        } else {
            self.format.size()
        }
    }

    /// Bytes of one pixel.
    ///
    /// With `native`, sums the per-channel formats when present; otherwise
    /// `nchannels * format.size()`.
    pub fn pixel_bytes(&self, native: bool) -> usize {
        if self.nchannels < 0 {
            return 0;
        }
        if native && !self.channelformats.is_empty() {
            self.channelformats.iter().map(|f| f.size()).sum()
        } else {
            (self.nchannels as usize).saturating_mul(self.format.size())
        }
    }

    /// Bytes of one scanline.
    pub fn scanline_bytes(&self, native: bool) -> usize {
        (self.width.max(0) as usize).saturating_mul(self.pixel_bytes(native))
    }

    /// Number of pixels in one tile, or 0 if untiled.
    pub fn tile_pixels(&self) -> u64 {
        if self.tile_width <= 0 || self.tile_height <= 0 || self.tile_depth <= 0 {
            return 0;
        }
        (self.tile_width as u64) * (self.tile_height as u64) * (self.tile_depth as u64)
    }

    /// Bytes of one tile, or 0 if untiled.
    pub fn tile_bytes(&self, native: bool) -> usize {
        saturating_usize(self.tile_pixels()).saturating_mul(self.pixel_bytes(native))
    }

    /// Number of pixels in the data window, saturating.
    pub fn image_pixels(&self) -> u64 {
        (self.width.max(0) as u64)
            .saturating_mul(self.height.max(0) as u64)
            .saturating_mul(self.depth.max(0) as u64)
    }

    /// Bytes of the whole data window, saturating at `usize::MAX`.
    pub fn image_bytes(&self, native: bool) -> usize {
        saturating_usize(self.image_pixels()).saturating_mul(self.pixel_bytes(native))
    }

    /// Whether the total image byte count fits in `usize` without
    /// saturating, i.e. whether a buffer of that size is representable.
    pub fn size_t_safe(&self) -> bool {
        self.image_bytes(false) < usize::MAX && self.image_bytes(true) < usize::MAX
    }

    // === Channels ===

    /// The format of channel `chan`.
    ///
    /// Safe even when `channelformats` is short or empty: falls back to the
    /// blanket `format`.
    pub fn channelformat(&self, chan: i32) -> DataFormat {
        if chan >= 0 && (chan as usize) < self.channelformats.len() {
            self.channelformats[chan as usize]
        } else {
            self.format
        }
    }

    /// The name of channel `chan`, or "" when out of range.
    pub fn channel_name(&self, chan: i32) -> &str {
        if chan >= 0 && (chan as usize) < self.channelnames.len() {
            &self.channelnames[chan as usize]
        } else {
            ""
        }
    }

    // === ROI ===

    /// The data window as an ROI (channel range [0, nchannels)).
    pub fn roi(&self) -> Roi {
        Roi::new(
            self.x,
            self.x + self.width,
            self.y,
            self.y + self.height,
            self.z,
            self.z + self.depth,
            0,
            self.nchannels,
        )
    }

    /// The display window as an ROI (channel range [0, nchannels)).
    pub fn roi_full(&self) -> Roi {
        Roi::new(
            self.full_x,
            self.full_x + self.full_width,
            self.full_y,
            self.full_y + self.full_height,
            self.full_z,
            self.full_z + self.full_depth,
            0,
            self.nchannels,
        )
    }

    /// Sets the data window geometry from `roi`.
    ///
    /// Touches geometry only; channel count and metadata are unchanged.
    pub fn set_roi(&mut self, roi: &Roi) {
        self.x = roi.xbegin;
        self.y = roi.ybegin;
        self.z = roi.zbegin;
        self.width = roi.width();
        self.height = roi.height();
        self.depth = roi.depth();
    }

    /// Sets the display window geometry from `roi`.
    pub fn set_roi_full(&mut self, roi: &Roi) {
        self.full_x = roi.xbegin;
        self.full_y = roi.ybegin;
        self.full_z = roi.zbegin;
        self.full_width = roi.width();
        self.full_height = roi.height();
        self.full_depth = roi.depth();
    }

    // === Tiles ===

    /// Whether the given pixel range is a legal tile read/write range.
    ///
    /// Requires tiled storage, begin coordinates on tile boundaries, and
    /// end coordinates that are either tile-aligned or exactly at the image
    /// edge (the trailing partial tile is valid even though its extent is
    /// not a full tile multiple).
    pub fn valid_tile_range(
        &self,
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
    ) -> bool {
        if self.tile_width <= 0 || self.tile_height <= 0 || self.tile_depth <= 0 {
            return false;
        }
        (xbegin - self.x) % self.tile_width == 0
            && (ybegin - self.y) % self.tile_height == 0
            && (zbegin - self.z) % self.tile_depth == 0
            && ((xend - self.x) % self.tile_width == 0 || (xend - self.x) == self.width)
            && ((yend - self.y) % self.tile_height == 0 || (yend - self.y) == self.height)
            && ((zend - self.z) % self.tile_depth == 0 || (zend - self.z) == self.depth)
    }

    // === Metadata ===

    /// Adds or replaces a named attribute.
    ///
    /// Name matching for replacement is case-sensitive and exact; a
    /// replaced attribute keeps its insertion position.
    pub fn attribute(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .extra_attribs
            .iter_mut()
            .find(|p| p.name_matches(&name, true))
        {
            existing.value = value;
        } else {
            self.extra_attribs.push(ParamValue { name, value });
        }
    }

    /// Removes every attribute whose name matches the regular expression
    /// `pattern` (full match) and whose type passes `type_filter`.
    ///
    /// The regex form enables wildcard bulk removal, e.g.
    /// `erase_attribute("IPTC:.*", AttrKind::Unknown, true)`. An invalid
    /// pattern removes nothing.
    pub fn erase_attribute(&mut self, pattern: &str, type_filter: AttrKind, casesensitive: bool) {
        let anchored = if casesensitive {
            format!("^(?:{})$", pattern)
        } else {
            format!("(?i)^(?:{})$", pattern)
        };
        let Ok(re) = Regex::new(&anchored) else {
            return;
        };
        self.extra_attribs
            .retain(|p| !(re.is_match(&p.name) && p.value.matches_kind(type_filter)));
    }

    /// Finds the first attribute with exactly the given name (under the
    /// case rule) whose type passes `type_filter`.
    ///
    /// Unlike [`erase_attribute`](Self::erase_attribute), the name is NOT a
    /// regex.
    pub fn find_attribute(
        &self,
        name: &str,
        type_filter: AttrKind,
        casesensitive: bool,
    ) -> Option<&ParamValue> {
        self.extra_attribs
            .iter()
            .find(|p| p.name_matches(name, casesensitive) && p.value.matches_kind(type_filter))
    }

    /// Like [`find_attribute`](Self::find_attribute), but can also
    /// synthesize "virtual" attributes for the hard-coded struct fields
    /// ("width", "nchannels", "datawindow", ...), so one lookup API serves
    /// both real metadata and geometry.
    ///
    /// Returns an owned value because virtual attributes have no backing
    /// storage.
    pub fn find_attribute_virtual(
        &self,
        name: &str,
        type_filter: AttrKind,
        casesensitive: bool,
    ) -> Option<ParamValue> {
        if let Some(found) = self.find_attribute(name, type_filter, casesensitive) {
            return Some(found.clone());
        }
        let value = self.virtual_attribute(name)?;
        if !value.matches_kind(type_filter) {
            return None;
        }
        Some(ParamValue::new(name, value))
    }

    /// Typed copy-out: the attribute's value if it exists (real or
    /// virtual) and passes the type filter, else `None`.
    pub fn getattribute(
        &self,
        name: &str,
        type_filter: AttrKind,
        casesensitive: bool,
    ) -> Option<AttrValue> {
        self.find_attribute_virtual(name, type_filter, casesensitive)
            .map(|p| p.value)
    }

    /// Integer lookup with best-effort coercion and a default fallback.
    ///
    /// Name matching is case-insensitive. A float truncates; a string
    /// converts only when it is exactly one integer literal.
    pub fn get_int_attribute(&self, name: &str, default: i32) -> i32 {
        self.find_attribute_virtual(name, AttrKind::Unknown, false)
            .and_then(|p| p.value.as_int())
            .unwrap_or(default)
    }

    /// Float lookup with best-effort coercion and a default fallback.
    pub fn get_float_attribute(&self, name: &str, default: f32) -> f32 {
        self.find_attribute_virtual(name, AttrKind::Unknown, false)
            .and_then(|p| p.value.as_float())
            .unwrap_or(default)
    }

    /// String lookup with a default fallback. Non-string values are
    /// rendered through their display form.
    pub fn get_string_attribute(&self, name: &str, default: &str) -> String {
        match self.find_attribute_virtual(name, AttrKind::Unknown, false) {
            Some(p) => p.value.to_string(),
            None => default.to_string(),
        }
    }

    fn virtual_attribute(&self, name: &str) -> Option<AttrValue> {
        let int = |v: i32| Some(AttrValue::Int(v));
        match name.to_ascii_lowercase().as_str() {
            "x" => int(self.x),
            "y" => int(self.y),
            "z" => int(self.z),
            "width" => int(self.width),
            "height" => int(self.height),
            "depth" => int(self.depth),
            "full_x" => int(self.full_x),
            "full_y" => int(self.full_y),
            "full_z" => int(self.full_z),
            "full_width" => int(self.full_width),
            "full_height" => int(self.full_height),
            "full_depth" => int(self.full_depth),
            "tile_width" => int(self.tile_width),
            "tile_height" => int(self.tile_height),
            "tile_depth" => int(self.tile_depth),
            "nchannels" => int(self.nchannels),
            "alpha_channel" => int(self.alpha_channel),
            "z_channel" => int(self.z_channel),
            "deep" => int(self.deep as i32),
            "format" => Some(AttrValue::Str(self.format.name().to_string())),
            "datawindow" => {
                let mut v = vec![self.x, self.y, self.x + self.width - 1, self.y + self.height - 1];
                if self.depth > 1 {
                    v = vec![
                        self.x,
                        self.y,
                        self.z,
                        self.x + self.width - 1,
                        self.y + self.height - 1,
                        self.z + self.depth - 1,
                    ];
                }
                Some(AttrValue::IntList(v))
            }
            "displaywindow" => {
                let mut v = vec![
                    self.full_x,
                    self.full_y,
                    self.full_x + self.full_width - 1,
                    self.full_y + self.full_height - 1,
                ];
                if self.full_depth > 1 {
                    v = vec![
                        self.full_x,
                        self.full_y,
                        self.full_z,
                        self.full_x + self.full_width - 1,
                        self.full_y + self.full_height - 1,
                        self.full_z + self.full_depth - 1,
                    ];
                }
                Some(AttrValue::IntList(v))
            }
            _ => None,
        }
    }

    // === Copying ===

    /// Copies only the geometry and type fields from `other`.
    ///
    /// Explicitly excludes `extra_attribs` and `channelnames`; this is the
    /// cheap path when a full metadata copy would be wasted.
    pub fn copy_dimensions(&mut self, other: &ImageSpec) {
        self.x = other.x;
        self.y = other.y;
        self.z = other.z;
        self.width = other.width;
        self.height = other.height;
        self.depth = other.depth;
        self.full_x = other.full_x;
        self.full_y = other.full_y;
        self.full_z = other.full_z;
        self.full_width = other.full_width;
        self.full_height = other.full_height;
        self.full_depth = other.full_depth;
        self.tile_width = other.tile_width;
        self.tile_height = other.tile_height;
        self.tile_depth = other.tile_depth;
        self.nchannels = other.nchannels;
        self.format = other.format;
        self.channelformats = other.channelformats.clone();
        self.alpha_channel = other.alpha_channel;
        self.z_channel = other.z_channel;
        self.deep = other.deep;
    }
}

/// Clamps a u64 pixel count into usize without wrapping.
#[inline]
fn saturating_usize(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_sentinel() {
        let spec = ImageSpec::default();
        assert_eq!(spec.nchannels, 0);
        assert!(spec.undefined());

        let spec = ImageSpec::from_dimensions(64, 64, 3, DataFormat::U8);
        assert!(!spec.undefined());
    }

    #[test]
    fn test_default_channel_names_rgba() {
        let spec = ImageSpec::from_dimensions(64, 64, 4, DataFormat::U8);
        assert_eq!(spec.channelnames, ["R", "G", "B", "A"]);
        assert_eq!(spec.alpha_channel, 3);
    }

    #[test]
    fn test_default_channel_names_six() {
        let spec = ImageSpec::from_dimensions(8, 8, 6, DataFormat::F32);
        assert_eq!(
            spec.channelnames,
            ["R", "G", "B", "A", "channel4", "channel5"]
        );
        assert_eq!(spec.alpha_channel, 3);
        assert!(spec.alpha_channel < spec.nchannels);
    }

    #[test]
    fn test_default_channel_names_small() {
        let spec = ImageSpec::from_dimensions(8, 8, 1, DataFormat::U8);
        assert_eq!(spec.channelnames, ["A"]);
        assert_eq!(spec.alpha_channel, -1);

        let spec = ImageSpec::from_dimensions(8, 8, 2, DataFormat::U8);
        assert_eq!(spec.channelnames, ["I", "A"]);
        assert_eq!(spec.alpha_channel, 1);
    }

    #[test]
    fn test_set_format_clears_channelformats() {
        let mut spec = ImageSpec::from_dimensions(8, 8, 3, DataFormat::U8);
        spec.channelformats = vec![DataFormat::U8, DataFormat::U8, DataFormat::F32];
        spec.set_format(DataFormat::F32);
        assert!(spec.channelformats.is_empty());
        assert_eq!(spec.format, DataFormat::F32);
    }

    #[test]
    fn test_byte_sizes() {
        let spec = ImageSpec::from_dimensions(100, 50, 4, DataFormat::U16);
        assert_eq!(spec.channel_bytes(), 2);
        assert_eq!(spec.pixel_bytes(false), 8);
        assert_eq!(spec.scanline_bytes(false), 800);
        assert_eq!(spec.image_pixels(), 5000);
        assert_eq!(spec.image_bytes(false), 40000);
        assert!(spec.size_t_safe());
    }

    #[test]
    fn test_native_byte_sizes() {
        let mut spec = ImageSpec::from_dimensions(10, 10, 3, DataFormat::F32);
        spec.channelformats = vec![DataFormat::F16, DataFormat::F16, DataFormat::U8];
        assert_eq!(spec.pixel_bytes(false), 12);
        assert_eq!(spec.pixel_bytes(true), 5);
        assert_eq!(spec.channel_bytes_for(2, true), 1);
        assert_eq!(spec.channel_bytes_for(2, false), 4);
        assert_eq!(spec.channel_bytes_for(3, true), 0);
    }

    #[test]
    fn test_overflow_saturates() {
        let mut spec = ImageSpec::from_dimensions(i32::MAX, i32::MAX, 4, DataFormat::F32);
        spec.depth = i32::MAX;
        assert_eq!(spec.image_bytes(false), usize::MAX);
        assert!(!spec.size_t_safe());
    }

    #[test]
    fn test_channel_accessors_bounds_safe() {
        let mut spec = ImageSpec::from_dimensions(8, 8, 3, DataFormat::U8);
        spec.channelformats = vec![DataFormat::U16];
        assert_eq!(spec.channelformat(0), DataFormat::U16);
        assert_eq!(spec.channelformat(1), DataFormat::U8); // fallback
        assert_eq!(spec.channelformat(-1), DataFormat::U8);
        assert_eq!(spec.channel_name(0), "R");
        assert_eq!(spec.channel_name(7), "");
        assert_eq!(spec.channel_name(-1), "");
    }

    #[test]
    fn test_roi_round_trip() {
        let mut spec = ImageSpec::from_dimensions(640, 480, 3, DataFormat::U8);
        let roi = Roi::new(10, 110, 20, 70, 0, 1, 0, 3);
        spec.set_roi(&roi);
        assert_eq!(spec.x, 10);
        assert_eq!(spec.width, 100);
        assert_eq!(spec.roi(), roi);
        // set_roi leaves channels and display window alone
        assert_eq!(spec.nchannels, 3);
        assert_eq!(spec.full_width, 640);

        spec.set_roi_full(&roi);
        assert_eq!(spec.roi_full(), roi);
    }

    #[test]
    fn test_valid_tile_range() {
        let mut spec = ImageSpec::from_dimensions(20, 16, 3, DataFormat::U8);
        spec.tile_width = 16;
        spec.tile_height = 16;
        spec.tile_depth = 1;
        assert!(spec.valid_tile_range(0, 16, 0, 16, 0, 1)); // full tile
        assert!(spec.valid_tile_range(16, 20, 0, 16, 0, 1)); // trailing partial tile
        assert!(!spec.valid_tile_range(4, 20, 0, 16, 0, 1)); // unaligned begin

        let untiled = ImageSpec::from_dimensions(20, 16, 3, DataFormat::U8);
        assert!(!untiled.valid_tile_range(0, 16, 0, 16, 0, 1));
    }

    #[test]
    fn test_attribute_replace_preserves_position() {
        let mut spec = ImageSpec::new(DataFormat::U8);
        spec.attribute("first", 1);
        spec.attribute("second", 2);
        spec.attribute("first", 10);
        assert_eq!(spec.extra_attribs.len(), 2);
        assert_eq!(spec.extra_attribs[0].name, "first");
        assert_eq!(spec.extra_attribs[0].value, AttrValue::Int(10));
    }

    #[test]
    fn test_find_attribute_case_sensitivity() {
        let mut spec = ImageSpec::new(DataFormat::U8);
        spec.attribute("temp", 42.0f32);
        let found = spec.find_attribute("temp", AttrKind::Float, true);
        assert_eq!(found.map(|p| &p.value), Some(&AttrValue::Float(42.0)));
        assert!(spec.find_attribute("TEMP", AttrKind::Float, true).is_none());
        assert!(spec.find_attribute("TEMP", AttrKind::Float, false).is_some());
        // Type filter rejects mismatches; Unknown is the wildcard.
        assert!(spec.find_attribute("temp", AttrKind::Int, true).is_none());
        assert!(spec.find_attribute("temp", AttrKind::Unknown, true).is_some());
    }

    #[test]
    fn test_erase_attribute_regex() {
        let mut spec = ImageSpec::new(DataFormat::U8);
        spec.attribute("IPTC:City", "Berlin");
        spec.attribute("IPTC:State", "BE");
        spec.attribute("Make", "CameraCo");
        spec.erase_attribute("IPTC:.*", AttrKind::Unknown, true);
        assert_eq!(spec.extra_attribs.len(), 1);
        assert_eq!(spec.extra_attribs[0].name, "Make");
    }

    #[test]
    fn test_erase_attribute_type_filter_and_bad_pattern() {
        let mut spec = ImageSpec::new(DataFormat::U8);
        spec.attribute("a", 1);
        spec.attribute("b", 2.0f32);
        spec.erase_attribute(".*", AttrKind::Float, true);
        assert_eq!(spec.extra_attribs.len(), 1);
        assert_eq!(spec.extra_attribs[0].name, "a");
        // Invalid regex degrades to a no-op, never an error.
        spec.erase_attribute("(((", AttrKind::Unknown, true);
        assert_eq!(spec.extra_attribs.len(), 1);
    }

    #[test]
    fn test_get_attribute_coercion() {
        let mut spec = ImageSpec::new(DataFormat::U8);
        spec.attribute("count", "17");
        spec.attribute("ratio", 2.75f32);
        spec.attribute("label", "wide");
        assert_eq!(spec.get_int_attribute("count", 0), 17);
        assert_eq!(spec.get_int_attribute("ratio", 0), 2);
        assert_eq!(spec.get_int_attribute("label", -1), -1);
        assert_eq!(spec.get_float_attribute("count", 0.0), 17.0);
        assert_eq!(spec.get_string_attribute("missing", "dflt"), "dflt");
        assert_eq!(spec.get_string_attribute("ratio", ""), "2.75");
    }

    #[test]
    fn test_virtual_attributes() {
        let spec = ImageSpec::from_dimensions(640, 480, 3, DataFormat::U8);
        assert_eq!(spec.get_int_attribute("width", 0), 640);
        assert_eq!(spec.get_int_attribute("nchannels", 0), 3);
        assert_eq!(
            spec.getattribute("datawindow", AttrKind::Unknown, false),
            Some(AttrValue::IntList(vec![0, 0, 639, 479]))
        );
        assert_eq!(
            spec.getattribute("format", AttrKind::Str, false),
            Some(AttrValue::Str("u8".to_string()))
        );
        // Real attributes shadow virtual ones.
        let mut spec = spec;
        spec.attribute("width", 99);
        assert_eq!(spec.get_int_attribute("width", 0), 99);
    }

    #[test]
    fn test_copy_dimensions_excludes_metadata() {
        let mut src = ImageSpec::from_dimensions(320, 240, 4, DataFormat::F16);
        src.tile_width = 32;
        src.tile_height = 32;
        src.tile_depth = 1;
        src.attribute("Software", "openimg");

        let mut dst = ImageSpec::new(DataFormat::Unknown);
        dst.copy_dimensions(&src);
        assert_eq!(dst.width, 320);
        assert_eq!(dst.nchannels, 4);
        assert_eq!(dst.tile_width, 32);
        assert_eq!(dst.format, DataFormat::F16);
        assert!(dst.extra_attribs.is_empty());
        assert!(dst.channelnames.is_empty());
    }
}
