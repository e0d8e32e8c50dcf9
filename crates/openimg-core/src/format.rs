//! Pixel data formats.
//!
//! [`DataFormat`] names the storage type of one channel sample. Every
//! [`ImageSpec`](crate::ImageSpec) carries one blanket format plus optional
//! per-channel overrides, and every read/write call names the format of the
//! caller's buffer.
//!
//! # The `Unknown` sentinel
//!
//! `DataFormat::Unknown` does double duty across the I/O contract:
//!
//! - In a spec returned by a reader it means "no such subimage / nothing
//!   opened yet".
//! - As the requested format of a read or write call it means "no
//!   conversion, give me (or take) the file's native bytes".
//!
//! # Example
//!
//! ```rust
//! use openimg_core::DataFormat;
//!
//! assert_eq!(DataFormat::U16.size(), 2);
//! assert!(DataFormat::F16.is_float());
//! assert_eq!(DataFormat::from_name("f32"), Some(DataFormat::F32));
//! ```

/// Storage type of a single channel sample.
///
/// Unlike a full type-description system this only covers the byte-aligned
/// scalar types that image files actually store per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    /// Not yet determined / sentinel (see module docs).
    #[default]
    Unknown,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    F32,
}

impl DataFormat {
    /// Size of one sample in bytes. Returns 0 for `Unknown`.
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    /// Number of bits per sample. Returns 0 for `Unknown`.
    #[inline]
    pub const fn bits(&self) -> u32 {
        (self.size() * 8) as u32
    }

    /// Whether this is a floating-point format.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Whether this is an integer format (false for `Unknown`).
    #[inline]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32)
    }

    /// Whether this is the `Unknown` sentinel.
    #[inline]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Maximum representable value for integer formats, as f32.
    ///
    /// Used as the normalization scale when converting to/from float.
    /// Returns 1.0 for float formats and `Unknown`.
    #[inline]
    pub const fn max_value(&self) -> f32 {
        match self {
            Self::U8 => 255.0,
            Self::U16 => 65535.0,
            Self::U32 => 4294967295.0,
            _ => 1.0,
        }
    }

    /// Short lowercase name for display and serialization.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::F16 => "f16",
            Self::F32 => "f32",
        }
    }

    /// Parses a format from its short name. Inverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unknown" => Some(Self::Unknown),
            "u8" | "uint8" => Some(Self::U8),
            "u16" | "uint16" => Some(Self::U16),
            "u32" | "uint32" => Some(Self::U32),
            "f16" | "half" => Some(Self::F16),
            "f32" | "float" => Some(Self::F32),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
