//! Typed metadata attributes.
//!
//! Image files carry arbitrary named metadata ("Software", "IPTC:City",
//! "ExposureTime", ...). This module provides:
//!
//! - [`AttrValue`] - a typed metadata value
//! - [`AttrKind`] - the type tag, used as a search filter
//! - [`ParamValue`] - a named value, the entry type of
//!   [`ImageSpec::extra_attribs`](crate::ImageSpec)
//!
//! # Coercion
//!
//! Lookup helpers are forgiving: [`AttrValue::as_int`] truncates floats and
//! parses strings that are exactly one clean integer literal; anything else
//! fails softly with `None`. Setting is always exact-typed.
//!
//! # Example
//!
//! ```rust
//! use openimg_core::AttrValue;
//!
//! let v = AttrValue::Str("42".to_string());
//! assert_eq!(v.as_int(), Some(42));
//! assert_eq!(AttrValue::Float(2.9).as_int(), Some(2));
//! assert_eq!(AttrValue::Str("42 towels".to_string()).as_int(), None);
//! ```

/// Type tag for [`AttrValue`], usable as a search filter.
///
/// `Unknown` is the wildcard: a find or erase filtered by `Unknown`
/// matches attributes of every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttrKind {
    /// Wildcard: matches any type.
    #[default]
    Unknown,
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    Str,
    /// List of 32-bit signed integers.
    IntList,
    /// List of 32-bit floats.
    FloatList,
}

/// Typed metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Signed 32-bit integer. Used for counts, indices, flags.
    Int(i32),
    /// 32-bit float. Used for gamma, exposure, aspect ratios.
    Float(f32),
    /// 64-bit float. Used for high-precision values (GPS, timestamps).
    Double(f64),
    /// UTF-8 string. Used for names, color spaces, descriptions.
    Str(String),
    /// Integer list. Used for window corners, sizes.
    IntList(Vec<i32>),
    /// Float list. Used for matrices, chromaticities.
    FloatList(Vec<f32>),
}

impl AttrValue {
    /// The type tag of this value.
    pub const fn kind(&self) -> AttrKind {
        match self {
            Self::Int(_) => AttrKind::Int,
            Self::Float(_) => AttrKind::Float,
            Self::Double(_) => AttrKind::Double,
            Self::Str(_) => AttrKind::Str,
            Self::IntList(_) => AttrKind::IntList,
            Self::FloatList(_) => AttrKind::FloatList,
        }
    }

    /// Whether this value's type passes `filter`.
    ///
    /// `AttrKind::Unknown` is the wildcard and passes everything.
    #[inline]
    pub fn matches_kind(&self, filter: AttrKind) -> bool {
        filter == AttrKind::Unknown || self.kind() == filter
    }

    /// Best-effort conversion to an integer.
    ///
    /// Floats truncate toward zero; strings convert only when the entire
    /// text is one integer literal.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i32),
            Self::Double(v) => Some(*v as i32),
            Self::Str(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        }
    }

    /// Best-effort conversion to a float.
    ///
    /// Integers widen; strings convert only when the entire text is one
    /// float literal.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Int(v) => Some(*v as f32),
            Self::Float(v) => Some(*v),
            Self::Double(v) => Some(*v as f32),
            Self::Str(s) => s.trim().parse::<f32>().ok(),
            _ => None,
        }
    }

    /// Returns the string contents, for `Str` values only.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
            Self::IntList(v) => {
                let items: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "{}", items.join(", "))
            }
            Self::FloatList(v) => {
                let items: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "{}", items.join(", "))
            }
        }
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<i32>> for AttrValue {
    fn from(v: Vec<i32>) -> Self {
        Self::IntList(v)
    }
}

impl From<Vec<f32>> for AttrValue {
    fn from(v: Vec<f32>) -> Self {
        Self::FloatList(v)
    }
}

/// A named attribute: one entry of an ordered attribute list.
///
/// Insertion order is preserved by the containing `Vec`, which matters for
/// serialization; replacing a value keeps its position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue {
    /// Attribute name (e.g. "Software", "IPTC:City").
    pub name: String,
    /// Typed value.
    pub value: AttrValue,
}

impl ParamValue {
    /// Creates a named attribute.
    pub fn new(name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether `name` matches this attribute under the given case rule.
    #[inline]
    pub fn name_matches(&self, name: &str, casesensitive: bool) -> bool {
        if casesensitive {
            self.name == name
        } else {
            self.name.eq_ignore_ascii_case(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(AttrValue::Int(1).kind(), AttrKind::Int);
        assert_eq!(AttrValue::Str("x".into()).kind(), AttrKind::Str);
        assert!(AttrValue::Float(1.0).matches_kind(AttrKind::Unknown));
        assert!(AttrValue::Float(1.0).matches_kind(AttrKind::Float));
        assert!(!AttrValue::Float(1.0).matches_kind(AttrKind::Int));
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(AttrValue::Int(7).as_int(), Some(7));
        assert_eq!(AttrValue::Float(3.9).as_int(), Some(3));
        assert_eq!(AttrValue::Str("42".into()).as_int(), Some(42));
        assert_eq!(AttrValue::Str(" 42 ".into()).as_int(), Some(42));
        assert_eq!(AttrValue::Str("42x".into()).as_int(), None);
        assert_eq!(AttrValue::IntList(vec![1]).as_int(), None);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(AttrValue::Int(2).as_float(), Some(2.0));
        assert_eq!(AttrValue::Str("2.5".into()).as_float(), Some(2.5));
        assert_eq!(AttrValue::Str("fast".into()).as_float(), None);
    }

    #[test]
    fn test_name_matching() {
        let p = ParamValue::new("IPTC:City", "Berlin");
        assert!(p.name_matches("IPTC:City", true));
        assert!(!p.name_matches("iptc:city", true));
        assert!(p.name_matches("iptc:city", false));
    }

    #[test]
    fn test_display() {
        assert_eq!(AttrValue::IntList(vec![1, 2, 3]).to_string(), "1, 2, 3");
        assert_eq!(AttrValue::Str("hi".into()).to_string(), "hi");
    }
}
