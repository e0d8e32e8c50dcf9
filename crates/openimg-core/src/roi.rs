//! Region of Interest over pixel and channel space.
//!
//! [`Roi`] describes a half-open rectangular range over (x, y, z, channel).
//! It is the unit of addressing for partial reads and writes and for
//! expressing data/display windows.
//!
//! # Coordinate Convention
//!
//! All ranges are half-open intervals: [begin, end) - the begin is included,
//! the end is excluded.
//!
//! # The undefined ROI
//!
//! `Roi::all()` marks an ROI as "undefined", meaning "the entire image, no
//! restriction" (sentinel: `xbegin == i32::MIN`). Undefined is the identity
//! for **both** union and intersection: intersecting with "no restriction"
//! yields the other operand unchanged, it does not produce an empty region.
//!
//! # Example
//!
//! ```rust
//! use openimg_core::Roi;
//!
//! let roi = Roi::new(100, 200, 50, 150, 0, 1, 0, 4);
//! assert_eq!(roi.width(), 100);
//! assert_eq!(roi.height(), 100);
//! assert!(roi.contains(150, 100, 0, 3));
//! ```

/// Half-open region over (x, y, z, channel) space.
///
/// A pure value type: freely copied, no ownership semantics, and every
/// operation is a total function over integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Roi {
    /// X begin (inclusive). `i32::MIN` marks the whole ROI as undefined.
    pub xbegin: i32,
    /// X end (exclusive).
    pub xend: i32,
    /// Y begin (inclusive).
    pub ybegin: i32,
    /// Y end (exclusive).
    pub yend: i32,
    /// Z begin (inclusive, for volumetric images).
    pub zbegin: i32,
    /// Z end (exclusive).
    pub zend: i32,
    /// Channel begin (inclusive).
    pub chbegin: i32,
    /// Channel end (exclusive).
    pub chend: i32,
}

impl Default for Roi {
    fn default() -> Self {
        Self::all()
    }
}

impl Roi {
    /// Creates an ROI with all bounds specified.
    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
        chbegin: i32,
        chend: i32,
    ) -> Self {
        Self {
            xbegin,
            xend,
            ybegin,
            yend,
            zbegin,
            zend,
            chbegin,
            chend,
        }
    }

    /// Creates a 2D ROI (z = [0,1)) with the given channel range.
    #[inline]
    pub const fn new_2d(xbegin: i32, xend: i32, ybegin: i32, yend: i32, chbegin: i32, chend: i32) -> Self {
        Self::new(xbegin, xend, ybegin, yend, 0, 1, chbegin, chend)
    }

    /// The undefined ROI: "entire image, no restriction".
    #[inline]
    pub const fn all() -> Self {
        Self {
            xbegin: i32::MIN,
            xend: i32::MAX,
            ybegin: i32::MIN,
            yend: i32::MAX,
            zbegin: i32::MIN,
            zend: i32::MAX,
            chbegin: 0,
            chend: i32::MAX,
        }
    }

    /// Whether this ROI has concrete bounds.
    #[inline]
    pub const fn defined(&self) -> bool {
        self.xbegin != i32::MIN
    }

    /// Width of the ROI (xend - xbegin).
    #[inline]
    pub const fn width(&self) -> i32 {
        self.xend - self.xbegin
    }

    /// Height of the ROI (yend - ybegin).
    #[inline]
    pub const fn height(&self) -> i32 {
        self.yend - self.ybegin
    }

    /// Depth of the ROI (zend - zbegin).
    #[inline]
    pub const fn depth(&self) -> i32 {
        self.zend - self.zbegin
    }

    /// Number of channels in the ROI.
    #[inline]
    pub const fn nchannels(&self) -> i32 {
        self.chend - self.chbegin
    }

    /// Total number of pixels (width * height * depth).
    ///
    /// Returns 0 for an undefined ROI.
    #[inline]
    pub fn npixels(&self) -> u64 {
        if !self.defined() {
            return 0;
        }
        (self.width().max(0) as u64)
            * (self.height().max(0) as u64)
            * (self.depth().max(0) as u64)
    }

    /// Whether the point (x, y, z) with channel ch lies inside this ROI.
    #[inline]
    pub const fn contains(&self, x: i32, y: i32, z: i32, ch: i32) -> bool {
        x >= self.xbegin
            && x < self.xend
            && y >= self.ybegin
            && y < self.yend
            && z >= self.zbegin
            && z < self.zend
            && ch >= self.chbegin
            && ch < self.chend
    }

    /// Whether this ROI fully contains `other`.
    #[inline]
    pub const fn contains_roi(&self, other: &Roi) -> bool {
        other.xbegin >= self.xbegin
            && other.xend <= self.xend
            && other.ybegin >= self.ybegin
            && other.yend <= self.yend
            && other.zbegin >= self.zbegin
            && other.zend <= self.zend
            && other.chbegin >= self.chbegin
            && other.chend <= self.chend
    }

    /// The smallest ROI containing both operands.
    ///
    /// An undefined operand is the identity: `union(all, b) == b`.
    pub fn union(&self, other: &Roi) -> Roi {
        match (self.defined(), other.defined()) {
            (true, true) => Roi {
                xbegin: self.xbegin.min(other.xbegin),
                xend: self.xend.max(other.xend),
                ybegin: self.ybegin.min(other.ybegin),
                yend: self.yend.max(other.yend),
                zbegin: self.zbegin.min(other.zbegin),
                zend: self.zend.max(other.zend),
                chbegin: self.chbegin.min(other.chbegin),
                chend: self.chend.max(other.chend),
            },
            (true, false) => *self,
            _ => *other,
        }
    }

    /// The intersection of both operands.
    ///
    /// An undefined operand means "no restriction" and is the identity:
    /// `intersection(all, b) == b`, never the empty region.
    pub fn intersection(&self, other: &Roi) -> Roi {
        match (self.defined(), other.defined()) {
            (true, true) => Roi {
                xbegin: self.xbegin.max(other.xbegin),
                xend: self.xend.min(other.xend),
                ybegin: self.ybegin.max(other.ybegin),
                yend: self.yend.min(other.yend),
                zbegin: self.zbegin.max(other.zbegin),
                zend: self.zend.min(other.zend),
                chbegin: self.chbegin.max(other.chbegin),
                chend: self.chend.min(other.chend),
            },
            (true, false) => *self,
            _ => *other,
        }
    }
}

/// Computes the union of two ROIs. See [`Roi::union`].
#[inline]
pub fn roi_union(a: &Roi, b: &Roi) -> Roi {
    a.union(b)
}

/// Computes the intersection of two ROIs. See [`Roi::intersection`].
#[inline]
pub fn roi_intersection(a: &Roi, b: &Roi) -> Roi {
    a.intersection(b)
}

impl std::fmt::Display for Roi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.defined() {
            write!(f, "Roi::All")
        } else {
            write!(
                f,
                "Roi([{},{}), [{},{}), [{},{}), ch[{},{}))",
                self.xbegin,
                self.xend,
                self.ybegin,
                self.yend,
                self.zbegin,
                self.zend,
                self.chbegin,
                self.chend
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_queries() {
        let roi = Roi::new(0, 10, 0, 5, 0, 1, 0, 3);
        assert_eq!(roi.width(), 10);
        assert_eq!(roi.height(), 5);
        assert_eq!(roi.depth(), 1);
        assert_eq!(roi.nchannels(), 3);
        assert_eq!(roi.npixels(), 50);
    }

    #[test]
    fn test_undefined() {
        let roi = Roi::all();
        assert!(!roi.defined());
        assert_eq!(roi.npixels(), 0);
        assert!(Roi::new(0, 1, 0, 1, 0, 1, 0, 1).defined());
    }

    #[test]
    fn test_contains_point() {
        let roi = Roi::new(100, 200, 50, 150, 0, 1, 0, 4);
        assert!(roi.contains(100, 50, 0, 0));
        assert!(roi.contains(199, 149, 0, 3));
        assert!(!roi.contains(200, 50, 0, 0)); // end exclusive
        assert!(!roi.contains(150, 100, 0, 4)); // channel end exclusive
        assert!(!roi.contains(99, 50, 0, 0));
    }

    #[test]
    fn test_containment_reflexive() {
        let roi = Roi::new(3, 17, -5, 9, 0, 2, 1, 4);
        assert!(roi.contains_roi(&roi));
    }

    #[test]
    fn test_contains_roi() {
        let outer = Roi::new(0, 100, 0, 100, 0, 1, 0, 4);
        let inner = Roi::new(10, 90, 10, 90, 0, 1, 1, 3);
        assert!(outer.contains_roi(&inner));
        assert!(!inner.contains_roi(&outer));
    }

    #[test]
    fn test_union() {
        let a = Roi::new_2d(0, 100, 0, 100, 0, 3);
        let b = Roi::new_2d(50, 150, 50, 150, 0, 4);
        let u = a.union(&b);
        assert_eq!(u, Roi::new_2d(0, 150, 0, 150, 0, 4));
    }

    #[test]
    fn test_intersection() {
        let a = Roi::new_2d(0, 100, 0, 100, 0, 4);
        let b = Roi::new_2d(50, 150, 50, 150, 0, 3);
        let i = a.intersection(&b);
        assert_eq!(i, Roi::new_2d(50, 100, 50, 100, 0, 3));
    }

    #[test]
    fn test_undefined_is_identity_for_union_and_intersection() {
        let a = Roi::new_2d(5, 25, 5, 25, 0, 3);
        let all = Roi::all();
        assert_eq!(all.union(&a), a);
        assert_eq!(a.union(&all), a);
        // Intersecting with "no restriction" yields the other operand,
        // never the empty region.
        assert_eq!(all.intersection(&a), a);
        assert_eq!(a.intersection(&all), a);
        assert_eq!(all.union(&all), all);
    }

    #[test]
    fn test_display() {
        assert_eq!(Roi::all().to_string(), "Roi::All");
        let roi = Roi::new(0, 4, 1, 5, 0, 1, 0, 3);
        assert_eq!(roi.to_string(), "Roi([0,4), [1,5), [0,1), ch[0,3))");
    }
}
