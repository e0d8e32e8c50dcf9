//! Format capability flags.
//!
//! Each format handler advertises what it can do; generic code queries the
//! flags instead of special-casing format names. A reader that asks for
//! tiles from a format without [`Capability::Tiles`] gets a clean
//! `UnsupportedFeature` error rather than undefined behavior.

/// A feature a format handler may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Tiled storage and tile-addressed reads/writes.
    Tiles,
    /// Multiple subimages in one file.
    MultiImage,
    /// MIP-mapped resolution pyramids.
    MipMap,
    /// Appending subimages one at a time while writing.
    AppendSubimage,
    /// Rewriting previously written pixels (arbitrary write order).
    RandomAccess,
    /// Per-pixel variable sample counts (deep data).
    DeepData,
    /// Reading/writing through a caller-supplied I/O proxy.
    IoProxy,
    /// A different data format for each channel.
    PerChannelFormats,
    /// Arbitrary named metadata round-trips through the file.
    ArbitraryMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_set_queries() {
        let caps: &[Capability] = &[Capability::Tiles, Capability::MipMap];
        assert!(caps.contains(&Capability::Tiles));
        assert!(!caps.contains(&Capability::DeepData));
    }
}
