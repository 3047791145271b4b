use num_enum::{FromPrimitive, IntoPrimitive};

/// Available compression algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.3>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CompressionAlgorithm {
    Uncompressed = 0,
    /// RFC 1951 raw deflate
    Zip = 1,
    /// RFC 1950
    Zlib = 2,
    Bzip2 = 3,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        Self::Uncompressed
    }
}
