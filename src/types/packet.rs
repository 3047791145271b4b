use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

use crate::errors::Result;
use crate::parsing::BufParsing;

/// Represents the length portion of a packet header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PacketLength {
    Fixed(u32),
    /// Old format only: the packet runs until the end of the input.
    Indeterminate,
    /// New format only: one part of a chained partial body length. Always a
    /// power of two between 1 and 2^30.
    Partial(u32),
}

impl PacketLength {
    pub fn try_from_buf<B: Buf>(i: &mut B) -> Result<Self> {
        let olen = i.read_u8()?;
        let len = match olen {
            // One-Octet Lengths
            0..=191 => PacketLength::Fixed(olen.into()),
            // Two-Octet Lengths
            192..=223 => {
                let a = i.read_u8()?;
                PacketLength::Fixed(((olen as u32 - 192) << 8) + 192 + a as u32)
            }
            // Partial Body Lengths
            224..=254 => PacketLength::Partial(1 << (olen as u32 & 0x1F)),
            // Five-Octet Lengths
            255 => PacketLength::Fixed(i.read_be_u32()?),
        };
        Ok(len)
    }

    /// Returns the length in bytes, if known.
    pub fn maybe_len(&self) -> Option<u32> {
        match self {
            Self::Fixed(len) | Self::Partial(len) => Some(*len),
            Self::Indeterminate => None,
        }
    }
}

/// Packet tag, the type id inside a packet header.
///
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-4.3>
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(u8)]
#[non_exhaustive]
pub enum Tag {
    /// Public-Key Encrypted Session Key Packet
    PublicKeyEncryptedSessionKey = 1,
    /// Signature Packet
    Signature = 2,
    /// Symmetric-Key Encrypted Session Key Packet
    SymKeyEncryptedSessionKey = 3,
    /// One-Pass Signature Packet
    OnePassSignature = 4,
    /// Secret-Key Packet
    SecretKey = 5,
    /// Public-Key Packet
    PublicKey = 6,
    /// Secret-Subkey Packet
    SecretSubkey = 7,
    /// Compressed Data Packet
    CompressedData = 8,
    /// Symmetrically Encrypted Data Packet
    SymEncryptedData = 9,
    /// Marker Packet
    Marker = 10,
    /// Literal Data Packet
    LiteralData = 11,
    /// Trust Packet
    Trust = 12,
    /// User ID Packet
    UserId = 13,
    /// Public-Subkey Packet
    PublicSubkey = 14,
    /// User Attribute Packet
    UserAttribute = 17,
    /// Sym. Encrypted and Integrity Protected Data Packet
    SymEncryptedProtectedData = 18,
    /// Modification Detection Code Packet
    ModDetectionCode = 19,
    /// AEAD Encrypted Data Packet (4880bis draft)
    AeadEncryptedData = 20,

    /// Unassigned ids the spec marks critical: parsing one is an error.
    Critical(u8),
    /// Unassigned non-critical ids: skipped on parse.
    NonCritical(u8),
    /// Private or Experimental Use [60-63]
    Experimental(u8),
    /// Catchall for the illegal type ids 0, 15 and 16
    Other(u8),
}

impl From<u8> for Tag {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::PublicKeyEncryptedSessionKey,
            2 => Self::Signature,
            3 => Self::SymKeyEncryptedSessionKey,
            4 => Self::OnePassSignature,
            5 => Self::SecretKey,
            6 => Self::PublicKey,
            7 => Self::SecretSubkey,
            8 => Self::CompressedData,
            9 => Self::SymEncryptedData,
            10 => Self::Marker,
            11 => Self::LiteralData,
            12 => Self::Trust,
            13 => Self::UserId,
            14 => Self::PublicSubkey,
            17 => Self::UserAttribute,
            18 => Self::SymEncryptedProtectedData,
            19 => Self::ModDetectionCode,
            20 => Self::AeadEncryptedData,
            21..=39 => Self::Critical(value),
            40..=59 => Self::NonCritical(value),
            60..=63 => Self::Experimental(value),
            o => Self::Other(o),
        }
    }
}

impl From<Tag> for u8 {
    fn from(value: Tag) -> Self {
        match value {
            Tag::PublicKeyEncryptedSessionKey => 1,
            Tag::Signature => 2,
            Tag::SymKeyEncryptedSessionKey => 3,
            Tag::OnePassSignature => 4,
            Tag::SecretKey => 5,
            Tag::PublicKey => 6,
            Tag::SecretSubkey => 7,
            Tag::CompressedData => 8,
            Tag::SymEncryptedData => 9,
            Tag::Marker => 10,
            Tag::LiteralData => 11,
            Tag::Trust => 12,
            Tag::UserId => 13,
            Tag::PublicSubkey => 14,
            Tag::UserAttribute => 17,
            Tag::SymEncryptedProtectedData => 18,
            Tag::ModDetectionCode => 19,
            Tag::AeadEncryptedData => 20,
            Tag::Critical(id) | Tag::NonCritical(id) | Tag::Experimental(id) | Tag::Other(id) => id,
        }
    }
}

impl Tag {
    /// Is this packet tag allowed to use partial body lengths?
    ///
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-4.2.2.4>
    pub fn allows_partial_length(self) -> bool {
        matches!(
            self,
            Tag::LiteralData
                | Tag::CompressedData
                | Tag::SymEncryptedData
                | Tag::SymEncryptedProtectedData
                | Tag::AeadEncryptedData
        )
    }
}

/// The version of the packet header format.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, Default)]
#[repr(u8)]
pub enum PacketHeaderVersion {
    /// Old (legacy) format, tags 0-15 only
    Old = 0,
    /// New format
    #[default]
    New = 1,
}

impl PacketHeaderVersion {
    /// Writes a complete header (tag octet plus fixed length field).
    pub fn write_header(self, writer: &mut impl io::Write, tag: Tag, len: usize) -> Result<()> {
        let tag: u8 = tag.into();
        match self {
            PacketHeaderVersion::Old => {
                ensure!(tag < 16, "tag {} not encodable in an old style header", tag);
                if len < 256 {
                    writer.write_u8(0b1000_0000 | (tag << 2))?;
                    writer.write_u8(len as u8)?;
                } else if len < 65536 {
                    writer.write_u8(0b1000_0001 | (tag << 2))?;
                    writer.write_u16::<BigEndian>(len as u16)?;
                } else {
                    writer.write_u8(0b1000_0010 | (tag << 2))?;
                    writer.write_u32::<BigEndian>(len.try_into()?)?;
                }
            }
            PacketHeaderVersion::New => {
                writer.write_u8(0b1100_0000 | tag)?;
                if len < 192 {
                    writer.write_u8(len as u8)?;
                } else if len < 8384 {
                    writer.write_u8((((len - 192) >> 8) + 192) as u8)?;
                    writer.write_u8(((len - 192) & 0xFF) as u8)?;
                } else {
                    writer.write_u8(255)?;
                    writer.write_u32::<BigEndian>(len.try_into()?)?;
                }
            }
        }

        Ok(())
    }

    /// Length of the header in bytes, for a fixed body length.
    pub fn header_len(self, len: usize) -> usize {
        match self {
            PacketHeaderVersion::Old => {
                if len < 256 {
                    2
                } else if len < 65536 {
                    3
                } else {
                    5
                }
            }
            PacketHeaderVersion::New => {
                if len < 192 {
                    2
                } else if len < 8384 {
                    3
                } else {
                    6
                }
            }
        }
    }
}

/// Key packet versions.
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum KeyVersion {
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for KeyVersion {
    fn default() -> Self {
        Self::V4
    }
}

impl KeyVersion {
    /// Size of the fingerprint in bytes (None for unknown versions).
    pub const fn fingerprint_len(&self) -> Option<usize> {
        match self {
            KeyVersion::V2 | KeyVersion::V3 => Some(16), // MD5
            KeyVersion::V4 => Some(20),                  // SHA1
            KeyVersion::V5 => Some(32),                  // SHA256
            KeyVersion::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_header() {
        let mut buf = Vec::new();
        PacketHeaderVersion::New
            .write_header(&mut buf, Tag::UserAttribute, 12875)
            .unwrap();
        assert_eq!(hex::encode(&buf), "d1ff0000324b");

        let mut buf = Vec::new();
        PacketHeaderVersion::New
            .write_header(&mut buf, Tag::Signature, 302)
            .unwrap();
        assert_eq!(hex::encode(&buf), "c2c06e");

        let mut buf = Vec::new();
        PacketHeaderVersion::Old
            .write_header(&mut buf, Tag::Signature, 7)
            .unwrap();
        assert_eq!(hex::encode(&buf), "8807");
    }

    #[test]
    fn test_header_len() {
        for (version, len) in [
            (PacketHeaderVersion::New, 7usize),
            (PacketHeaderVersion::New, 300),
            (PacketHeaderVersion::New, 70_000),
            (PacketHeaderVersion::Old, 7),
            (PacketHeaderVersion::Old, 300),
            (PacketHeaderVersion::Old, 70_000),
        ] {
            let mut buf = Vec::new();
            version.write_header(&mut buf, Tag::Signature, len).unwrap();
            assert_eq!(buf.len(), version.header_len(len));
        }
    }

    #[test]
    fn test_tag_ids_stable() {
        for id in 1u8..=20 {
            if id == 15 || id == 16 {
                continue;
            }
            assert_eq!(u8::from(Tag::from(id)), id);
        }
    }
}
