use std::fmt;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};
use crate::util::normalize_lines;

/// Literal Data Packet.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.9>
#[derive(Clone, PartialEq, Eq)]
pub struct LiteralData {
    packet_version: PacketHeaderVersion,
    mode: DataMode,
    /// The filename, may contain non utf-8 bytes
    file_name: Bytes,
    created: DateTime<Utc>,
    /// Text data is stored normalized to CRLF line endings, which makes
    /// signing and verification line-ending agnostic.
    data: Bytes,
}

#[derive(Debug, Copy, Clone, FromPrimitive, IntoPrimitive, PartialEq, Eq)]
#[repr(u8)]
pub enum DataMode {
    Binary = b'b',
    Text = b't',
    Utf8 = b'u',

    #[num_enum(catch_all)]
    Other(u8),
}

impl LiteralData {
    /// Creates a literal data packet from the given string, normalizing line
    /// endings.
    pub fn from_str(file_name: impl Into<Bytes>, raw: &str) -> Self {
        LiteralData {
            packet_version: Default::default(),
            mode: DataMode::Utf8,
            file_name: file_name.into(),
            created: Utc::now().trunc_subsecs(0),
            data: normalize_lines(raw.as_bytes()).into(),
        }
    }

    /// Creates a binary literal data packet.
    pub fn from_bytes(file_name: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        LiteralData {
            packet_version: Default::default(),
            mode: DataMode::Binary,
            file_name: file_name.into(),
            created: Utc::now().trunc_subsecs(0),
            data: data.into(),
        }
    }

    /// Parses a `LiteralData` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let mode = DataMode::from(i.read_u8()?);

        let name_len = i.read_u8()?;
        let file_name = i.read_take(name_len.into())?;

        let created = i.read_be_u32()?;
        let created = Utc
            .timestamp_opt(created.into(), 0)
            .single()
            .ok_or_else(|| format_err!("invalid creation time"))?;

        Ok(LiteralData {
            packet_version,
            mode,
            file_name,
            created,
            data: i.rest(),
        })
    }

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.mode, DataMode::Binary)
    }

    pub fn file_name(&self) -> &Bytes {
        &self.file_name
    }

    pub fn created(&self) -> &DateTime<Utc> {
        &self.created
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// The data as a string, if the mode is textual and the bytes valid
    /// utf-8.
    pub fn to_string(&self) -> Option<String> {
        match self.mode {
            DataMode::Binary => None,
            _ => std::str::from_utf8(&self.data).map(str::to_owned).ok(),
        }
    }
}

impl fmt::Debug for LiteralData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiteralData")
            .field("mode", &self.mode)
            .field("file_name", &self.file_name)
            .field("created", &self.created)
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

impl Serialize for LiteralData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.mode.into())?;
        writer.write_u8(self.file_name.len().try_into()?)?;
        writer.write_all(&self.file_name)?;
        writer.write_u32::<BigEndian>(self.created.timestamp().try_into()?)?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + 1 + self.file_name.len() + 4 + self.data.len()
    }
}

impl PacketTrait for LiteralData {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::LiteralData
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let literal = LiteralData::from_bytes(&b"file.bin"[..], &b"\x00\x01\x02"[..]);
        let buf = literal.to_bytes().unwrap();
        assert_eq!(buf.len(), literal.write_len());

        let back = LiteralData::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(literal, back);
    }

    #[test]
    fn test_text_normalization() {
        let literal = LiteralData::from_str("", "one\ntwo\r\nthree");
        assert_eq!(literal.data(), b"one\r\ntwo\r\nthree");
        assert_eq!(literal.to_string().unwrap(), "one\r\ntwo\r\nthree");
    }
}
