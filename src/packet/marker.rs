use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// Marker Packet, must be ignored.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.8>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    packet_version: PacketHeaderVersion,
}

impl Marker {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        i.read_tag(b"PGP")?;
        Ok(Marker { packet_version })
    }
}

impl Serialize for Marker {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(b"PGP")?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        3
    }
}

impl PacketTrait for Marker {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::Marker
    }
}
