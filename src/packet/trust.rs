use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// Trust Packet. Implementation defined, carried opaque.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.10>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trust {
    packet_version: PacketHeaderVersion,
    data: Bytes,
}

impl Trust {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        Ok(Trust {
            packet_version,
            data: i.rest(),
        })
    }
}

impl Serialize for Trust {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for Trust {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::Trust
    }
}
