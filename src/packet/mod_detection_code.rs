use std::io;

use bytes::Buf;

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// Modification Detection Code Packet: the 20 octet SHA-1 trailing an SEIPD
/// v1 plaintext. Only ever occurs inside one, never standalone on the wire.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.14>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDetectionCode {
    packet_version: PacketHeaderVersion,
    hash: [u8; 20],
}

impl ModDetectionCode {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let hash = i.read_array::<20>()?;
        Ok(ModDetectionCode {
            packet_version,
            hash,
        })
    }

    pub fn hash(&self) -> &[u8; 20] {
        &self.hash
    }
}

impl Serialize for ModDetectionCode {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.hash)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        20
    }
}

impl PacketTrait for ModDetectionCode {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::ModDetectionCode
    }
}
