use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};
use crate::util::{packet_length_len, read_packet_length, write_packet_length};

/// User Attribute Packet: a list of self-delimiting subpackets, in practice
/// almost always a single JPEG image.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.12>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAttribute {
    packet_version: PacketHeaderVersion,
    subpackets: Vec<UserAttributeSubpacket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAttributeSubpacket {
    pub typ: u8,
    pub data: Bytes,
}

impl UserAttribute {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let mut subpackets = Vec::new();
        while i.has_remaining() {
            let len = read_packet_length(&mut i)?;
            ensure!(len > 0, "empty user attribute subpacket");
            let typ = i.read_u8()?;
            let data = i.read_take(len - 1)?;
            subpackets.push(UserAttributeSubpacket { typ, data });
        }

        Ok(UserAttribute {
            packet_version,
            subpackets,
        })
    }

    pub fn subpackets(&self) -> &[UserAttributeSubpacket] {
        &self.subpackets
    }
}

impl Serialize for UserAttribute {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        for sp in &self.subpackets {
            write_packet_length(1 + sp.data.len(), writer)?;
            writer.write_all(&[sp.typ])?;
            writer.write_all(&sp.data)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.subpackets
            .iter()
            .map(|sp| packet_length_len(1 + sp.data.len()) + 1 + sp.data.len())
            .sum()
    }
}

impl PacketTrait for UserAttribute {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::UserAttribute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let raw = {
            let mut buf = Vec::new();
            // type 1 (image), tiny fake body
            write_packet_length(1 + 4, &mut buf).unwrap();
            buf.push(1);
            buf.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);
            buf
        };

        let attr = UserAttribute::from_buf(Default::default(), &raw[..]).unwrap();
        assert_eq!(attr.subpackets().len(), 1);
        assert_eq!(attr.subpackets()[0].typ, 1);
        assert_eq!(attr.to_bytes().unwrap(), raw);
        assert_eq!(attr.write_len(), raw.len());
    }
}
