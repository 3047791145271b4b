use std::fmt;
use std::io;

use bytes::{Buf, Bytes};

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};
use crate::util::read_string_lossy;

/// User ID Packet. Conventionally an RFC 2822 mailbox, but any bytes occur
/// in the wild.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.11>
#[derive(Clone, PartialEq, Eq)]
pub struct UserId {
    packet_version: PacketHeaderVersion,
    id: Bytes,
}

impl UserId {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        Ok(UserId {
            packet_version,
            id: i.rest(),
        })
    }

    pub fn from_string(id: &str) -> Self {
        UserId {
            packet_version: Default::default(),
            id: Bytes::copy_from_slice(id.as_bytes()),
        }
    }

    pub fn id(&self) -> &[u8] {
        &self.id
    }

    pub fn as_str_lossy(&self) -> String {
        read_string_lossy(&self.id)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({:?})", self.as_str_lossy())
    }
}

impl Serialize for UserId {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.id)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.id.len()
    }
}

impl PacketTrait for UserId {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::UserId
    }
}
