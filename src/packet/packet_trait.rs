use std::io;

use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// Behavior shared by all packet bodies.
///
/// `Serialize` covers the body alone; `to_writer_with_header` frames it with
/// the header the packet was parsed with (or a new style header for locally
/// constructed packets).
pub trait PacketTrait: Serialize {
    fn packet_version(&self) -> PacketHeaderVersion;
    fn tag(&self) -> Tag;

    fn to_writer_with_header<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        self.packet_version()
            .write_header(writer, self.tag(), self.write_len())?;
        self.to_writer(writer)
    }

    /// Total serialized size, header included.
    fn write_len_with_header(&self) -> usize {
        self.packet_version().header_len(self.write_len()) + self.write_len()
    }
}
