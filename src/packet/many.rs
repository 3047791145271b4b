use std::io::{BufRead, Read};

use bytes::Bytes;
use log::{debug, warn};

use crate::errors::{Error, Result};
use crate::packet::body_reader::PacketBodyReader;
use crate::packet::packet_sum::Packet;
use crate::types::{PacketHeaderVersion, PacketLength, Tag};
use crate::MAX_BUFFER_SIZE;

/// How much a packet body is pulled per step when collecting into an owned
/// packet.
const READ_CHUNK: usize = 1024 * 8;

/// Streaming packet parser: pulls one packet at a time from a byte source.
///
/// Headers are parsed eagerly, bodies flow through [`PacketBodyReader`] —
/// the pull-based stream that splices partial body lengths back together.
/// The typed [`Packet`] values this iterator yields own their (bounded)
/// bodies; bulk payloads are decrypted/consumed through the streaming
/// readers the individual packet types expose. Unknown non-critical tags
/// are skipped with a warning, unknown critical tags produce an error.
pub struct PacketParser<R> {
    inner: R,
    failed: bool,
}

impl<R: BufRead> PacketParser<R> {
    pub fn new(inner: R) -> Self {
        PacketParser {
            inner,
            failed: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads a single octet, `None` on a clean EOF.
    fn read_u8_opt(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.read_u8_opt()?
            .ok_or_else(|| format_err!("unexpected end of input"))
    }

    fn read_be_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn read_be_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Reads a new format length field.
    fn read_new_length(&mut self) -> Result<PacketLength> {
        let olen = self.read_u8()?;
        let len = match olen {
            0..=191 => PacketLength::Fixed(olen.into()),
            192..=223 => {
                let a = self.read_u8()?;
                PacketLength::Fixed(((olen as u32 - 192) << 8) + 192 + a as u32)
            }
            224..=254 => PacketLength::Partial(1 << (olen as u32 & 0x1F)),
            255 => PacketLength::Fixed(self.read_be_u32()?),
        };
        Ok(len)
    }

    /// Parses the next packet header: version, tag and first length field.
    pub fn read_header(
        &mut self,
    ) -> Result<Option<(PacketHeaderVersion, Tag, PacketLength)>> {
        let Some(header) = self.read_u8_opt()? else {
            return Ok(None);
        };

        ensure!(
            header & 0b1000_0000 != 0,
            "invalid packet header 0x{:02x}",
            header
        );

        let parsed = if header & 0b0100_0000 != 0 {
            // new format
            let tag = Tag::from(header & 0b0011_1111);
            let length = self.read_new_length()?;
            (PacketHeaderVersion::New, tag, length)
        } else {
            // old format
            let tag = Tag::from((header >> 2) & 0b0000_1111);
            let length = match header & 0b0000_0011 {
                0 => PacketLength::Fixed(self.read_u8()?.into()),
                1 => PacketLength::Fixed(self.read_be_u16()?.into()),
                2 => PacketLength::Fixed(self.read_be_u32()?),
                3 => PacketLength::Indeterminate,
                _ => unreachable!("two bit field"),
            };
            (PacketHeaderVersion::Old, tag, length)
        };

        Ok(Some(parsed))
    }

    /// Parses one header and pulls the body through its stream.
    fn next_packet(&mut self) -> Result<Option<(PacketHeaderVersion, Tag, Bytes)>> {
        let Some((version, tag, length)) = self.read_header()? else {
            return Ok(None);
        };

        let mut body_reader = PacketBodyReader::new(tag, length, &mut self.inner)?;
        let body = read_to_bytes(&mut body_reader)?;

        debug!(
            "parsed header {:?} {:?}, body {} bytes",
            version,
            tag,
            body.len()
        );
        Ok(Some((version, tag, body)))
    }
}

/// Drains a body stream chunk by chunk into owned bytes, with the global
/// size backstop.
fn read_to_bytes(reader: &mut impl Read) -> Result<Bytes> {
    let mut body = Vec::new();
    loop {
        let start = body.len();
        body.resize(start + READ_CHUNK, 0);
        let read = crate::util::fill_buffer(reader, &mut body[start..], None)?;
        body.truncate(start + read);
        if read == 0 {
            return Ok(body.into());
        }
        ensure!(
            body.len() <= MAX_BUFFER_SIZE,
            "packet exceeds the maximum buffered size"
        );
    }
}

impl<R: BufRead> Iterator for PacketParser<R> {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.next_packet() {
                Ok(None) => return None,
                Ok(Some((version, tag, body))) => {
                    // unknown but non-critical: drop and continue
                    if let Tag::NonCritical(id) | Tag::Experimental(id) = tag {
                        warn!("skipping unknown packet with tag {}", id);
                        continue;
                    }

                    match Packet::from_body(version, tag, body) {
                        Ok(packet) => return Some(Ok(packet)),
                        Err(err @ Error::UnknownCriticalPacket { .. }) => {
                            self.failed = true;
                            return Some(Err(err));
                        }
                        Err(err) => return Some(Err(err)),
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::LiteralData;
    use crate::ser::Serialize;

    #[test]
    fn test_parse_serialized_packets() {
        let literal = LiteralData::from_bytes(&b"name"[..], &b"hello"[..]);
        let packet: Packet = literal.into();

        let mut buf = Vec::new();
        packet.to_writer(&mut buf).unwrap();
        packet.to_writer(&mut buf).unwrap();

        let packets: Vec<_> = PacketParser::new(&buf[..])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0], packet);
        assert_eq!(packets[1], packet);
    }

    #[test]
    fn test_roundtrip_bytes() {
        let literal = LiteralData::from_bytes(&b""[..], &b"payload data"[..]);
        let packet: Packet = literal.into();
        let buf = packet.to_bytes().unwrap();
        assert_eq!(buf.len(), packet.write_len());

        let parsed = PacketParser::new(&buf[..]).next().unwrap().unwrap();
        let buf2 = parsed.to_bytes().unwrap();
        assert_eq!(buf, buf2);
    }

    #[test]
    fn test_incomplete_input() {
        // a header promising more bytes than available
        let bytes = [0xC0 | 11, 0x10, 0x00];
        let mut parser = PacketParser::new(&bytes[..]);
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_partial_length_literal() {
        // build a literal packet body, then frame it with a partial length
        let literal = LiteralData::from_bytes(&b""[..], vec![0x5A; 700]);
        let body = literal.to_bytes().unwrap();

        let mut framed = Vec::new();
        framed.push(0xC0 | 11);
        framed.push(224 + 9); // partial part of 512 bytes
        framed.extend_from_slice(&body[..512]);
        // rest with a fixed two octet length
        let rest = body.len() - 512;
        framed.push((((rest - 192) >> 8) + 192) as u8);
        framed.push(((rest - 192) & 0xFF) as u8);
        framed.extend_from_slice(&body[512..]);

        let packets: Vec<_> = PacketParser::new(&framed[..])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(packets.len(), 1);
        let Packet::LiteralData(parsed) = &packets[0] else {
            panic!("expected literal data");
        };
        assert_eq!(parsed.data(), literal.data());
    }

    #[test]
    fn test_partial_length_rejected_for_wrong_tag() {
        let mut framed = Vec::new();
        framed.push(0xC0 | 13); // user id
        framed.push(224 + 9);
        framed.extend_from_slice(&[0x41; 512]);
        framed.push(0);

        let mut parser = PacketParser::new(&framed[..]);
        assert!(parser.next().unwrap().is_err());
    }

    #[test]
    fn test_short_first_partial_rejected() {
        let mut framed = Vec::new();
        framed.push(0xC0 | 11);
        framed.push(224); // 2^0 = 1 byte, below the 512 minimum
        framed.push(0x00);
        framed.push(0);

        let mut parser = PacketParser::new(&framed[..]);
        assert!(parser.next().unwrap().is_err());
    }

    #[test]
    fn test_old_format_header() {
        let literal = LiteralData::from_bytes(&b""[..], &b"old"[..]);
        let body = literal.to_bytes().unwrap();

        let mut framed = Vec::new();
        framed.push(0b1000_0000 | (11 << 2)); // old format, one octet length
        framed.push(body.len() as u8);
        framed.extend_from_slice(&body);

        let packets: Vec<_> = PacketParser::new(&framed[..])
            .collect::<Result<_>>()
            .unwrap();
        let Packet::LiteralData(parsed) = &packets[0] else {
            panic!("expected literal data");
        };
        assert_eq!(parsed.data(), b"old");
    }
}
