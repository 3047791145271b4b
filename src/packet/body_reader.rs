use std::io::{self, BufRead, Read};

use crate::errors::Result;
use crate::types::{PacketLength, Tag};

/// Pull-based reader over a single packet body.
///
/// This is the stream the rest of the engine is built on: it may be read
/// once, may be arbitrarily long, and is driven entirely by the consumer.
/// Partial body lengths are spliced together transparently, so the caller
/// sees one contiguous body regardless of the framing; memory use is bounded
/// by whatever the consumer reads at a time.
pub struct PacketBodyReader<R: BufRead> {
    source: R,
    state: State,
}

enum State {
    Fixed { remaining: u32 },
    Indeterminate,
    Partial { remaining: u32, last: bool },
    Done,
}

impl<R: BufRead> PacketBodyReader<R> {
    /// Starts a body reader for a freshly parsed packet header.
    ///
    /// The partial-length rules are enforced up front: only the data packet
    /// types may chain partial parts, and the first part must be at least
    /// 512 bytes.
    pub fn new(tag: Tag, length: PacketLength, source: R) -> Result<Self> {
        let state = match length {
            PacketLength::Fixed(len) => State::Fixed { remaining: len },
            PacketLength::Indeterminate => State::Indeterminate,
            PacketLength::Partial(first) => {
                // https://tools.ietf.org/html/rfc4880#section-4.2.2.4
                // "An implementation MAY use Partial Body Lengths for data
                // packets, be they literal, compressed, or encrypted [...]
                // Partial Body Lengths MUST NOT be used for any other packet
                // types"
                ensure!(
                    tag.allows_partial_length(),
                    "partial body length is not allowed for packet type {:?}",
                    tag
                );
                ensure!(
                    first >= 512,
                    "illegal first partial body length {} (shorter than 512 bytes)",
                    first
                );
                State::Partial {
                    remaining: first,
                    last: false,
                }
            }
        };

        Ok(PacketBodyReader { source, state })
    }

    /// Has the body been fully consumed?
    pub fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.source.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads the length field that continues a partial chain.
    fn read_next_length(&mut self) -> io::Result<()> {
        let olen = self.read_u8()?;
        self.state = match olen {
            0..=191 => State::Partial {
                remaining: olen.into(),
                last: true,
            },
            192..=223 => {
                let a = self.read_u8()?;
                State::Partial {
                    remaining: ((olen as u32 - 192) << 8) + 192 + a as u32,
                    last: true,
                }
            }
            224..=254 => State::Partial {
                remaining: 1 << (olen as u32 & 0x1F),
                last: false,
            },
            255 => {
                let mut buf = [0u8; 4];
                self.source.read_exact(&mut buf)?;
                State::Partial {
                    remaining: u32::from_be_bytes(buf),
                    last: true,
                }
            }
        };
        Ok(())
    }

    /// Advances across part boundaries until data is available or the body
    /// ends. Returns how many bytes may be read right now.
    fn available(&mut self) -> io::Result<usize> {
        loop {
            match self.state {
                State::Done => return Ok(0),
                State::Indeterminate => return Ok(usize::MAX),
                State::Fixed { remaining } => {
                    if remaining == 0 {
                        self.state = State::Done;
                        return Ok(0);
                    }
                    return Ok(remaining as usize);
                }
                State::Partial { remaining, last } => {
                    if remaining > 0 {
                        return Ok(remaining as usize);
                    }
                    if last {
                        self.state = State::Done;
                        return Ok(0);
                    }
                    self.read_next_length()?;
                }
            }
        }
    }

    fn consumed(&mut self, amount: u32) {
        match &mut self.state {
            State::Fixed { remaining } | State::Partial { remaining, .. } => {
                *remaining -= amount;
            }
            State::Indeterminate | State::Done => {}
        }
    }
}

impl<R: BufRead> Read for PacketBodyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.available()?;
        if available == 0 {
            return Ok(0);
        }

        let want = buf.len().min(available);
        let read = self.source.read(&mut buf[..want])?;
        if read == 0 && want > 0 && !matches!(self.state, State::Indeterminate) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "packet body ended early",
            ));
        }
        self.consumed(read as u32);
        Ok(read)
    }
}

impl<R: BufRead> BufRead for PacketBodyReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let available = self.available()?;
        if available == 0 {
            return Ok(&[]);
        }
        let buf = self.source.fill_buf()?;
        if buf.is_empty() && !matches!(self.state, State::Indeterminate) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "packet body ended early",
            ));
        }
        let n = buf.len().min(available);
        Ok(&buf[..n])
    }

    fn consume(&mut self, amt: usize) {
        self.source.consume(amt);
        self.consumed(amt as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_body() {
        let data = b"0123456789rest";
        let mut reader =
            PacketBodyReader::new(Tag::UserId, PacketLength::Fixed(10), &data[..]).unwrap();

        let mut body = Vec::new();
        reader.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"0123456789");
        assert!(reader.is_done());
        assert_eq!(reader.into_inner(), &b"rest"[..]);
    }

    #[test]
    fn test_partial_chain() {
        // one 512 byte part, then a fixed two byte tail
        let mut framed = vec![0x41u8; 512];
        framed.push(2);
        framed.extend_from_slice(b"zz");

        let mut reader =
            PacketBodyReader::new(Tag::LiteralData, PacketLength::Partial(512), &framed[..])
                .unwrap();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).unwrap();

        assert_eq!(body.len(), 514);
        assert_eq!(&body[512..], b"zz");
    }

    #[test]
    fn test_partial_rules() {
        assert!(
            PacketBodyReader::new(Tag::UserId, PacketLength::Partial(512), &b""[..]).is_err()
        );
        assert!(
            PacketBodyReader::new(Tag::LiteralData, PacketLength::Partial(256), &b""[..])
                .is_err()
        );
    }

    #[test]
    fn test_truncated_body() {
        let data = b"abc";
        let mut reader =
            PacketBodyReader::new(Tag::UserId, PacketLength::Fixed(10), &data[..]).unwrap();
        let mut body = Vec::new();
        assert!(reader.read_to_end(&mut body).is_err());
    }
}
