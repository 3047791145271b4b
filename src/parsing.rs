//! Checked parsing helpers on top of [`Buf`].

use bytes::{Buf, Bytes};

use crate::errors::{Error, PacketIncompleteSnafu, Result};

/// Extension trait adding length-checked big-endian reads to any [`Buf`].
///
/// Every read fails with [`Error::PacketIncomplete`] instead of panicking
/// when the buffer runs dry, so truncated packets surface as malformed input
/// rather than aborts.
pub trait BufParsing: Buf + Sized {
    fn read_u8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.get_u8())
    }

    fn read_be_u16(&mut self) -> Result<u16> {
        self.ensure_remaining(2)?;
        Ok(self.get_u16())
    }

    fn read_be_u32(&mut self) -> Result<u32> {
        self.ensure_remaining(4)?;
        Ok(self.get_u32())
    }

    fn read_array<const C: usize>(&mut self) -> Result<[u8; C]> {
        self.ensure_remaining(C)?;
        let mut arr = [0u8; C];
        self.copy_to_slice(&mut arr);
        Ok(arr)
    }

    fn read_take(&mut self, size: usize) -> Result<Bytes> {
        self.ensure_remaining(size)?;
        Ok(self.copy_to_bytes(size))
    }

    /// Consumes and returns all remaining bytes.
    fn rest(&mut self) -> Bytes {
        let len = self.remaining();
        self.copy_to_bytes(len)
    }

    fn ensure_remaining(&self, size: usize) -> Result<()> {
        if self.remaining() < size {
            return PacketIncompleteSnafu {
                needed: size - self.remaining(),
            }
            .fail();
        }
        Ok(())
    }

    /// Reads and checks a fixed byte sequence.
    fn read_tag(&mut self, tag: &[u8]) -> Result<()> {
        self.ensure_remaining(tag.len())?;
        let read = self.copy_to_bytes(tag.len());
        if tag != read {
            return Err(Error::Message {
                message: format!("expected {}, found {}", hex::encode(tag), hex::encode(&read)),
                backtrace: snafu::GenerateImplicitData::generate(),
            });
        }
        Ok(())
    }
}

impl<B: Buf> BufParsing for B {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        let mut buf = &[0x01u8][..];
        assert!(buf.read_be_u16().is_err());
    }

    #[test]
    fn test_read_tag() {
        let mut buf = &b"\x99\x01rest"[..];
        buf.read_tag(b"\x99\x01").unwrap();
        assert_eq!(buf.rest().as_ref(), b"rest");
    }
}
