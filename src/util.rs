use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;

use crate::errors::Result;
use crate::parsing::BufParsing;

/// Reads from `source` until `buffer` is full, or the source is exhausted.
///
/// Returns the number of bytes read. Unlike `read_exact` a short read is not
/// an error, which is what the chunked decryption paths need to detect the
/// final chunk.
pub fn fill_buffer<R: io::Read>(
    source: &mut R,
    buffer: &mut [u8],
    max: Option<usize>,
) -> io::Result<usize> {
    let limit = max.unwrap_or(buffer.len()).min(buffer.len());
    let mut offset = 0;

    while offset < limit {
        let read = source.read(&mut buffer[offset..limit])?;
        if read == 0 {
            break;
        }
        offset += read;
    }

    Ok(offset)
}

/// Reads a subpacket style length (1, 2 or 5 octets).
///
/// This is the same encoding as new-format packet lengths, minus the partial
/// variant, which is not legal inside signature subpacket areas.
pub fn read_packet_length<B: Buf>(i: &mut B) -> Result<usize> {
    let olen = i.read_u8()?;
    let len = match olen {
        0..=191 => olen as usize,
        192..=254 => {
            let a = i.read_u8()?;
            ((olen as usize - 192) << 8) + 192 + a as usize
        }
        255 => i.read_be_u32()? as usize,
    };
    Ok(len)
}

/// Writes a subpacket style length (1, 2 or 5 octets).
pub fn write_packet_length<W: io::Write>(len: usize, writer: &mut W) -> Result<()> {
    if len < 192 {
        writer.write_u8(len as u8)?;
    } else if len < 8384 {
        writer.write_u8((((len - 192) >> 8) + 192) as u8)?;
        writer.write_u8(((len - 192) & 0xFF) as u8)?;
    } else {
        writer.write_u8(255)?;
        writer.write_u32::<BigEndian>(len as u32)?;
    }
    Ok(())
}

/// Number of bytes [`write_packet_length`] will produce.
pub fn packet_length_len(len: usize) -> usize {
    if len < 192 {
        1
    } else if len < 8384 {
        2
    } else {
        5
    }
}

/// Normalizes line endings to CRLF, as required when hashing text-mode
/// signature payloads.
pub fn normalize_lines(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'\r' => {
                out.extend_from_slice(b"\r\n");
                // swallow a following \n
                if data.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => out.extend_from_slice(b"\r\n"),
            c => out.push(c),
        }
        i += 1;
    }
    out
}

/// Feeds a hash context incrementally, normalizing line endings to CRLF on
/// the fly when in text mode.
///
/// Text-mode signatures hash the document with `<CR><LF>` line endings; this
/// adapter lets the payload stream through in chunks of any size without
/// materializing a normalized copy. A `\r\n` pair split across two chunks is
/// handled via the carry flag.
pub struct NormalizingHasher {
    hasher: Box<dyn crate::crypto::hash::Hasher>,
    text_mode: bool,
    last_was_cr: bool,
}

impl NormalizingHasher {
    pub fn new(hasher: Box<dyn crate::crypto::hash::Hasher>, text_mode: bool) -> Self {
        NormalizingHasher {
            hasher,
            text_mode,
            last_was_cr: false,
        }
    }

    pub fn hash_buf(&mut self, buf: &[u8]) {
        if !self.text_mode {
            self.hasher.update(buf);
            return;
        }

        for byte in buf {
            match byte {
                b'\r' => {
                    self.hasher.update(b"\r\n");
                    self.last_was_cr = true;
                }
                b'\n' => {
                    // a \n right after \r was already covered
                    if !self.last_was_cr {
                        self.hasher.update(b"\r\n");
                    }
                    self.last_was_cr = false;
                }
                c => {
                    self.hasher.update(&[*c]);
                    self.last_was_cr = false;
                }
            }
        }
    }

    pub fn done(self) -> Box<dyn crate::crypto::hash::Hasher> {
        self.hasher
    }
}

/// Decodes raw bytes into a string, mapping each non utf-8 byte to the char
/// with the same value.
pub fn read_string_lossy(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => raw.iter().map(|c| *c as char).collect::<String>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_length_roundtrip() {
        for len in [0usize, 1, 191, 192, 8383, 8384, 100_000] {
            let mut buf = Vec::new();
            write_packet_length(len, &mut buf).unwrap();
            assert_eq!(buf.len(), packet_length_len(len));
            let read = read_packet_length(&mut &buf[..]).unwrap();
            assert_eq!(read, len, "len {len}");
        }
    }

    #[test]
    fn test_normalize_lines() {
        assert_eq!(normalize_lines(b"a\nb"), b"a\r\nb");
        assert_eq!(normalize_lines(b"a\r\nb"), b"a\r\nb");
        assert_eq!(normalize_lines(b"a\rb"), b"a\r\nb");
        assert_eq!(normalize_lines(b"ab"), b"ab");
    }

    #[test]
    fn test_fill_buffer_short_source() {
        let mut source = &b"abc"[..];
        let mut buf = [0u8; 8];
        let n = fill_buffer(&mut source, &mut buf, None).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"abc");
    }

    #[test]
    fn test_normalizing_hasher_matches_batch() {
        use crate::crypto::hash::{HashAlgorithm, Hasher as _};

        let inputs: [&[u8]; 4] = [b"a\nb", b"a\r\nb", b"a\rb", b"plain"];
        for input in inputs {
            let expected = HashAlgorithm::Sha256
                .digest(&normalize_lines(input))
                .unwrap();

            // feed one byte at a time so CRLF pairs straddle chunk borders
            let mut norm =
                NormalizingHasher::new(HashAlgorithm::Sha256.new_hasher().unwrap(), true);
            for byte in input {
                norm.hash_buf(&[*byte]);
            }
            assert_eq!(norm.done().finish(), expected);
        }
    }
}
