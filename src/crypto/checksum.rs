use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use subtle::ConstantTimeEq;

use crate::errors::{InvalidChecksumSnafu, Result};

/// Computes the two octet checksum: sum of all octets mod 65536.
#[inline]
pub fn calculate_simple(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |sum, b| sum.wrapping_add(u16::from(*b)))
}

/// Validates a simple checksum in constant time.
#[inline]
pub fn simple(expected: &[u8], data: &[u8]) -> Result<()> {
    let actual = calculate_simple(data).to_be_bytes();
    if expected.ct_eq(&actual[..]).into() {
        Ok(())
    } else {
        InvalidChecksumSnafu.fail()
    }
}

#[inline]
pub fn simple_to_writer<W: io::Write>(data: &[u8], writer: &mut W) -> Result<()> {
    writer.write_u16::<BigEndian>(calculate_simple(data))?;
    Ok(())
}

/// Validates a SHA-1 checksum over secret key material in constant time.
#[inline]
pub fn sha1(expected: &[u8], data: &[u8]) -> Result<()> {
    use sha1::{Digest, Sha1};

    let actual = Sha1::digest(data);
    if expected.ct_eq(&actual[..]).into() {
        Ok(())
    } else {
        InvalidChecksumSnafu.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        let data = [0x01u8, 0x02, 0xFF];
        assert_eq!(calculate_simple(&data), 0x0102);

        let mut out = Vec::new();
        simple_to_writer(&data, &mut out).unwrap();
        assert!(simple(&out, &data).is_ok());
        assert!(simple(&[0x01, 0x03], &data).is_err());
    }

    #[test]
    fn test_simple_wraps() {
        let data = vec![0xFFu8; 300];
        // 300 * 255 = 76500 = 0x12AD4 -> 0x2AD4
        assert_eq!(calculate_simple(&data), 0x2AD4);
    }

    #[test]
    fn test_sha1() {
        let digest = crate::crypto::hash::HashAlgorithm::Sha1
            .digest(b"data")
            .unwrap();
        assert!(sha1(&digest, b"data").is_ok());
        assert!(sha1(&digest, b"tata").is_err());
    }
}
