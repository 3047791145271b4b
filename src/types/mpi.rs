use std::fmt;
use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use num_bigint::BigUint;
use zeroize::Zeroize;

use crate::errors::{InvalidInputSnafu, Result};
use crate::parsing::BufParsing;
use crate::ser::Serialize;

/// Number of bits we accept when reading or writing MPIs.
/// The value is the same as gnupgs.
const MAX_EXTERN_MPI_BITS: u16 = 16384;

/// A multi precision integer: an unsigned big-endian number with a two octet
/// bit-length prefix on the wire.
///
/// The stored bytes are always normalized (no leading zero octets), so the
/// declared bit length on write equals the bit length of the value and
/// `write(read(b)) == b` holds for canonical inputs.
///
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-3.2>
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Mpi(Vec<u8>);

impl Mpi {
    /// Wraps the given bytes without stripping. The caller must guarantee
    /// normalization; used for native-format points and the reversed
    /// curve25519 secret encoding.
    pub(crate) fn from_raw(bytes: Vec<u8>) -> Self {
        Mpi(bytes)
    }

    /// Represent the data in `raw` as an Mpi, stripping leading zeros.
    /// `raw` is not expected to be length-prefixed.
    pub fn from_slice(raw: &[u8]) -> Self {
        Mpi(strip_leading_zeros(raw).to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Parses a length-prefixed MPI from the buffer.
    ///
    /// Zero-valued MPIs are rejected: a zero never occurs in valid key or
    /// signature material and accepting one opens degenerate-value attacks.
    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let len_bits = i.read_be_u16()?;
        if len_bits == 0 || len_bits > MAX_EXTERN_MPI_BITS {
            return Err(InvalidInputSnafu.build());
        }

        let len_bytes = usize::from((len_bits + 7) >> 3);
        let raw = i.read_take(len_bytes)?;
        let stripped = strip_leading_zeros(&raw);
        if stripped.is_empty() {
            return Err(InvalidInputSnafu.build());
        }

        Ok(Mpi(stripped.to_vec()))
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

/// Returns the bit length of a given slice.
#[inline]
pub(crate) fn bit_size(val: &[u8]) -> usize {
    if val.is_empty() {
        0
    } else {
        (val.len() * 8) - val[0].leading_zeros() as usize
    }
}

#[inline]
fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|b| b != &0) {
        Some(offset) => &bytes[offset..],
        None => &[],
    }
}

impl AsRef<[u8]> for Mpi {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Serialize for Mpi {
    fn to_writer<W: io::Write>(&self, w: &mut W) -> Result<()> {
        let size = bit_size(&self.0);
        w.write_u16::<BigEndian>(size as u16)?;
        w.write_all(&self.0)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.0.len()
    }
}

impl From<&BigUint> for Mpi {
    fn from(other: &BigUint) -> Self {
        Mpi(other.to_bytes_be())
    }
}

impl Zeroize for Mpi {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl From<BigUint> for Mpi {
    fn from(other: BigUint) -> Self {
        Self::from(&other)
    }
}

impl fmt::Debug for Mpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mpi({})", hex::encode(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for Mpi {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            proptest::collection::vec(0u8..255, 1..500)
                .prop_map(|v| Mpi::from_slice(&v))
                .prop_filter("zero mpi", |m| !m.is_empty())
                .boxed()
        }
    }

    #[test]
    fn test_mpi_parse() {
        // Decode the number `511` (`0x1FF` in hex).
        assert_eq!(
            Mpi::try_from_buf(&mut &[0x00, 0x09, 0x01, 0xFF][..]).unwrap(),
            Mpi::from_slice(&[0x01, 0xFF][..])
        );

        // Decode the number `2^255 + 7`.
        assert_eq!(
            Mpi::try_from_buf(
                &mut &[
                    0x01, 0, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                    0, 0, 0, 0, 0, 0, 0, 0, 0, 0x07
                ][..]
            )
            .unwrap(),
            Mpi::from_slice(
                &[
                    0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                    0, 0, 0, 0, 0, 0, 0x07
                ][..]
            )
        );
    }

    #[test]
    fn test_zero_mpi_rejected() {
        assert!(Mpi::try_from_buf(&mut &[0x00, 0x00][..]).is_err());
        assert!(Mpi::try_from_buf(&mut &[0x00, 0x08, 0x00][..]).is_err());
    }

    #[test]
    fn test_strip_leading_zeros_with_all_zeros() {
        let buf = [0u8, 0u8, 0u8];
        let stripped: &[u8] = strip_leading_zeros(&buf[..]);
        assert!(stripped.is_empty());
    }

    proptest! {
        #[test]
        fn mpi_write_len(m: Mpi) {
            let mut buf = Vec::new();
            m.to_writer(&mut buf)?;
            prop_assert_eq!(m.write_len(), buf.len());
        }

        #[test]
        fn mpi_roundtrip(m: Mpi) {
            let mut buf = Vec::new();
            m.to_writer(&mut buf)?;
            let m_back = Mpi::try_from_buf(&mut &buf[..])?;
            prop_assert_eq!(m, m_back);
        }

        #[test]
        fn mpi_biguint_roundtrip(m: Mpi) {
            let n = m.to_biguint();
            prop_assert_eq!(Mpi::from(&n), m);
        }
    }
}
