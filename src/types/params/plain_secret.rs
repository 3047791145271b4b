use std::io;

use bytes::Buf;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::checksum;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::ser::Serialize;
use crate::types::Mpi;

/// Decrypted, algorithm specific secret key material. Zeroized on drop.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum PlainSecretParams {
    Rsa { d: Mpi, p: Mpi, q: Mpi, u: Mpi },
    Dsa(Mpi),
    Elgamal(Mpi),
    Ecdsa(Mpi),
    EddsaLegacy(Mpi),
    Ecdh(Mpi),
}

impl PlainSecretParams {
    pub fn try_from_buf<B: Buf>(alg: PublicKeyAlgorithm, i: &mut B) -> Result<Self> {
        match alg {
            PublicKeyAlgorithm::RsaEncryptSign
            | PublicKeyAlgorithm::RsaEncrypt
            | PublicKeyAlgorithm::RsaSign => {
                let d = Mpi::try_from_buf(&mut *i)?;
                let p = Mpi::try_from_buf(&mut *i)?;
                let q = Mpi::try_from_buf(&mut *i)?;
                let u = Mpi::try_from_buf(&mut *i)?;
                Ok(PlainSecretParams::Rsa { d, p, q, u })
            }
            PublicKeyAlgorithm::Dsa => Ok(PlainSecretParams::Dsa(Mpi::try_from_buf(i)?)),
            PublicKeyAlgorithm::Elgamal => Ok(PlainSecretParams::Elgamal(Mpi::try_from_buf(i)?)),
            PublicKeyAlgorithm::Ecdsa => Ok(PlainSecretParams::Ecdsa(Mpi::try_from_buf(i)?)),
            PublicKeyAlgorithm::EddsaLegacy => {
                Ok(PlainSecretParams::EddsaLegacy(Mpi::try_from_buf(i)?))
            }
            PublicKeyAlgorithm::Ecdh => Ok(PlainSecretParams::Ecdh(Mpi::try_from_buf(i)?)),
            _ => unsupported_err!("secret params for algorithm {:?}", alg),
        }
    }

    /// Parses secret material trailed by a simple checksum over it.
    ///
    /// Consumes the rest of the buffer; the checksum is the final field of a
    /// secret key packet.
    pub fn try_from_buf_checksummed<B: Buf>(alg: PublicKeyAlgorithm, i: &mut B) -> Result<Self> {
        use crate::parsing::BufParsing;

        let rest = i.rest();
        let mut cursor = &rest[..];
        let params = Self::try_from_buf(alg, &mut cursor)?;
        let material_len = rest.len() - cursor.remaining();

        let expected = (&mut cursor).read_array::<2>()?;
        ensure!(!cursor.has_remaining(), "trailing bytes after checksum");
        checksum::simple(&expected, &rest[..material_len])?;

        Ok(params)
    }

    /// Simple two octet checksum over the serialized material.
    pub fn checksum_simple(&self) -> Result<[u8; 2]> {
        let buf = self.to_bytes()?;
        Ok(checksum::calculate_simple(&buf).to_be_bytes())
    }
}

impl Serialize for PlainSecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => {
                d.to_writer(writer)?;
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                u.to_writer(writer)?;
            }
            PlainSecretParams::Dsa(x)
            | PlainSecretParams::Elgamal(x)
            | PlainSecretParams::Ecdsa(x)
            | PlainSecretParams::EddsaLegacy(x)
            | PlainSecretParams::Ecdh(x) => {
                x.to_writer(writer)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PlainSecretParams::Rsa { d, p, q, u } => {
                d.write_len() + p.write_len() + q.write_len() + u.write_len()
            }
            PlainSecretParams::Dsa(x)
            | PlainSecretParams::Elgamal(x)
            | PlainSecretParams::Ecdsa(x)
            | PlainSecretParams::EddsaLegacy(x)
            | PlainSecretParams::Ecdh(x) => x.write_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksummed_roundtrip() {
        let params = PlainSecretParams::EddsaLegacy(Mpi::from_slice(&[7u8; 32]));
        let mut buf = params.to_bytes().unwrap();
        buf.extend_from_slice(&params.checksum_simple().unwrap());

        let back = PlainSecretParams::try_from_buf_checksummed(
            PublicKeyAlgorithm::EddsaLegacy,
            &mut &buf[..],
        )
        .unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let params = PlainSecretParams::Dsa(Mpi::from_slice(&[9u8; 20]));
        let mut buf = params.to_bytes().unwrap();
        buf.extend_from_slice(&[0xFF, 0xFF]);

        assert!(PlainSecretParams::try_from_buf_checksummed(
            PublicKeyAlgorithm::Dsa,
            &mut &buf[..]
        )
        .is_err());
    }
}
