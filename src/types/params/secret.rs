use std::io;

use bytes::Buf;

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{EncryptedSecretParams, PlainSecretParams};

/// The secret half of a secret key packet, either in the clear or still
/// under passphrase protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretParams {
    Plain(PlainSecretParams),
    Encrypted(EncryptedSecretParams),
}

impl SecretParams {
    /// Parses the packet body after the public material: the S2K usage octet
    /// and everything it governs.
    pub fn try_from_buf<B: Buf>(alg: PublicKeyAlgorithm, i: &mut B) -> Result<Self> {
        let usage = i.read_u8()?;

        if usage == 0 {
            let params = PlainSecretParams::try_from_buf_checksummed(alg, i)?;
            return Ok(SecretParams::Plain(params));
        }

        let params = EncryptedSecretParams::try_from_buf(usage, i)?;
        Ok(SecretParams::Encrypted(params))
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretParams::Encrypted(_))
    }

    pub fn has_sha1_checksum(&self) -> bool {
        match self {
            SecretParams::Plain(_) => false,
            SecretParams::Encrypted(p) => p.has_sha1_checksum(),
        }
    }

    /// Runs `work` on the unlocked secret material.
    pub fn unlock<G, T>(&self, passphrase: &str, alg: PublicKeyAlgorithm, work: G) -> Result<T>
    where
        G: FnOnce(&PlainSecretParams) -> Result<T>,
    {
        match self {
            SecretParams::Plain(k) => work(k),
            SecretParams::Encrypted(k) => {
                let plain = k.unlock(passphrase, alg)?;
                work(&plain)
            }
        }
    }
}

impl Serialize for SecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            SecretParams::Plain(k) => {
                writer.write_all(&[0])?;
                k.to_writer(writer)?;
                writer.write_all(&k.checksum_simple()?)?;
            }
            SecretParams::Encrypted(k) => {
                k.to_writer(writer)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            SecretParams::Plain(k) => 1 + k.write_len() + 2,
            SecretParams::Encrypted(k) => k.write_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mpi;

    #[test]
    fn test_plain_roundtrip() {
        let params = SecretParams::Plain(PlainSecretParams::Ecdh(Mpi::from_slice(&[0x33; 32])));
        let buf = params.to_bytes().unwrap();
        assert_eq!(buf.len(), params.write_len());

        let back = SecretParams::try_from_buf(PublicKeyAlgorithm::Ecdh, &mut &buf[..]).unwrap();
        assert_eq!(params, back);
    }
}
