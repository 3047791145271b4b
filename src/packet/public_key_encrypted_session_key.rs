use std::fmt;
use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, Mpi, PacketHeaderVersion, Tag};

/// Public-Key Encrypted Session Key Packet.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.1>
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyEncryptedSessionKey {
    packet_version: PacketHeaderVersion,
    id: KeyId,
    algorithm: PublicKeyAlgorithm,
    values: EskValues,
}

/// Algorithm specific encrypted session key material.
#[derive(Clone, PartialEq, Eq)]
pub enum EskValues {
    Rsa(Mpi),
    Elgamal(Mpi, Mpi),
    Ecdh {
        public_point: Mpi,
        encrypted_session_key: Bytes,
    },
    /// Unknown algorithm, kept verbatim.
    Other(Bytes),
}

impl PublicKeyEncryptedSessionKey {
    pub fn new(id: KeyId, algorithm: PublicKeyAlgorithm, values: EskValues) -> Self {
        PublicKeyEncryptedSessionKey {
            packet_version: Default::default(),
            id,
            algorithm,
            values,
        }
    }

    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 3, "unsupported pkesk version");

        let id = KeyId::from_slice(&i.read_array::<8>()?)?;
        let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);

        let values = match algorithm {
            PublicKeyAlgorithm::RsaEncryptSign
            | PublicKeyAlgorithm::RsaEncrypt
            | PublicKeyAlgorithm::RsaSign => EskValues::Rsa(Mpi::try_from_buf(&mut i)?),
            PublicKeyAlgorithm::Elgamal => {
                let first = Mpi::try_from_buf(&mut i)?;
                let second = Mpi::try_from_buf(&mut i)?;
                EskValues::Elgamal(first, second)
            }
            PublicKeyAlgorithm::Ecdh => {
                let public_point = Mpi::try_from_buf(&mut i)?;
                let len = i.read_u8()?;
                let encrypted_session_key = i.read_take(len.into())?;
                EskValues::Ecdh {
                    public_point,
                    encrypted_session_key,
                }
            }
            _ => EskValues::Other(i.rest()),
        };

        Ok(PublicKeyEncryptedSessionKey {
            packet_version,
            id,
            algorithm,
            values,
        })
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn values(&self) -> &EskValues {
        &self.values
    }
}

impl Serialize for PublicKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[3])?;
        writer.write_all(self.id.as_ref())?;
        writer.write_all(&[self.algorithm.into()])?;

        match &self.values {
            EskValues::Rsa(mpi) => mpi.to_writer(writer)?,
            EskValues::Elgamal(first, second) => {
                first.to_writer(writer)?;
                second.to_writer(writer)?;
            }
            EskValues::Ecdh {
                public_point,
                encrypted_session_key,
            } => {
                public_point.to_writer(writer)?;
                writer.write_all(&[encrypted_session_key.len() as u8])?;
                writer.write_all(encrypted_session_key)?;
            }
            EskValues::Other(data) => writer.write_all(data)?,
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let values = match &self.values {
            EskValues::Rsa(mpi) => mpi.write_len(),
            EskValues::Elgamal(first, second) => first.write_len() + second.write_len(),
            EskValues::Ecdh {
                public_point,
                encrypted_session_key,
            } => public_point.write_len() + 1 + encrypted_session_key.len(),
            EskValues::Other(data) => data.len(),
        };
        1 + 8 + 1 + values
    }
}

impl PacketTrait for PublicKeyEncryptedSessionKey {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::PublicKeyEncryptedSessionKey
    }
}

impl fmt::Debug for PublicKeyEncryptedSessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyEncryptedSessionKey")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_roundtrip() {
        let pkesk = PublicKeyEncryptedSessionKey::new(
            KeyId::from_slice(&[8, 7, 6, 5, 4, 3, 2, 1]).unwrap(),
            PublicKeyAlgorithm::RsaEncryptSign,
            EskValues::Rsa(Mpi::from_slice(&[0x99; 128])),
        );

        let buf = pkesk.to_bytes().unwrap();
        assert_eq!(buf.len(), pkesk.write_len());

        let back =
            PublicKeyEncryptedSessionKey::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(pkesk, back);
    }

    #[test]
    fn test_ecdh_roundtrip() {
        let pkesk = PublicKeyEncryptedSessionKey::new(
            KeyId::from_slice(&[1; 8]).unwrap(),
            PublicKeyAlgorithm::Ecdh,
            EskValues::Ecdh {
                public_point: Mpi::from_slice(&[0x40; 33]),
                encrypted_session_key: Bytes::copy_from_slice(&[0x55; 48]),
            },
        );

        let buf = pkesk.to_bytes().unwrap();
        assert_eq!(buf.len(), pkesk.write_len());

        let back =
            PublicKeyEncryptedSessionKey::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(pkesk, back);
    }
}
