use std::io;

use bytes::{Buf, Bytes};
use rand::{CryptoRng, Rng};

use crate::crypto::sym::{StreamDecryptor, SymmetricKeyAlgorithm};
use crate::errors::{Error, Result};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// Symmetrically Encrypted Data Packet (tag 9).
///
/// Carries no integrity protection whatsoever; decryption is gated behind
/// [`Config::allow_unauthenticated_messages`](crate::Config).
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.7>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymEncryptedData {
    packet_version: PacketHeaderVersion,
    data: Bytes,
}

impl SymEncryptedData {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        Ok(SymEncryptedData {
            packet_version,
            data: i.rest(),
        })
    }

    pub fn encrypt<R: CryptoRng + Rng>(
        rng: &mut R,
        sym: SymmetricKeyAlgorithm,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        let mut buf = sym.generate_prefix(rng);
        buf.extend_from_slice(plaintext);
        // legacy packets resynchronize after the prefix
        sym.encrypt_in_place(key, &mut buf, true)?;

        Ok(SymEncryptedData {
            packet_version: Default::default(),
            data: buf.into(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Streaming decryption (with the legacy resync); the caller has to
    /// check the policy gate first.
    pub fn decryptor(
        &self,
        sym: SymmetricKeyAlgorithm,
        key: &[u8],
    ) -> Result<StreamDecryptor<bytes::buf::Reader<Bytes>>> {
        sym.stream_decryptor(key, false, self.data.clone().reader())
    }

    /// Decrypts the body, collecting the full plaintext.
    pub fn decrypt(&self, sym: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        let mut reader = self.decryptor(sym, key)?;
        let mut out = Vec::new();
        io::copy(&mut reader, &mut out).map_err(Error::from_stream_io)?;
        Ok(out)
    }
}

impl Serialize for SymEncryptedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        self.data.len()
    }
}

impl PacketTrait for SymEncryptedData {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::SymEncryptedData
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(16);
        let sym = SymmetricKeyAlgorithm::Aes128;
        let key = vec![0x01; sym.key_size()];

        let packet = SymEncryptedData::encrypt(&mut rng, sym, &key, b"legacy payload").unwrap();
        assert_eq!(packet.decrypt(sym, &key).unwrap(), b"legacy payload");
    }
}
