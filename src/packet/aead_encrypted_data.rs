use std::io;

use bytes::{Buf, Bytes};
use log::warn;
use rand::{CryptoRng, Rng};

use crate::crypto::aead::{self, AeadAlgorithm, ChunkDecryptor, ChunkReader};
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// AEAD Encrypted Data Packet (tag 20, version 1).
///
/// The body is a sequence of AEAD chunks followed by a final tag that
/// authenticates the total plaintext length.
/// Ref: <https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis#section-5.16>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeadEncryptedData {
    packet_version: PacketHeaderVersion,
    sym_algorithm: SymmetricKeyAlgorithm,
    aead: AeadAlgorithm,
    chunk_size_byte: u8,
    iv: Bytes,
    data: Bytes,
}

impl AeadEncryptedData {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 1, "unsupported aead packet version");

        let sym_algorithm = SymmetricKeyAlgorithm::from(i.read_u8()?);
        let aead = AeadAlgorithm::from(i.read_u8()?);
        if aead == AeadAlgorithm::ExperimentalGcm {
            warn!("aead packet uses the private-use GCM id (100)");
        }
        let chunk_size_byte = i.read_u8()?;

        let iv_len = aead
            .iv_size()
            .ok_or_else(|| format_err!("unknown aead mode {:?}", aead))?;
        let iv = i.read_take(iv_len)?;
        let data = i.rest();

        Ok(AeadEncryptedData {
            packet_version,
            sym_algorithm,
            aead,
            chunk_size_byte,
            iv,
            data,
        })
    }

    /// Encrypts `plaintext` in chunks under a fresh random IV.
    pub fn encrypt<R: CryptoRng + Rng>(
        rng: &mut R,
        sym: SymmetricKeyAlgorithm,
        aead_alg: AeadAlgorithm,
        chunk_size_byte: u8,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        let iv_len = aead_alg
            .iv_size()
            .ok_or_else(|| format_err!("unknown aead mode {:?}", aead_alg))?;
        let mut iv = vec![0u8; iv_len];
        rng.fill_bytes(&mut iv);

        Self::encrypt_with_iv(sym, aead_alg, chunk_size_byte, key, &iv, plaintext)
    }

    /// Encrypts with a caller supplied IV, for reproducible flows.
    pub fn encrypt_with_iv(
        sym: SymmetricKeyAlgorithm,
        aead_alg: AeadAlgorithm,
        chunk_size_byte: u8,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        let info = info_for(sym, aead_alg, chunk_size_byte);
        let data = aead::encrypt_chunked(sym, aead_alg, key, &info, iv, chunk_size_byte, plaintext)?;

        Ok(AeadEncryptedData {
            packet_version: Default::default(),
            sym_algorithm: sym,
            aead: aead_alg,
            chunk_size_byte,
            iv: Bytes::copy_from_slice(iv),
            data: data.into(),
        })
    }

    pub fn sym_algorithm(&self) -> SymmetricKeyAlgorithm {
        self.sym_algorithm
    }

    pub fn aead(&self) -> AeadAlgorithm {
        self.aead
    }

    pub fn chunk_size_byte(&self) -> u8 {
        self.chunk_size_byte
    }

    /// Returns a streaming decryptor yielding validated plaintext chunks,
    /// with memory bounded by the chunk size.
    pub fn decryptor(&self, key: &[u8]) -> Result<ChunkDecryptor<bytes::buf::Reader<Bytes>>> {
        let info = info_for(self.sym_algorithm, self.aead, self.chunk_size_byte);
        ChunkDecryptor::new(
            self.sym_algorithm,
            self.aead,
            key,
            info,
            &self.iv,
            self.chunk_size_byte,
            self.data.clone().reader(),
        )
    }

    /// The decryptor as a [`io::BufRead`], for pull-based consumers.
    pub fn reader(&self, key: &[u8]) -> Result<ChunkReader<bytes::buf::Reader<Bytes>>> {
        Ok(ChunkReader::new(self.decryptor(key)?))
    }

    /// Convenience wrapper collecting the full plaintext.
    pub fn decrypt(&self, key: &[u8]) -> Result<Vec<u8>> {
        let chunks = self.decryptor(key)?.collect::<Result<Vec<_>>>()?;
        Ok(chunks.concat())
    }
}

/// The five octet associated data prelude: packet type, version, cipher,
/// mode and chunk size octet.
fn info_for(sym: SymmetricKeyAlgorithm, aead: AeadAlgorithm, chunk_size_byte: u8) -> [u8; 5] {
    [
        0b1100_0000 | u8::from(Tag::AeadEncryptedData),
        0x01,
        sym.into(),
        aead.into(),
        chunk_size_byte,
    ]
}

impl Serialize for AeadEncryptedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            1,
            self.sym_algorithm.into(),
            self.aead.into(),
            self.chunk_size_byte,
        ])?;
        writer.write_all(&self.iv)?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        4 + self.iv.len() + self.data.len()
    }
}

impl PacketTrait for AeadEncryptedData {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::AeadEncryptedData
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(20);
        let sym = SymmetricKeyAlgorithm::Aes256;
        let key = vec![0x77; sym.key_size()];

        let packet = AeadEncryptedData::encrypt(
            &mut rng,
            sym,
            AeadAlgorithm::Eax,
            14,
            &key,
            b"Hello, World!\n",
        )
        .unwrap();

        let buf = packet.to_bytes().unwrap();
        assert_eq!(buf.len(), packet.write_len());
        let back = AeadEncryptedData::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(packet, back);

        assert_eq!(back.decrypt(&key).unwrap(), b"Hello, World!\n");
    }

    #[test]
    fn test_known_session_key_chunk14() {
        // fixed IV so the flow is reproducible
        let sym = SymmetricKeyAlgorithm::Aes256;
        let key = vec![0x01; sym.key_size()];
        let iv = vec![0x02; 16];

        let packet = AeadEncryptedData::encrypt_with_iv(
            sym,
            AeadAlgorithm::Eax,
            14,
            &key,
            &iv,
            b"Hello, World!\n",
        )
        .unwrap();

        assert_eq!(packet.decrypt(&key).unwrap(), b"Hello, World!\n");

        // flipping the final tag byte must abort with an integrity error
        let mut data = packet.data.to_vec();
        let last = data.len() - 1;
        data[last] ^= 1;
        let tampered = AeadEncryptedData {
            data: data.into(),
            ..packet
        };
        assert!(tampered.decrypt(&key).is_err());
    }
}
