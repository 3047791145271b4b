use std::io;

use bytes::{Buf, Bytes};
use rand::{CryptoRng, Rng};
use sha1::{Digest, Sha1};

use crate::crypto::sym::{StreamDecryptor, SymmetricKeyAlgorithm};
use crate::errors::{Error, Result};
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// Packet header of the trailing Modification Detection Code packet plus its
/// 20 byte SHA-1.
const MDC_LEN: usize = 22;

/// Sym. Encrypted Integrity Protected Data Packet (tag 18, version 1).
///
/// The plaintext is followed by an MDC packet whose SHA-1 covers the random
/// prefix, the plaintext and the MDC packet header itself. CFB runs without
/// the resync quirk for this packet type.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.13>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymEncryptedProtectedData {
    packet_version: PacketHeaderVersion,
    data: Bytes,
}

impl SymEncryptedProtectedData {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 1, "unsupported seipd version");

        Ok(SymEncryptedProtectedData {
            packet_version,
            data: i.rest(),
        })
    }

    /// Encrypts `plaintext`, appending the MDC trailer.
    pub fn encrypt<R: CryptoRng + Rng>(
        rng: &mut R,
        sym: SymmetricKeyAlgorithm,
        key: &[u8],
        plaintext: &[u8],
    ) -> Result<Self> {
        let mut buf = sym.generate_prefix(rng);
        buf.extend_from_slice(plaintext);
        buf.extend_from_slice(&[0xD3, 0x14]);

        let mdc = Sha1::digest(&buf);
        buf.extend_from_slice(&mdc);

        sym.encrypt_in_place(key, &mut buf, false)?;

        Ok(SymEncryptedProtectedData {
            packet_version: Default::default(),
            data: buf.into(),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Streaming decryption of the body.
    ///
    /// The returned reader releases plaintext incrementally but withholds
    /// the trailing 22 bytes until the source is exhausted, then validates
    /// the MDC in constant time. No plaintext past the trailer is ever
    /// observable, and a mismatch fails the final read.
    pub fn decryptor(
        &self,
        sym: SymmetricKeyAlgorithm,
        key: &[u8],
    ) -> Result<StreamDecryptor<bytes::buf::Reader<Bytes>>> {
        let bs = sym.block_size();
        ensure!(
            self.data.len() >= bs + 2 + MDC_LEN,
            "seipd body too short for prefix and mdc"
        );
        sym.stream_decryptor(key, true, self.data.clone().reader())
    }

    /// Decrypts and validates the MDC, collecting the full plaintext.
    pub fn decrypt(&self, sym: SymmetricKeyAlgorithm, key: &[u8]) -> Result<Vec<u8>> {
        let mut reader = self.decryptor(sym, key)?;
        let mut out = Vec::new();
        io::copy(&mut reader, &mut out).map_err(Error::from_stream_io)?;
        Ok(out)
    }
}

impl Serialize for SymEncryptedProtectedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[1])?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.data.len()
    }
}

impl PacketTrait for SymEncryptedProtectedData {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::SymEncryptedProtectedData
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::errors::Error;

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let sym = SymmetricKeyAlgorithm::Aes256;
        let key = vec![0x2A; sym.key_size()];

        let packet =
            SymEncryptedProtectedData::encrypt(&mut rng, sym, &key, b"protected payload").unwrap();

        let buf = packet.to_bytes().unwrap();
        assert_eq!(buf.len(), packet.write_len());
        let back = SymEncryptedProtectedData::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(packet, back);

        assert_eq!(back.decrypt(sym, &key).unwrap(), b"protected payload");
    }

    #[test]
    fn test_tampered_mdc_yields_no_plaintext() {
        let mut rng = ChaCha8Rng::seed_from_u64(18);
        let sym = SymmetricKeyAlgorithm::Aes256;
        let key = vec![0x2B; sym.key_size()];

        let packet = SymEncryptedProtectedData::encrypt(&mut rng, sym, &key, b"payload").unwrap();

        // zero out the encrypted MDC hash
        let mut data = packet.data().to_vec();
        let len = data.len();
        for byte in &mut data[len - 20..] {
            *byte = 0;
        }
        let tampered = SymEncryptedProtectedData {
            packet_version: Default::default(),
            data: data.into(),
        };

        let err = tampered.decrypt(sym, &key).unwrap_err();
        assert!(matches!(err, Error::MdcMismatch { .. }));
    }

    #[test]
    fn test_tampered_body_detected() {
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        let sym = SymmetricKeyAlgorithm::Aes128;
        let key = vec![0x2C; sym.key_size()];

        let packet =
            SymEncryptedProtectedData::encrypt(&mut rng, sym, &key, b"some longer payload")
                .unwrap();

        let mut data = packet.data().to_vec();
        data[sym.block_size() + 4] ^= 0x80;
        let tampered = SymEncryptedProtectedData {
            packet_version: Default::default(),
            data: data.into(),
        };

        assert!(tampered.decrypt(sym, &key).is_err());
    }
}
