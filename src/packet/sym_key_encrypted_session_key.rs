use std::io;

use bytes::{Buf, Bytes};
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, StringToKey, Tag};

/// Symmetric-Key Encrypted Session Key Packet (v4).
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.3>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymKeyEncryptedSessionKey {
    packet_version: PacketHeaderVersion,
    sym_algorithm: SymmetricKeyAlgorithm,
    s2k: StringToKey,
    /// When absent, the S2K derived key IS the session key.
    encrypted_key: Option<Bytes>,
}

impl SymKeyEncryptedSessionKey {
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 4, "unsupported skesk version");

        let sym_algorithm = SymmetricKeyAlgorithm::from(i.read_u8()?);
        let s2k = StringToKey::try_from_buf(&mut i)?;

        let encrypted_key = if i.has_remaining() {
            Some(i.rest())
        } else {
            None
        };

        Ok(SymKeyEncryptedSessionKey {
            packet_version,
            sym_algorithm,
            s2k,
            encrypted_key,
        })
    }

    /// Builds a SKESK hiding `session_key` under `passphrase`.
    ///
    /// The session key is encrypted with the S2K derived key so the message
    /// can carry additional, differently-encrypted copies of the same key.
    pub fn encrypt<R: CryptoRng + Rng>(
        rng: &mut R,
        passphrase: &str,
        session_key: &[u8],
        session_key_algorithm: SymmetricKeyAlgorithm,
        sym_algorithm: SymmetricKeyAlgorithm,
        s2k_count: u8,
    ) -> Result<Self> {
        let s2k = StringToKey::new_default(rng, s2k_count);
        let key = s2k.derive_key(passphrase, sym_algorithm.key_size())?;

        // plaintext: algorithm octet, then the session key
        let mut plaintext = Zeroizing::new(Vec::with_capacity(1 + session_key.len()));
        plaintext.push(session_key_algorithm.into());
        plaintext.extend_from_slice(session_key);

        // zero IV CFB, no prefix
        let iv = vec![0u8; sym_algorithm.block_size()];
        let mut ciphertext = plaintext.to_vec();
        sym_algorithm.encrypt_with_iv_regular(&key, &iv, &mut ciphertext)?;

        Ok(SymKeyEncryptedSessionKey {
            packet_version: Default::default(),
            sym_algorithm,
            s2k,
            encrypted_key: Some(ciphertext.into()),
        })
    }

    pub fn sym_algorithm(&self) -> SymmetricKeyAlgorithm {
        self.sym_algorithm
    }

    pub fn s2k(&self) -> &StringToKey {
        &self.s2k
    }

    pub fn encrypted_key(&self) -> Option<&Bytes> {
        self.encrypted_key.as_ref()
    }

    /// Recovers `(algorithm, session key)` with the given passphrase.
    pub fn decrypt(
        &self,
        passphrase: &str,
    ) -> Result<(SymmetricKeyAlgorithm, Zeroizing<Vec<u8>>)> {
        ensure!(
            self.sym_algorithm != SymmetricKeyAlgorithm::Plaintext,
            "skesk cipher can not be plaintext"
        );

        let key = self
            .s2k
            .derive_key(passphrase, self.sym_algorithm.key_size())?;

        match &self.encrypted_key {
            None => Ok((self.sym_algorithm, key)),
            Some(encrypted) => {
                let iv = vec![0u8; self.sym_algorithm.block_size()];
                let mut decrypted = encrypted.to_vec();
                self.sym_algorithm
                    .decrypt_with_iv_regular(&key, &iv, &mut decrypted)?;

                ensure!(decrypted.len() > 1, "truncated encrypted session key");
                let alg = SymmetricKeyAlgorithm::from(decrypted[0]);
                ensure!(
                    alg.key_size() == decrypted.len() - 1,
                    "inconsistent session key length"
                );
                Ok((alg, Zeroizing::new(decrypted[1..].to_vec())))
            }
        }
    }
}

impl Serialize for SymKeyEncryptedSessionKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[4, self.sym_algorithm.into()])?;
        self.s2k.to_writer(writer)?;
        if let Some(ref encrypted) = self.encrypted_key {
            writer.write_all(encrypted)?;
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        2 + self.s2k.write_len() + self.encrypted_key.as_ref().map_or(0, |k| k.len())
    }
}

impl PacketTrait for SymKeyEncryptedSessionKey {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::SymKeyEncryptedSessionKey
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let session_key = vec![0xAA; 32];

        let skesk = SymKeyEncryptedSessionKey::encrypt(
            &mut rng,
            "correct horse",
            &session_key,
            SymmetricKeyAlgorithm::Aes256,
            SymmetricKeyAlgorithm::Aes256,
            224,
        )
        .unwrap();

        let (alg, key) = skesk.decrypt("correct horse").unwrap();
        assert_eq!(alg, SymmetricKeyAlgorithm::Aes256);
        assert_eq!(&key[..], &session_key[..]);

        // wrong passphrase yields garbage which fails the length check
        assert!(skesk.decrypt("battery staple").is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let skesk = SymKeyEncryptedSessionKey::encrypt(
            &mut rng,
            "pw",
            &[0x01; 16],
            SymmetricKeyAlgorithm::Aes128,
            SymmetricKeyAlgorithm::Aes128,
            224,
        )
        .unwrap();

        let buf = skesk.to_bytes().unwrap();
        assert_eq!(buf.len(), skesk.write_len());

        let back = SymKeyEncryptedSessionKey::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(skesk, back);
    }
}
