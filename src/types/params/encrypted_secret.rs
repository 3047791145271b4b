use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::aead::AeadAlgorithm;
use crate::crypto::checksum;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{PlainSecretParams, StringToKey, StringToKeyType};

/// The protection mode of encrypted secret material, derived from the
/// S2K usage octet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum S2kUsage {
    /// Usage 254: S2K derived key, SHA-1 integrity over the plaintext.
    Cfb(SymmetricKeyAlgorithm),
    /// Usage 255: S2K derived key, two octet checksum.
    ChecksumCfb(SymmetricKeyAlgorithm),
    /// Usage 253: AEAD protected secret material (crypto-refresh).
    Aead(SymmetricKeyAlgorithm, AeadAlgorithm),
    /// Any other non-zero usage octet: the octet is the cipher id itself and
    /// the key is MD5 over the passphrase, with a two octet checksum.
    LegacyCfb(SymmetricKeyAlgorithm),
}

/// Secret key material still under passphrase protection.
///
/// The ciphertext is kept verbatim so locked keys re-serialize bit exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSecretParams {
    usage: S2kUsage,
    s2k: Option<StringToKey>,
    iv: Bytes,
    data: Bytes,
}

impl EncryptedSecretParams {
    pub fn new(usage: S2kUsage, s2k: Option<StringToKey>, iv: Bytes, data: Bytes) -> Self {
        EncryptedSecretParams {
            usage,
            s2k,
            iv,
            data,
        }
    }

    /// Protects plain secret material under a passphrase (usage octet 254:
    /// S2K derived key, SHA-1 integrity).
    pub fn lock<R: rand::CryptoRng + rand::Rng>(
        rng: &mut R,
        plain: &PlainSecretParams,
        passphrase: &str,
        sym: SymmetricKeyAlgorithm,
        s2k_count: u8,
    ) -> Result<Self> {
        let s2k = StringToKey::new_default(rng, s2k_count);
        let key = s2k.derive_key(passphrase, sym.key_size())?;

        let mut iv = vec![0u8; sym.block_size()];
        rng.fill_bytes(&mut iv);

        let mut plaintext = plain.to_bytes()?;
        let sha1 = HashAlgorithm::Sha1.digest(&plaintext)?;
        plaintext.extend_from_slice(&sha1);
        sym.encrypt_with_iv_regular(&key, &iv, &mut plaintext)?;

        Ok(EncryptedSecretParams {
            usage: S2kUsage::Cfb(sym),
            s2k: Some(s2k),
            iv: iv.into(),
            data: plaintext.into(),
        })
    }

    /// Parses the body following a non-zero S2K usage octet.
    pub fn try_from_buf<B: Buf>(usage_octet: u8, i: &mut B) -> Result<Self> {
        debug_assert!(usage_octet != 0);

        match usage_octet {
            253 => {
                let sym = SymmetricKeyAlgorithm::from(i.read_u8()?);
                let aead = AeadAlgorithm::from(i.read_u8()?);
                let s2k = StringToKey::try_from_buf(&mut *i)?;
                let iv_len = aead
                    .iv_size()
                    .ok_or_else(|| format_err!("unknown aead mode {:?}", aead))?;
                let iv = i.read_take(iv_len)?;
                let data = i.rest();
                Ok(EncryptedSecretParams {
                    usage: S2kUsage::Aead(sym, aead),
                    s2k: Some(s2k),
                    iv,
                    data,
                })
            }
            254 | 255 => {
                let sym = SymmetricKeyAlgorithm::from(i.read_u8()?);
                let s2k = StringToKey::try_from_buf(&mut *i)?;
                let iv = if s2k.typ() == StringToKeyType::Gnu {
                    Bytes::new()
                } else {
                    i.read_take(sym.block_size())?
                };
                let data = i.rest();
                let usage = if usage_octet == 254 {
                    S2kUsage::Cfb(sym)
                } else {
                    S2kUsage::ChecksumCfb(sym)
                };
                Ok(EncryptedSecretParams {
                    usage,
                    s2k: Some(s2k),
                    iv,
                    data,
                })
            }
            sym => {
                let sym = SymmetricKeyAlgorithm::from(sym);
                ensure!(sym.block_size() > 0, "invalid legacy cipher id");
                let iv = i.read_take(sym.block_size())?;
                let data = i.rest();
                Ok(EncryptedSecretParams {
                    usage: S2kUsage::LegacyCfb(sym),
                    s2k: None,
                    iv,
                    data,
                })
            }
        }
    }

    pub fn usage_octet(&self) -> u8 {
        match self.usage {
            S2kUsage::Cfb(_) => 254,
            S2kUsage::ChecksumCfb(_) => 255,
            S2kUsage::Aead(_, _) => 253,
            S2kUsage::LegacyCfb(sym) => sym.into(),
        }
    }

    pub fn usage(&self) -> &S2kUsage {
        &self.usage
    }

    pub fn string_to_key(&self) -> Option<&StringToKey> {
        self.s2k.as_ref()
    }

    /// Is the plaintext guarded by a SHA-1 hash rather than a checksum?
    pub fn has_sha1_checksum(&self) -> bool {
        matches!(self.usage, S2kUsage::Cfb(_))
    }

    /// Decrypts the secret material with the given passphrase.
    pub fn unlock(&self, passphrase: &str, alg: PublicKeyAlgorithm) -> Result<PlainSecretParams> {
        let (sym, key) = match &self.usage {
            S2kUsage::Cfb(sym) | S2kUsage::ChecksumCfb(sym) => {
                let s2k = self.s2k.as_ref().expect("always parsed for 254/255");
                if s2k.typ() == StringToKeyType::Gnu {
                    unsupported_err!("gnu-dummy key holds no secret material");
                }
                (*sym, s2k.derive_key(passphrase, sym.key_size())?)
            }
            S2kUsage::LegacyCfb(sym) => {
                // pre-S2K keys hash the passphrase with MD5 directly
                let key = HashAlgorithm::Md5.digest(passphrase.as_bytes())?;
                (*sym, zeroize::Zeroizing::new(key))
            }
            S2kUsage::Aead(_, _) => {
                unsupported_err!("AEAD protected secret keys");
            }
        };

        let mut plaintext = self.data.to_vec();
        sym.decrypt_with_iv_regular(&key, &self.iv, &mut plaintext)?;

        match self.usage {
            S2kUsage::Cfb(_) => {
                ensure!(plaintext.len() > 20, "missing sha1 checksum");
                let (material, expected) = plaintext.split_at(plaintext.len() - 20);
                checksum::sha1(expected, material)?;
                PlainSecretParams::try_from_buf(alg, &mut &material[..])
            }
            S2kUsage::ChecksumCfb(_) | S2kUsage::LegacyCfb(_) => {
                ensure!(plaintext.len() > 2, "missing checksum");
                let (material, expected) = plaintext.split_at(plaintext.len() - 2);
                checksum::simple(expected, material)?;
                PlainSecretParams::try_from_buf(alg, &mut &material[..])
            }
            S2kUsage::Aead(_, _) => unreachable!("rejected above"),
        }
    }
}

impl Serialize for EncryptedSecretParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.usage_octet()])?;

        match &self.usage {
            S2kUsage::Aead(sym, aead) => {
                writer.write_all(&[u8::from(*sym), u8::from(*aead)])?;
            }
            S2kUsage::Cfb(sym) | S2kUsage::ChecksumCfb(sym) => {
                writer.write_all(&[u8::from(*sym)])?;
            }
            S2kUsage::LegacyCfb(_) => {}
        }

        if let Some(ref s2k) = self.s2k {
            s2k.to_writer(writer)?;
        }

        writer.write_all(&self.iv)?;
        writer.write_all(&self.data)?;

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 1;
        match self.usage {
            S2kUsage::Aead(_, _) => sum += 2,
            S2kUsage::Cfb(_) | S2kUsage::ChecksumCfb(_) => sum += 1,
            S2kUsage::LegacyCfb(_) => {}
        }
        if let Some(ref s2k) = self.s2k {
            sum += s2k.write_len();
        }
        sum + self.iv.len() + self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::types::Mpi;

    fn lock(
        params: &PlainSecretParams,
        passphrase: &str,
        rng: &mut ChaCha8Rng,
    ) -> EncryptedSecretParams {
        EncryptedSecretParams::lock(rng, params, passphrase, SymmetricKeyAlgorithm::Aes256, 224)
            .unwrap()
    }

    #[test]
    fn test_lock_unlock_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let params = PlainSecretParams::EddsaLegacy(Mpi::from_slice(&[0x11; 32]));

        let locked = lock(&params, "hello world", &mut rng);
        let unlocked = locked
            .unlock("hello world", PublicKeyAlgorithm::EddsaLegacy)
            .unwrap();
        assert_eq!(params, unlocked);

        assert!(locked
            .unlock("wrong passphrase", PublicKeyAlgorithm::EddsaLegacy)
            .is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let params = PlainSecretParams::Dsa(Mpi::from_slice(&[0x22; 20]));
        let locked = lock(&params, "pw", &mut rng);

        let buf = locked.to_bytes().unwrap();
        assert_eq!(buf.len(), locked.write_len());

        let usage = buf[0];
        let back = EncryptedSecretParams::try_from_buf(usage, &mut &buf[1..]).unwrap();
        assert_eq!(locked, back);
    }
}
