use std::io;

use bytes::Buf;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;

const EXPBIAS: u32 = 6;

/// String-to-Key specifier.
///
/// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringToKey {
    typ: StringToKeyType,
    hash: HashAlgorithm,
    salt: Option<[u8; 8]>,
    count: Option<u8>,
}

/// Available String-To-Key types.
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum StringToKeyType {
    Simple = 0,
    Salted = 1,
    Reserved = 2,
    IteratedAndSalted = 3,
    /// The GnuPG dummy marker for offline or smartcard backed secrets.
    Gnu = 101,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for StringToKeyType {
    fn default() -> Self {
        Self::IteratedAndSalted
    }
}

impl StringToKeyType {
    pub fn has_salt(self) -> bool {
        matches!(
            self,
            StringToKeyType::Salted | StringToKeyType::IteratedAndSalted
        )
    }

    pub fn has_count(self) -> bool {
        matches!(self, StringToKeyType::IteratedAndSalted)
    }
}

impl StringToKey {
    pub fn new_default<R: CryptoRng + Rng>(rng: &mut R, count: u8) -> Self {
        StringToKey::new_iterated(rng, HashAlgorithm::default(), count)
    }

    pub fn new_iterated<R: CryptoRng + Rng>(rng: &mut R, hash: HashAlgorithm, count: u8) -> Self {
        let mut salt = [0u8; 8];
        rng.fill(&mut salt[..]);

        StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash,
            salt: Some(salt),
            count: Some(count),
        }
    }

    pub fn try_from_buf<B: Buf>(mut i: B) -> Result<Self> {
        let typ = StringToKeyType::from(i.read_u8()?);
        let hash = HashAlgorithm::from(i.read_u8()?);

        // the gnu-dummy extension replaces the salt with "GNU" + mode octet
        if typ == StringToKeyType::Gnu {
            i.read_tag(b"GNU")?;
            let _mode = i.read_u8()?;
            return Ok(StringToKey {
                typ,
                hash,
                salt: None,
                count: None,
            });
        }

        let salt = if typ.has_salt() {
            Some(i.read_array::<8>()?)
        } else {
            None
        };
        let count = if typ.has_count() {
            Some(i.read_u8()?)
        } else {
            None
        };

        Ok(StringToKey {
            typ,
            hash,
            salt,
            count,
        })
    }

    pub fn typ(&self) -> StringToKeyType {
        self.typ
    }

    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_ref().map(|salt| &salt[..])
    }

    /// Decodes the coded count octet into the actual octet count.
    /// Ref: <https://tools.ietf.org/html/rfc4880#section-3.7.1.3>
    pub fn count(&self) -> Option<usize> {
        self.count
            .map(|c| ((16u32 + u32::from(c & 15)) << (u32::from(c >> 4) + EXPBIAS)) as usize)
    }

    /// Derives `key_size` bytes of key material from `passphrase`.
    ///
    /// Successive hash contexts are preloaded with 0, 1, 2, ... zero bytes
    /// and their outputs concatenated until enough material is available.
    pub fn derive_key(&self, passphrase: &str, key_size: usize) -> Result<Zeroizing<Vec<u8>>> {
        let digest_size = self.hash.digest_size();
        ensure!(digest_size > 0, "invalid hash algorithm {:?}", self.hash);
        let rounds = key_size.div_ceil(digest_size);

        let pw = passphrase.as_bytes();
        let mut key = Zeroizing::new(Vec::with_capacity(key_size));

        for round in 0..rounds {
            let mut hasher = self.hash.new_hasher()?;

            if round > 0 {
                hasher.update(&vec![0u8; round][..]);
            }

            match self.typ {
                StringToKeyType::Simple => {
                    hasher.update(pw);
                }
                StringToKeyType::Salted => {
                    let salt = self.salt.as_ref().expect("salted always has a salt");
                    hasher.update(salt);
                    hasher.update(pw);
                }
                StringToKeyType::IteratedAndSalted => {
                    let salt = self.salt.as_ref().expect("iterated always has a salt");
                    let data_size = salt.len() + pw.len();
                    let mut count = self.count().expect("iterated always has a count");

                    // at least one full pass over salt + passphrase
                    if count < data_size {
                        count = data_size;
                    }

                    while count > data_size {
                        hasher.update(salt);
                        hasher.update(pw);
                        count -= data_size;
                    }

                    if count < salt.len() {
                        hasher.update(&salt[..count]);
                    } else {
                        hasher.update(salt);
                        count -= salt.len();
                        hasher.update(&pw[..count]);
                    }
                }
                StringToKeyType::Gnu => {
                    unsupported_err!("gnu-dummy s2k carries no key material");
                }
                _ => unsupported_err!("S2K {:?}", self.typ),
            }

            let digest = hasher.finish();
            let needed = key_size - key.len();
            key.extend_from_slice(&digest[..needed.min(digest.len())]);
        }

        Ok(key)
    }
}

impl Serialize for StringToKey {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[u8::from(self.typ), u8::from(self.hash)])?;

        if self.typ == StringToKeyType::Gnu {
            writer.write_all(b"GNU\x01")?;
            return Ok(());
        }

        if let Some(ref salt) = self.salt {
            writer.write_all(salt)?;
        }
        if let Some(count) = self.count {
            writer.write_all(&[count])?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 2;
        if self.typ == StringToKeyType::Gnu {
            return sum + 4;
        }
        if self.salt.is_some() {
            sum += 8;
        }
        if self.count.is_some() {
            sum += 1;
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_count_decoding() {
        let s2k = StringToKey {
            typ: StringToKeyType::IteratedAndSalted,
            hash: HashAlgorithm::Sha256,
            salt: Some([0u8; 8]),
            count: Some(96),
        };
        // 96 => (16 + 0) << (6 + 6) = 65536
        assert_eq!(s2k.count(), Some(65536));

        let s2k = StringToKey {
            count: Some(255),
            ..s2k
        };
        assert_eq!(s2k.count(), Some(65_011_712));
    }

    #[test]
    fn test_derive_key_simple_sha1() {
        // gnupg: simple SHA1 of the passphrase, truncated/extended to key size
        let s2k = StringToKey {
            typ: StringToKeyType::Simple,
            hash: HashAlgorithm::Sha1,
            salt: None,
            count: None,
        };
        let key = s2k.derive_key("hello world", 16).unwrap();
        let digest = HashAlgorithm::Sha1.digest(b"hello world").unwrap();
        assert_eq!(&key[..], &digest[..16]);
    }

    #[test]
    fn test_derive_key_longer_than_digest() {
        let s2k = StringToKey {
            typ: StringToKeyType::Simple,
            hash: HashAlgorithm::Sha1,
            salt: None,
            count: None,
        };
        // 24 byte key from a 20 byte digest needs a second, zero-prefixed round
        let key = s2k.derive_key("passphrase", 24).unwrap();
        let first = HashAlgorithm::Sha1.digest(b"passphrase").unwrap();
        let second = HashAlgorithm::Sha1.digest(b"\x00passphrase").unwrap();
        assert_eq!(&key[..20], &first[..]);
        assert_eq!(&key[20..], &second[..4]);
    }

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let s2k = StringToKey::new_default(&mut rng, 224);

        let buf = s2k.to_bytes().unwrap();
        assert_eq!(buf.len(), s2k.write_len());

        let back = StringToKey::try_from_buf(&mut &buf[..]).unwrap();
        assert_eq!(s2k, back);
    }
}
