use std::fmt::Display;

use digest::Digest;
use md5::Md5;
use num_enum::{FromPrimitive, IntoPrimitive};
use ripemd::Ripemd160;
use sha1::Sha1;

use crate::errors::Result;

/// Available hash algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.4>
#[derive(Debug, PartialEq, Eq, Copy, Clone, FromPrimitive, IntoPrimitive, Hash)]
#[repr(u8)]
pub enum HashAlgorithm {
    None = 0,
    Md5 = 1,
    Sha1 = 2,
    Ripemd160 = 3,

    Sha256 = 8,
    Sha384 = 9,
    Sha512 = 10,
    Sha224 = 11,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::Sha256
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA1",
            Self::Ripemd160 => "RIPEMD160",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
            Self::Sha224 => "SHA224",
            Self::Other(v) => return write!(f, "Other({v})"),
        };
        write!(f, "{s}")
    }
}

/// Object safe wrapper around the rustcrypto `Digest` machinery, so hash
/// contexts can be selected by algorithm id at runtime.
pub trait Hasher: std::io::Write {
    /// Update the hash with the given value.
    fn update(&mut self, _: &[u8]);
    /// Finalize the hash and return the result.
    fn finish(self: Box<Self>) -> Vec<u8>;
}

macro_rules! derive_hasher {
    ($name:ident, $struct:path) => {
        #[derive(Clone, Default)]
        pub struct $name {
            inner: $struct,
        }

        impl Hasher for $name {
            fn update(&mut self, data: &[u8]) {
                self.inner.update(data);
            }

            fn finish(self: Box<Self>) -> Vec<u8> {
                self.inner.finalize().as_slice().to_vec()
            }
        }

        impl std::io::Write for $name {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.update(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
    };
}

derive_hasher!(Md5Hasher, Md5);
derive_hasher!(Sha1Hasher, Sha1);
derive_hasher!(Ripemd160Hasher, Ripemd160);
derive_hasher!(Sha256Hasher, sha2::Sha256);
derive_hasher!(Sha384Hasher, sha2::Sha384);
derive_hasher!(Sha512Hasher, sha2::Sha512);
derive_hasher!(Sha224Hasher, sha2::Sha224);

impl HashAlgorithm {
    /// Create a new hasher.
    pub fn new_hasher(self) -> Result<Box<dyn Hasher>> {
        match self {
            HashAlgorithm::Md5 => Ok(Box::<Md5Hasher>::default()),
            HashAlgorithm::Sha1 => Ok(Box::<Sha1Hasher>::default()),
            HashAlgorithm::Ripemd160 => Ok(Box::<Ripemd160Hasher>::default()),
            HashAlgorithm::Sha256 => Ok(Box::<Sha256Hasher>::default()),
            HashAlgorithm::Sha384 => Ok(Box::<Sha384Hasher>::default()),
            HashAlgorithm::Sha512 => Ok(Box::<Sha512Hasher>::default()),
            HashAlgorithm::Sha224 => Ok(Box::<Sha224Hasher>::default()),
            _ => unimplemented_err!("hasher {:?}", self),
        }
    }

    /// Calculate the digest of the given input data.
    pub fn digest(self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(match self {
            HashAlgorithm::Md5 => Md5::digest(data).to_vec(),
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Ripemd160 => Ripemd160::digest(data).to_vec(),
            HashAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
            HashAlgorithm::Sha224 => sha2::Sha224::digest(data).to_vec(),
            _ => unimplemented_err!("hasher {:?}", self),
        })
    }

    /// Returns the expected digest size for the given algorithm.
    pub fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 => Md5::output_size(),
            HashAlgorithm::Sha1 => Sha1::output_size(),
            HashAlgorithm::Ripemd160 => Ripemd160::output_size(),
            HashAlgorithm::Sha256 => sha2::Sha256::output_size(),
            HashAlgorithm::Sha384 => sha2::Sha384::output_size(),
            HashAlgorithm::Sha512 => sha2::Sha512::output_size(),
            HashAlgorithm::Sha224 => sha2::Sha224::output_size(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_sizes() {
        assert_eq!(HashAlgorithm::Md5.digest_size(), 16);
        assert_eq!(HashAlgorithm::Sha1.digest_size(), 20);
        assert_eq!(HashAlgorithm::Ripemd160.digest_size(), 20);
        assert_eq!(HashAlgorithm::Sha256.digest_size(), 32);
        assert_eq!(HashAlgorithm::Sha384.digest_size(), 48);
        assert_eq!(HashAlgorithm::Sha512.digest_size(), 64);
        assert_eq!(HashAlgorithm::Sha224.digest_size(), 28);
    }

    #[test]
    fn test_ids_stable() {
        assert_eq!(u8::from(HashAlgorithm::Md5), 1);
        assert_eq!(u8::from(HashAlgorithm::Sha1), 2);
        assert_eq!(u8::from(HashAlgorithm::Ripemd160), 3);
        assert_eq!(u8::from(HashAlgorithm::Sha256), 8);
        assert_eq!(u8::from(HashAlgorithm::Sha384), 9);
        assert_eq!(u8::from(HashAlgorithm::Sha512), 10);
        assert_eq!(u8::from(HashAlgorithm::Sha224), 11);
    }

    #[test]
    fn test_hasher_matches_digest() {
        let mut hasher = HashAlgorithm::Sha256.new_hasher().unwrap();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(
            hasher.finish(),
            HashAlgorithm::Sha256.digest(b"hello world").unwrap()
        );
    }
}
