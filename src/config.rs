//! Process configuration.
//!
//! A [`Config`] is an immutable record passed explicitly into the operations
//! that consult policy. [`Config::default`] is the process-wide default;
//! callers that need different knobs build their own value and thread it
//! through, so concurrent operations never share mutable state.

use crate::crypto::aead::AeadAlgorithm;
use crate::crypto::ecc_curve::EccCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::types::CompressionAlgorithm;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub preferred_hash_algorithm: HashAlgorithm,
    pub preferred_symmetric_algorithm: SymmetricKeyAlgorithm,
    pub preferred_compression_algorithm: CompressionAlgorithm,
    pub preferred_aead_algorithm: AeadAlgorithm,

    /// Produce AEAD encrypted data packets instead of SEIPD v1.
    pub aead_protect: bool,
    /// Chunk size octet for AEAD encryption, valid range 6..=56.
    pub aead_chunk_size_byte: u8,

    /// Coded iteration count octet for newly created iterated-salted S2K.
    pub s2k_iteration_count_byte: u8,
    /// Deflate level for zip/zlib compression, 1..=9.
    pub deflate_level: u32,

    /// Minimum acceptable RSA modulus size in bits.
    pub min_rsa_bits: u16,
    pub reject_curves: Vec<EccCurve>,
    /// Hash algorithms never acceptable in any signature.
    pub reject_hash_algorithms: Vec<HashAlgorithm>,
    /// Hash algorithms not acceptable for message signatures, but still fine
    /// for historical self-certifications.
    pub reject_message_hash_algorithms: Vec<HashAlgorithm>,

    /// Allow decryption of Sym. Encrypted Data packets (tag 9), which carry
    /// no integrity protection at all.
    pub allow_unauthenticated_messages: bool,
    /// Allow decrypting with keys whose binding only carries signing flags.
    pub allow_insecure_decryption_with_signing_keys: bool,
    /// Gate for the private-use GCM AEAD id (100).
    pub allow_experimental_gcm: bool,

    /// On RSA session key decryption failure, substitute a random session key
    /// instead of erroring, to blind PKCS#1 v1.5 padding oracles.
    pub constant_time_pkcs1_decryption: bool,
    /// Symmetric algorithms eligible for the constant-time substitution (all
    /// candidates must share one key size for the substitution to be sound).
    pub constant_time_pkcs1_supported_symmetric_algorithms: Vec<SymmetricKeyAlgorithm>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            preferred_hash_algorithm: HashAlgorithm::Sha256,
            preferred_symmetric_algorithm: SymmetricKeyAlgorithm::Aes256,
            preferred_compression_algorithm: CompressionAlgorithm::Uncompressed,
            preferred_aead_algorithm: AeadAlgorithm::Eax,
            aead_protect: false,
            aead_chunk_size_byte: 12,
            s2k_iteration_count_byte: 224,
            deflate_level: 6,
            min_rsa_bits: 2047,
            reject_curves: Vec::new(),
            reject_hash_algorithms: vec![HashAlgorithm::Md5, HashAlgorithm::Ripemd160],
            reject_message_hash_algorithms: vec![
                HashAlgorithm::Md5,
                HashAlgorithm::Sha1,
                HashAlgorithm::Ripemd160,
            ],
            allow_unauthenticated_messages: false,
            allow_insecure_decryption_with_signing_keys: false,
            allow_experimental_gcm: false,
            constant_time_pkcs1_decryption: false,
            constant_time_pkcs1_supported_symmetric_algorithms: vec![
                SymmetricKeyAlgorithm::Aes128,
                SymmetricKeyAlgorithm::Aes192,
                SymmetricKeyAlgorithm::Aes256,
            ],
        }
    }
}

impl Config {
    /// Checks a hash algorithm against the signature policy lists.
    pub fn check_hash(&self, hash: HashAlgorithm, for_message: bool) -> Result<()> {
        if self.reject_hash_algorithms.contains(&hash) {
            return Err(crate::errors::PolicySnafu {
                message: format!("hash algorithm {hash:?} is rejected"),
            }
            .build());
        }
        if for_message && self.reject_message_hash_algorithms.contains(&hash) {
            return Err(crate::errors::PolicySnafu {
                message: format!("hash algorithm {hash:?} is rejected for message signatures"),
            }
            .build());
        }
        Ok(())
    }

    /// Checks a curve against the reject list.
    pub fn check_curve(&self, curve: &EccCurve) -> Result<()> {
        if self.reject_curves.contains(curve) {
            return Err(crate::errors::PolicySnafu {
                message: format!("curve {} is rejected", curve.name()),
            }
            .build());
        }
        Ok(())
    }

    /// Checks an RSA modulus size against the configured minimum.
    pub fn check_rsa_bits(&self, bits: usize) -> Result<()> {
        if bits < usize::from(self.min_rsa_bits) {
            return Err(crate::errors::PolicySnafu {
                message: format!("RSA key of {bits} bits is below minimum {}", self.min_rsa_bits),
            }
            .build());
        }
        Ok(())
    }

    /// The AEAD chunk size octet, clamped to the legal range.
    pub fn chunk_size_byte(&self) -> u8 {
        self.aead_chunk_size_byte.clamp(6, 56)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.preferred_hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(
            config.preferred_symmetric_algorithm,
            SymmetricKeyAlgorithm::Aes256
        );
        assert!(!config.allow_unauthenticated_messages);
        assert!(config.check_rsa_bits(2048).is_ok());
        assert!(config.check_rsa_bits(1024).is_err());
    }

    #[test]
    fn test_hash_policy() {
        let config = Config::default();
        assert!(config.check_hash(HashAlgorithm::Sha256, true).is_ok());
        assert!(config.check_hash(HashAlgorithm::Sha1, false).is_ok());
        assert!(config.check_hash(HashAlgorithm::Sha1, true).is_err());
        assert!(config.check_hash(HashAlgorithm::Md5, false).is_err());
    }
}
