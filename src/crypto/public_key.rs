use num_enum::{FromPrimitive, IntoPrimitive};

/// Available public key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    RsaEncryptSign = 1,
    /// RSA Encrypt-Only (deprecated)
    RsaEncrypt = 2,
    /// RSA Sign-Only (deprecated)
    RsaSign = 3,
    /// Elgamal (Encrypt-Only)
    Elgamal = 16,
    /// DSA (Digital Signature Algorithm)
    Dsa = 17,
    /// Elliptic Curve Diffie-Hellman
    Ecdh = 18,
    /// Elliptic Curve Digital Signature Algorithm
    Ecdsa = 19,
    /// EdDSA over legacy MPI framing
    EddsaLegacy = 22,
    /// X25519 (crypto-refresh)
    X25519 = 25,
    /// X448 (crypto-refresh)
    X448 = 26,
    /// Ed25519 (crypto-refresh)
    Ed25519 = 27,
    /// Ed448 (crypto-refresh)
    Ed448 = 28,

    #[num_enum(catch_all)]
    Other(u8),
}

impl PublicKeyAlgorithm {
    /// Can the algorithm produce signatures?
    pub fn is_signing(self) -> bool {
        matches!(
            self,
            Self::RsaEncryptSign
                | Self::RsaSign
                | Self::Dsa
                | Self::Ecdsa
                | Self::EddsaLegacy
                | Self::Ed25519
                | Self::Ed448
        )
    }

    /// Can the algorithm encrypt session keys?
    pub fn is_encryption(self) -> bool {
        matches!(
            self,
            Self::RsaEncryptSign | Self::RsaEncrypt | Self::Elgamal | Self::Ecdh | Self::X25519 | Self::X448
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_stable() {
        assert_eq!(u8::from(PublicKeyAlgorithm::RsaEncryptSign), 1);
        assert_eq!(u8::from(PublicKeyAlgorithm::RsaEncrypt), 2);
        assert_eq!(u8::from(PublicKeyAlgorithm::RsaSign), 3);
        assert_eq!(u8::from(PublicKeyAlgorithm::Elgamal), 16);
        assert_eq!(u8::from(PublicKeyAlgorithm::Dsa), 17);
        assert_eq!(u8::from(PublicKeyAlgorithm::Ecdh), 18);
        assert_eq!(u8::from(PublicKeyAlgorithm::Ecdsa), 19);
        assert_eq!(u8::from(PublicKeyAlgorithm::EddsaLegacy), 22);
        assert_eq!(u8::from(PublicKeyAlgorithm::X25519), 25);
        assert_eq!(u8::from(PublicKeyAlgorithm::X448), 26);
        assert_eq!(u8::from(PublicKeyAlgorithm::Ed25519), 27);
        assert_eq!(u8::from(PublicKeyAlgorithm::Ed448), 28);
    }
}
