use std::fmt;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;

/// Elliptic curves addressed by their DER OID on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EccCurve {
    Curve25519,
    Ed25519,
    P256,
    P384,
    P521,
    BrainpoolP256r1,
    BrainpoolP384r1,
    BrainpoolP512r1,
    Secp256k1,
    Unknown(Vec<u8>),
}

impl EccCurve {
    /// Standard name
    pub fn name(&self) -> &str {
        match self {
            EccCurve::Curve25519 => "Curve25519",
            EccCurve::Ed25519 => "Ed25519",
            EccCurve::P256 => "NIST P-256",
            EccCurve::P384 => "NIST P-384",
            EccCurve::P521 => "NIST P-521",
            EccCurve::BrainpoolP256r1 => "brainpoolP256r1",
            EccCurve::BrainpoolP384r1 => "brainpoolP384r1",
            EccCurve::BrainpoolP512r1 => "brainpoolP512r1",
            EccCurve::Secp256k1 => "secp256k1",
            EccCurve::Unknown(_) => "unknown",
        }
    }

    /// The raw DER OID body, as written on the wire behind a length octet.
    pub fn oid(&self) -> Vec<u8> {
        match self {
            EccCurve::Curve25519 => vec![0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01],
            EccCurve::Ed25519 => vec![0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01],
            EccCurve::P256 => vec![0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07],
            EccCurve::P384 => vec![0x2B, 0x81, 0x04, 0x00, 0x22],
            EccCurve::P521 => vec![0x2B, 0x81, 0x04, 0x00, 0x23],
            EccCurve::BrainpoolP256r1 => vec![0x2B, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01, 0x07],
            EccCurve::BrainpoolP384r1 => vec![0x2B, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01, 0x0B],
            EccCurve::BrainpoolP512r1 => vec![0x2B, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01, 0x0D],
            EccCurve::Secp256k1 => vec![0x2B, 0x81, 0x04, 0x00, 0x0A],
            EccCurve::Unknown(oid) => oid.clone(),
        }
    }

    /// Nominal bit length of the curve.
    pub fn nbits(&self) -> u16 {
        match self {
            EccCurve::Curve25519 => 255,
            EccCurve::Ed25519 => 255,
            EccCurve::P256 => 256,
            EccCurve::P384 => 384,
            EccCurve::P521 => 521,
            EccCurve::BrainpoolP256r1 => 256,
            EccCurve::BrainpoolP384r1 => 384,
            EccCurve::BrainpoolP512r1 => 512,
            EccCurve::Secp256k1 => 256,
            EccCurve::Unknown(_) => 0,
        }
    }

    /// Length of the secret scalar in bytes.
    pub fn secret_key_length(&self) -> usize {
        match self {
            EccCurve::Curve25519 | EccCurve::Ed25519 => 32,
            EccCurve::P256 | EccCurve::BrainpoolP256r1 | EccCurve::Secp256k1 => 32,
            EccCurve::P384 | EccCurve::BrainpoolP384r1 => 48,
            EccCurve::P521 => 66,
            EccCurve::BrainpoolP512r1 => 64,
            EccCurve::Unknown(_) => 0,
        }
    }

    /// The hash algorithm paired with this curve for ECDH KDF.
    pub fn hash_algo(&self) -> HashAlgorithm {
        match self {
            EccCurve::Curve25519 | EccCurve::Ed25519 => HashAlgorithm::Sha256,
            EccCurve::P256 | EccCurve::BrainpoolP256r1 | EccCurve::Secp256k1 => {
                HashAlgorithm::Sha256
            }
            EccCurve::P384 | EccCurve::BrainpoolP384r1 => HashAlgorithm::Sha384,
            EccCurve::P521 | EccCurve::BrainpoolP512r1 => HashAlgorithm::Sha512,
            EccCurve::Unknown(_) => HashAlgorithm::Sha512,
        }
    }

    /// The key wrapping cipher paired with this curve for ECDH.
    pub fn sym_algo(&self) -> SymmetricKeyAlgorithm {
        match self {
            EccCurve::Curve25519 | EccCurve::Ed25519 => SymmetricKeyAlgorithm::Aes128,
            EccCurve::P256 | EccCurve::BrainpoolP256r1 | EccCurve::Secp256k1 => {
                SymmetricKeyAlgorithm::Aes128
            }
            EccCurve::P384 | EccCurve::BrainpoolP384r1 => SymmetricKeyAlgorithm::Aes192,
            EccCurve::P521 | EccCurve::BrainpoolP512r1 => SymmetricKeyAlgorithm::Aes256,
            EccCurve::Unknown(_) => SymmetricKeyAlgorithm::Aes256,
        }
    }
}

/// Get the right curve given a raw oid.
pub fn ecc_curve_from_oid(oid: &[u8]) -> Option<EccCurve> {
    if oid.is_empty() || oid.len() == 0xFF {
        // reserved lengths
        return None;
    }

    for curve in [
        EccCurve::Curve25519,
        EccCurve::Ed25519,
        EccCurve::P256,
        EccCurve::P384,
        EccCurve::P521,
        EccCurve::BrainpoolP256r1,
        EccCurve::BrainpoolP384r1,
        EccCurve::BrainpoolP512r1,
        EccCurve::Secp256k1,
    ] {
        if curve.oid() == oid {
            return Some(curve);
        }
    }

    Some(EccCurve::Unknown(oid.to_vec()))
}

impl fmt::Display for EccCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_roundtrip() {
        for curve in [
            EccCurve::Curve25519,
            EccCurve::Ed25519,
            EccCurve::P256,
            EccCurve::P384,
            EccCurve::P521,
            EccCurve::BrainpoolP256r1,
            EccCurve::BrainpoolP384r1,
            EccCurve::BrainpoolP512r1,
            EccCurve::Secp256k1,
        ] {
            assert_eq!(ecc_curve_from_oid(&curve.oid()), Some(curve));
        }
    }

    #[test]
    fn test_known_oids() {
        assert_eq!(
            EccCurve::P256.oid(),
            vec![0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07]
        );
        assert_eq!(EccCurve::P384.oid(), vec![0x2B, 0x81, 0x04, 0x00, 0x22]);
        assert_eq!(EccCurve::P521.oid(), vec![0x2B, 0x81, 0x04, 0x00, 0x23]);
        assert_eq!(
            EccCurve::Ed25519.oid(),
            vec![0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01]
        );
        assert_eq!(
            EccCurve::Curve25519.oid(),
            vec![0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01]
        );
    }

    #[test]
    fn test_unknown_oid_preserved() {
        // brainpoolP160r1, not in the registry
        let oid = [0x2B, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01, 0x01];
        let curve = ecc_curve_from_oid(&oid).unwrap();
        assert_eq!(curve, EccCurve::Unknown(oid.to_vec()));
        assert_eq!(curve.oid(), oid.to_vec());
    }
}
