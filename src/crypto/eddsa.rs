use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::{CryptoRng, Rng};

use crate::crypto::ecc_curve::EccCurve;
use crate::errors::{BadSignatureSnafu, Result};
use crate::types::{Mpi, PlainSecretParams, PublicParams};

/// EdDSA verification over the legacy MPI framing.
///
/// The public point `q` carries the single byte 0x40 marking the native
/// encoding, followed by the 32 byte compressed point. The signed data is
/// the digest produced by the signature machinery.
pub fn verify(curve: &EccCurve, q: &[u8], hashed: &[u8], sig: &[Mpi]) -> Result<()> {
    ensure_eq!(curve, &EccCurve::Ed25519, "unsupported EdDSA curve");
    ensure_eq!(sig.len(), 2, "EdDSA signatures are two MPIs");
    ensure_eq!(q.len(), 33, "invalid public point length");
    ensure_eq!(q[0], 0x40, "missing native point prefix");

    let key = VerifyingKey::from_bytes(q[1..].try_into().expect("len checked"))?;

    // r and s are stored stripped, re-pad to 32 bytes each
    let r = sig[0].as_bytes();
    let s = sig[1].as_bytes();
    ensure!(r.len() <= 32, "invalid R length");
    ensure!(s.len() <= 32, "invalid S length");

    let mut bytes = [0u8; 64];
    bytes[32 - r.len()..32].copy_from_slice(r);
    bytes[64 - s.len()..].copy_from_slice(s);

    let signature = Signature::from_bytes(&bytes);

    key.verify(hashed, &signature).map_err(|_| {
        BadSignatureSnafu {
            message: "EdDSA verification failed".to_string(),
        }
        .build()
    })
}

/// EdDSA signature generation; returns `(R, S)`.
pub fn sign(secret: &[u8], hashed: &[u8]) -> Result<Vec<Mpi>> {
    ensure_eq!(secret.len(), 32, "invalid secret key length");

    let key = SigningKey::from_bytes(secret.try_into().expect("len checked"));
    let signature = key.sign(hashed);
    let bytes = signature.to_bytes();

    Ok(vec![
        Mpi::from_slice(&bytes[..32]),
        Mpi::from_slice(&bytes[32..]),
    ])
}

/// Generates an EdDSA (ed25519) key pair.
pub fn generate_key<R: Rng + CryptoRng>(rng: &mut R) -> (PublicParams, PlainSecretParams) {
    let mut secret = [0u8; 32];
    rng.fill_bytes(&mut secret);
    let key = SigningKey::from_bytes(&secret);

    let mut q = Vec::with_capacity(33);
    q.push(0x40);
    q.extend_from_slice(key.verifying_key().as_bytes());

    (
        PublicParams::EddsaLegacy {
            curve: EccCurve::Ed25519,
            q: Mpi::from_raw(q),
        },
        PlainSecretParams::EddsaLegacy(Mpi::from_slice(&secret)),
    )
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn test_sign_verify_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let (public_params, secret_params) = generate_key(&mut rng);

        let (PublicParams::EddsaLegacy { curve, q }, PlainSecretParams::EddsaLegacy(secret)) =
            (&public_params, &secret_params)
        else {
            panic!("unexpected params")
        };

        let digest = HashAlgorithm::Sha256.digest(b"ed25519 message").unwrap();
        // secret scalars can have leading zeros stripped by the MPI encoding
        let mut padded = vec![0u8; 32 - secret.len()];
        padded.extend_from_slice(secret.as_bytes());

        let sig = sign(&padded, &digest).unwrap();
        verify(curve, q.as_bytes(), &digest, &sig).unwrap();

        let other = HashAlgorithm::Sha256.digest(b"wrong").unwrap();
        assert!(verify(curve, q.as_bytes(), &other, &sig).is_err());
    }
}
