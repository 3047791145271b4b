use elliptic_curve::sec1::ToEncodedPoint;
use rand::{CryptoRng, Rng};
use signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::crypto::ecc_curve::EccCurve;
use crate::errors::{BadSignatureSnafu, Result};
use crate::types::{Mpi, PlainSecretParams, PublicParams};

/// Left-pads a stripped MPI to the field width of the curve.
fn pad_scalar(raw: &[u8], width: usize) -> Result<Vec<u8>> {
    ensure!(raw.len() <= width, "scalar wider than the field");
    let mut out = vec![0u8; width - raw.len()];
    out.extend_from_slice(raw);
    Ok(out)
}

macro_rules! ecdsa_impl {
    ($krate:ident, $verify:ident, $sign:ident, $width:expr) => {
        fn $verify(p: &[u8], hashed: &[u8], sig: &[Mpi]) -> Result<()> {
            use $krate::ecdsa::{Signature, VerifyingKey};

            let r = pad_scalar(sig[0].as_bytes(), $width)?;
            let s = pad_scalar(sig[1].as_bytes(), $width)?;
            let mut bytes = r;
            bytes.extend_from_slice(&s);
            let signature = Signature::from_slice(&bytes)?;

            // rejects points at infinity and off-curve points
            let key = VerifyingKey::from_sec1_bytes(p)?;
            key.verify_prehash(hashed, &signature).map_err(|_| {
                BadSignatureSnafu {
                    message: "ECDSA verification failed".to_string(),
                }
                .build()
            })
        }

        fn $sign(secret: &[u8], hashed: &[u8]) -> Result<(Mpi, Mpi)> {
            use $krate::ecdsa::{Signature, SigningKey};

            let secret = pad_scalar(secret, $width)?;
            let key = SigningKey::from_slice(&secret)?;
            let signature: Signature = key.sign_prehash(hashed)?;
            let (r, s) = signature.split_bytes();

            Ok((Mpi::from_slice(&r), Mpi::from_slice(&s)))
        }
    };
}

ecdsa_impl!(p256, verify_p256, sign_p256, 32);
ecdsa_impl!(p384, verify_p384, sign_p384, 48);
ecdsa_impl!(p521, verify_p521, sign_p521, 66);
ecdsa_impl!(k256, verify_k256, sign_k256, 32);

/// Verifies an ECDSA signature.
pub fn verify(curve: &EccCurve, p: &[u8], hashed: &[u8], sig: &[Mpi]) -> Result<()> {
    ensure_eq!(sig.len(), 2, "ECDSA signatures are two MPIs");

    match curve {
        EccCurve::P256 => verify_p256(p, hashed, sig),
        EccCurve::P384 => verify_p384(p, hashed, sig),
        EccCurve::P521 => verify_p521(p, hashed, sig),
        EccCurve::Secp256k1 => verify_k256(p, hashed, sig),
        _ => unsupported_err!("ECDSA on {}", curve),
    }
}

/// Creates an ECDSA signature over `hashed` (deterministic RFC 6979 nonces).
pub fn sign(curve: &EccCurve, secret: &[u8], hashed: &[u8]) -> Result<Vec<Mpi>> {
    let (r, s) = match curve {
        EccCurve::P256 => sign_p256(secret, hashed)?,
        EccCurve::P384 => sign_p384(secret, hashed)?,
        EccCurve::P521 => sign_p521(secret, hashed)?,
        EccCurve::Secp256k1 => sign_k256(secret, hashed)?,
        _ => unsupported_err!("ECDSA on {}", curve),
    };

    Ok(vec![r, s])
}

/// Generates an ECDSA key pair on the given curve.
pub fn generate_key<R: Rng + CryptoRng>(
    rng: &mut R,
    curve: &EccCurve,
) -> Result<(PublicParams, PlainSecretParams)> {
    let (p, secret) = match curve {
        EccCurve::P256 => {
            let secret = p256::SecretKey::random(rng);
            let p = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
            (p, secret.to_bytes().to_vec())
        }
        EccCurve::P384 => {
            let secret = p384::SecretKey::random(rng);
            let p = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
            (p, secret.to_bytes().to_vec())
        }
        EccCurve::P521 => {
            let secret = p521::SecretKey::random(rng);
            let p = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
            (p, secret.to_bytes().to_vec())
        }
        EccCurve::Secp256k1 => {
            let secret = k256::SecretKey::random(rng);
            let p = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
            (p, secret.to_bytes().to_vec())
        }
        _ => unsupported_err!("ECDSA on {}", curve),
    };

    Ok((
        PublicParams::Ecdsa {
            curve: curve.clone(),
            p: Mpi::from_raw(p),
        },
        PlainSecretParams::Ecdsa(Mpi::from_slice(&secret)),
    ))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    fn roundtrip(curve: EccCurve, hash: HashAlgorithm) {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (public_params, secret_params) = generate_key(&mut rng, &curve).unwrap();

        let (PublicParams::Ecdsa { curve, p }, PlainSecretParams::Ecdsa(secret)) =
            (&public_params, &secret_params)
        else {
            panic!("unexpected params")
        };

        let digest = hash.digest(b"ecdsa message").unwrap();
        let sig = sign(curve, secret.as_bytes(), &digest).unwrap();
        verify(curve, p.as_bytes(), &digest, &sig).unwrap();

        let other = hash.digest(b"tampered").unwrap();
        assert!(verify(curve, p.as_bytes(), &other, &sig).is_err());
    }

    #[test]
    fn test_p256() {
        roundtrip(EccCurve::P256, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_p384() {
        roundtrip(EccCurve::P384, HashAlgorithm::Sha384);
    }

    #[test]
    fn test_p521() {
        roundtrip(EccCurve::P521, HashAlgorithm::Sha512);
    }

    #[test]
    fn test_secp256k1() {
        roundtrip(EccCurve::Secp256k1, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_brainpool_unsupported() {
        let digest = HashAlgorithm::Sha256.digest(b"x").unwrap();
        let sig = vec![Mpi::from_slice(&[1]), Mpi::from_slice(&[2])];
        assert!(verify(&EccCurve::BrainpoolP256r1, &[0x04], &digest, &sig).is_err());
    }
}
