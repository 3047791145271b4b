use elliptic_curve::ecdh::EphemeralSecret;
use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use log::debug;
use rand::{CryptoRng, Rng};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::aes_kw;
use crate::crypto::ecc_curve::EccCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::types::{Mpi, PlainSecretParams, PublicParams};

/// 20 octets representing "Anonymous Sender    ".
const ANON_SENDER: [u8; 20] = [
    0x41, 0x6E, 0x6F, 0x6E, 0x79, 0x6D, 0x6F, 0x75, 0x73, 0x20, 0x53, 0x65, 0x6E, 0x64, 0x65, 0x72,
    0x20, 0x20, 0x20, 0x20,
];

/// Builds the KDF parameter block (RFC 6637 section 8).
pub fn build_ecdh_param(
    oid: &[u8],
    alg_sym: SymmetricKeyAlgorithm,
    hash: HashAlgorithm,
    fingerprint: &[u8],
) -> Vec<u8> {
    let kdf_params = [
        0x03, // length of the following fields
        0x01, // reserved for future extensions
        hash.into(),
        u8::from(alg_sym),
    ];

    let oid_len = [oid.len() as u8];
    let pkalgo = [u8::from(PublicKeyAlgorithm::Ecdh)];

    let values: Vec<&[u8]> = vec![
        &oid_len,
        oid,
        &pkalgo,
        &kdf_params,
        &ANON_SENDER[..],
        fingerprint,
    ];

    values.concat()
}

/// Key Derivation Function for ECDH (RFC 6637 section 7).
pub fn kdf(hash: HashAlgorithm, x: &[u8], length: usize, param: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let prefix = [0u8, 0, 0, 1];

    let values: Vec<&[u8]> = vec![&prefix, x, param];
    let data = values.concat();

    let mut digest = hash.digest(&data)?;
    digest.truncate(length);

    Ok(Zeroizing::new(digest))
}

/// PKCS5-style padding with a block size of 8; the pad value is the count.
fn pad(plain: &[u8]) -> Zeroizing<Vec<u8>> {
    let len = plain.len();
    let padded_len = len + 8 - (len % 8);
    let padding = (padded_len - len) as u8;

    let mut plain_padded = Zeroizing::new(plain.to_vec());
    plain_padded.resize(padded_len, padding);
    plain_padded
}

fn unpad(mut padded: Vec<u8>) -> Result<Vec<u8>> {
    let len = padded.len();
    ensure!(len > 0 && len % 8 == 0, "invalid padded key length {}", len);

    let pad = *padded.last().expect("not empty");
    ensure!(
        pad as usize <= len && pad > 0,
        "padding value out of range"
    );

    let unpadded_len = len - pad as usize;
    ensure!(
        padded[unpadded_len..].iter().all(|byte| *byte == pad),
        "inconsistent padding bytes"
    );

    padded.truncate(unpadded_len);
    ensure!(!padded.is_empty(), "empty unpadded key");
    Ok(padded)
}

fn shared_secret_decrypt_nist<C>(
    public_point: &Mpi,
    secret: &[u8],
    field_size: usize,
) -> Result<Zeroizing<Vec<u8>>>
where
    C: elliptic_curve::CurveArithmetic,
    elliptic_curve::FieldBytesSize<C>: elliptic_curve::sec1::ModulusSize,
    elliptic_curve::AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
{
    ensure_eq!(
        public_point.len(),
        1 + 2 * field_size,
        "invalid ephemeral point length"
    );

    let ephemeral = elliptic_curve::PublicKey::<C>::from_sec1_bytes(public_point.as_bytes())?;

    // secret scalars are stored as stripped MPIs, restore the field width
    let mut padded = Zeroizing::new(vec![0u8; field_size - secret.len().min(field_size)]);
    padded.extend_from_slice(secret);
    let our_secret = elliptic_curve::SecretKey::<C>::from_slice(&padded)?;

    let shared = elliptic_curve::ecdh::diffie_hellman(
        our_secret.to_nonzero_scalar(),
        ephemeral.as_affine(),
    );

    Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
}

fn shared_secret_encrypt_nist<C, R: CryptoRng + Rng>(
    rng: &mut R,
    q: &[u8],
) -> Result<(Vec<u8>, Zeroizing<Vec<u8>>)>
where
    C: elliptic_curve::CurveArithmetic,
    elliptic_curve::FieldBytesSize<C>: elliptic_curve::sec1::ModulusSize,
    elliptic_curve::AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
{
    let their_public = elliptic_curve::PublicKey::<C>::from_sec1_bytes(q)?;
    let our_secret = EphemeralSecret::<C>::random(rng);

    let shared = our_secret.diffie_hellman(&their_public);
    let encoded_public = our_secret.public_key().to_encoded_point(false);

    Ok((
        encoded_public.as_bytes().to_vec(),
        Zeroizing::new(shared.raw_secret_bytes().to_vec()),
    ))
}

/// ECDH session key decryption (RFC 6637 section 8).
#[allow(clippy::too_many_arguments)]
pub fn decrypt(
    curve: &EccCurve,
    alg_sym: SymmetricKeyAlgorithm,
    hash: HashAlgorithm,
    secret: &[u8],
    fingerprint: &[u8],
    public_point: &Mpi,
    encrypted_session_key: &[u8],
) -> Result<Vec<u8>> {
    debug!("ECDH decrypt on {}", curve);

    let shared_secret = match curve {
        EccCurve::Curve25519 => {
            ensure_eq!(public_point.len(), 33, "invalid ephemeral point length");
            ensure_eq!(public_point.as_bytes()[0], 0x40, "missing native prefix");

            let their_public = {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&public_point.as_bytes()[1..]);
                PublicKey::from(arr)
            };

            let our_secret = {
                // stored big-endian on the wire, dalek wants little-endian
                ensure!(secret.len() <= 32, "invalid secret scalar length");
                let mut le = secret.iter().rev().cloned().collect::<Vec<u8>>();
                le.resize(32, 0);
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&le);
                le.zeroize();
                StaticSecret::from(arr)
            };

            Zeroizing::new(our_secret.diffie_hellman(&their_public).to_bytes().to_vec())
        }
        EccCurve::P256 => shared_secret_decrypt_nist::<p256::NistP256>(public_point, secret, 32)?,
        EccCurve::P384 => shared_secret_decrypt_nist::<p384::NistP384>(public_point, secret, 48)?,
        EccCurve::P521 => shared_secret_decrypt_nist::<p521::NistP521>(public_point, secret, 66)?,
        _ => unsupported_err!("curve {} for ECDH", curve),
    };

    let param = build_ecdh_param(&curve.oid(), alg_sym, hash, fingerprint);
    let z = kdf(hash, &shared_secret, alg_sym.key_size(), &param)?;

    let decrypted = aes_kw::unwrap(&z, encrypted_session_key)?;
    unpad(decrypted)
}

/// ECDH session key encryption (RFC 6637 section 8).
///
/// Returns the encoded ephemeral point and the wrapped session key.
pub fn encrypt<R: CryptoRng + Rng>(
    rng: &mut R,
    curve: &EccCurve,
    alg_sym: SymmetricKeyAlgorithm,
    hash: HashAlgorithm,
    fingerprint: &[u8],
    q: &[u8],
    plain: &[u8],
) -> Result<(Mpi, Vec<u8>)> {
    debug!("ECDH encrypt on {}", curve);

    // padding (<= 8 bytes) plus the key wrap iv must stay within the one
    // octet length field of the esk
    const MAX_SIZE: usize = 239;
    ensure!(plain.len() <= MAX_SIZE, "session key too large to wrap");

    let (encoded_public, shared_secret) = match curve {
        EccCurve::Curve25519 => {
            ensure_eq!(q.len(), 33, "invalid public key length");
            ensure_eq!(q[0], 0x40, "missing native prefix");

            let their_public = {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&q[1..]);
                PublicKey::from(arr)
            };

            let mut secret_bytes = Zeroizing::new([0u8; 32]);
            rng.fill_bytes(&mut *secret_bytes);
            let our_secret = StaticSecret::from(*secret_bytes);

            let shared = our_secret.diffie_hellman(&their_public);

            let mut encoded = Vec::with_capacity(33);
            encoded.push(0x40);
            encoded.extend_from_slice(PublicKey::from(&our_secret).as_bytes());

            (encoded, Zeroizing::new(shared.as_bytes().to_vec()))
        }
        EccCurve::P256 => shared_secret_encrypt_nist::<p256::NistP256, R>(rng, q)?,
        EccCurve::P384 => shared_secret_encrypt_nist::<p384::NistP384, R>(rng, q)?,
        EccCurve::P521 => shared_secret_encrypt_nist::<p521::NistP521, R>(rng, q)?,
        _ => unsupported_err!("curve {} for ECDH", curve),
    };

    let param = build_ecdh_param(&curve.oid(), alg_sym, hash, fingerprint);
    let z = kdf(hash, &shared_secret, alg_sym.key_size(), &param)?;

    let plain_padded = pad(plain);
    let encrypted_session_key = aes_kw::wrap(&z, &plain_padded)?;

    Ok((Mpi::from_raw(encoded_public), encrypted_session_key))
}

/// Generates an ECDH key pair.
pub fn generate_key<R: Rng + CryptoRng>(
    rng: &mut R,
    curve: &EccCurve,
) -> Result<(PublicParams, PlainSecretParams)> {
    match curve {
        EccCurve::Curve25519 => {
            let mut secret_bytes = Zeroizing::new([0u8; 32]);
            rng.fill_bytes(&mut *secret_bytes);

            let secret = StaticSecret::from(*secret_bytes);
            let public = PublicKey::from(&secret);

            let mut p = Vec::with_capacity(33);
            p.push(0x40);
            p.extend_from_slice(public.as_bytes());

            // clamp, then store big-endian
            let q_raw = curve25519_dalek::scalar::clamp_integer(secret.to_bytes());
            let q = q_raw.into_iter().rev().collect::<Vec<u8>>();

            Ok((
                PublicParams::Ecdh {
                    curve: EccCurve::Curve25519,
                    p: Mpi::from_raw(p),
                    hash: curve.hash_algo(),
                    alg_sym: curve.sym_algo(),
                },
                PlainSecretParams::Ecdh(Mpi::from_raw(q)),
            ))
        }
        EccCurve::P256 => nist_keygen::<p256::NistP256, R>(rng, curve),
        EccCurve::P384 => nist_keygen::<p384::NistP384, R>(rng, curve),
        EccCurve::P521 => nist_keygen::<p521::NistP521, R>(rng, curve),
        _ => unsupported_err!("curve {} for ECDH", curve),
    }
}

fn nist_keygen<C, R: Rng + CryptoRng>(
    rng: &mut R,
    curve: &EccCurve,
) -> Result<(PublicParams, PlainSecretParams)>
where
    C: elliptic_curve::CurveArithmetic,
    elliptic_curve::FieldBytesSize<C>: elliptic_curve::sec1::ModulusSize,
    elliptic_curve::AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
{
    let secret = elliptic_curve::SecretKey::<C>::random(rng);
    let public = secret.public_key().to_encoded_point(false);

    Ok((
        PublicParams::Ecdh {
            curve: curve.clone(),
            p: Mpi::from_raw(public.as_bytes().to_vec()),
            hash: curve.hash_algo(),
            alg_sym: curve.sym_algo(),
        },
        PlainSecretParams::Ecdh(Mpi::from_slice(secret.to_bytes().as_slice())),
    ))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn roundtrip(curve: EccCurve) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (public_params, secret_params) = generate_key(&mut rng, &curve).unwrap();

        let (
            PublicParams::Ecdh {
                curve,
                p,
                hash,
                alg_sym,
            },
            PlainSecretParams::Ecdh(secret),
        ) = (&public_params, &secret_params)
        else {
            panic!("unexpected params")
        };

        let fingerprint = [0xAB; 20];
        let session_key = b"0123456789abcdef0123456789abcdef";

        let (point, esk) = encrypt(
            &mut rng,
            curve,
            *alg_sym,
            *hash,
            &fingerprint,
            p.as_bytes(),
            session_key,
        )
        .unwrap();

        let plain = decrypt(
            curve,
            *alg_sym,
            *hash,
            secret.as_bytes(),
            &fingerprint,
            &point,
            &esk,
        )
        .unwrap();

        assert_eq!(&plain, session_key);
    }

    #[test]
    fn test_curve25519_roundtrip() {
        roundtrip(EccCurve::Curve25519);
    }

    #[test]
    fn test_p256_roundtrip() {
        roundtrip(EccCurve::P256);
    }

    #[test]
    fn test_p384_roundtrip() {
        roundtrip(EccCurve::P384);
    }

    #[test]
    fn test_p521_roundtrip() {
        roundtrip(EccCurve::P521);
    }

    #[test]
    fn test_pad_unpad() {
        for len in [8usize, 16, 19, 24, 32] {
            let data = vec![0x7Fu8; len];
            let padded = pad(&data);
            assert_eq!(padded.len() % 8, 0);
            assert!(padded.len() > data.len());
            assert_eq!(unpad(padded.to_vec()).unwrap(), data);
        }
    }

    #[test]
    fn test_unpad_rejects_bad_padding() {
        assert!(unpad(vec![1, 2, 3]).is_err());
        assert!(unpad(vec![0u8; 8]).is_err());
        let mut padded = pad(b"0123456789abcdef").to_vec();
        let last = padded.len() - 1;
        padded[last] ^= 0xFF;
        assert!(unpad(padded).is_err());
    }

    #[test]
    fn test_kdf_param_layout() {
        let fingerprint = [0x01; 20];
        let param = build_ecdh_param(
            &EccCurve::Curve25519.oid(),
            SymmetricKeyAlgorithm::Aes128,
            HashAlgorithm::Sha256,
            &fingerprint,
        );
        // oid len + oid + algo + kdf params + anon sender + fingerprint
        assert_eq!(param.len(), 1 + 10 + 1 + 4 + 20 + 20);
        assert_eq!(param[0], 10);
        assert_eq!(param[11], u8::from(PublicKeyAlgorithm::Ecdh));
        assert_eq!(&param[12..16], &[0x03, 0x01, 0x08, 0x07]);
    }
}
