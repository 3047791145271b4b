use num_bigint::traits::ModInverse;
use rand::{CryptoRng, Rng};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::types::{Mpi, PlainSecretParams, PublicParams};

/// RSA decryption using PKCS1-v1.5 padding.
///
/// Decryption is always blinded; the modular exponentiation never runs on
/// the raw ciphertext.
pub fn decrypt<R: CryptoRng + Rng>(
    rng: &mut R,
    priv_key: &RsaPrivateKey,
    mpis: &[Mpi],
) -> Result<Vec<u8>> {
    ensure_eq!(mpis.len(), 1, "RSA ciphertext is a single MPI");

    let m = priv_key.decrypt_blinded(rng, Pkcs1v15Encrypt, mpis[0].as_bytes())?;
    Ok(m)
}

/// RSA encryption using PKCS1-v1.5 padding.
pub fn encrypt<R: CryptoRng + Rng>(
    rng: &mut R,
    n: &Mpi,
    e: &Mpi,
    plaintext: &[u8],
) -> Result<Vec<Mpi>> {
    let key = RsaPublicKey::new(n.to_biguint(), e.to_biguint())?;
    let data = key.encrypt(rng, Pkcs1v15Encrypt, plaintext)?;

    Ok(vec![Mpi::from_slice(&data)])
}

/// Maps the hash algorithm to the EMSA-PKCS1-v1.5 padding with the matching
/// DigestInfo prefix.
fn padding_for(hash: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    let padding = match hash {
        HashAlgorithm::Md5 => Pkcs1v15Sign::new::<md5::Md5>(),
        HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
        HashAlgorithm::Ripemd160 => Pkcs1v15Sign::new::<ripemd::Ripemd160>(),
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        HashAlgorithm::Sha224 => Pkcs1v15Sign::new::<sha2::Sha224>(),
        _ => unsupported_err!("hash algorithm {:?} for RSA signatures", hash),
    };
    Ok(padding)
}

/// Signs the digest `hashed` with EMSA-PKCS1-v1.5 encoding.
pub fn sign(priv_key: &RsaPrivateKey, hash: HashAlgorithm, hashed: &[u8]) -> Result<Vec<Mpi>> {
    let sig = priv_key.sign(padding_for(hash)?, hashed)?;
    Ok(vec![Mpi::from_slice(&sig)])
}

/// Verifies an RSA signature over `hashed`.
pub fn verify(n: &Mpi, e: &Mpi, hash: HashAlgorithm, hashed: &[u8], sig: &[Mpi]) -> Result<()> {
    ensure_eq!(sig.len(), 1, "RSA signature is a single MPI");
    let key = RsaPublicKey::new(n.to_biguint(), e.to_biguint())?;

    // the MPI strips leading zeros, the verifier wants the full width
    let sig_raw = sig[0].as_bytes();
    let width = key.size();
    ensure!(sig_raw.len() <= width, "signature longer than the modulus");
    let mut padded = vec![0u8; width - sig_raw.len()];
    padded.extend_from_slice(sig_raw);

    key.verify(padding_for(hash)?, hashed, &padded)?;
    Ok(())
}

/// Generates an RSA key pair with a probable-prime search.
pub fn generate_key<R: Rng + CryptoRng>(
    rng: &mut R,
    bit_size: usize,
) -> Result<(PublicParams, PlainSecretParams)> {
    let key = RsaPrivateKey::new(rng, bit_size)?;

    let p = &key.primes()[0];
    let q = &key.primes()[1];
    let u = p
        .clone()
        .mod_inverse(q)
        .and_then(|u| u.to_biguint())
        .ok_or_else(|| format_err!("invalid prime pair"))?;

    Ok((
        PublicParams::Rsa {
            n: key.n().into(),
            e: key.e().into(),
        },
        PlainSecretParams::Rsa {
            d: key.d().into(),
            p: p.into(),
            q: q.into(),
            u: u.into(),
        },
    ))
}

/// Rebuilds a private key from wire components, revalidating them.
///
/// The stored `u = p⁻¹ mod q` is not trusted; the CRT parameters are
/// recomputed from the primes.
pub fn private_key_from_mpis(
    n: &Mpi,
    e: &Mpi,
    d: &Mpi,
    p: &Mpi,
    q: &Mpi,
) -> Result<RsaPrivateKey> {
    let key = RsaPrivateKey::from_components(
        n.to_biguint(),
        e.to_biguint(),
        d.to_biguint(),
        vec![p.to_biguint(), q.to_biguint()],
    )?;
    key.validate()?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let n: Mpi = key.n().into();
        let e: Mpi = key.e().into();

        let session_key = b"0123456789abcdef";
        let mpis = encrypt(&mut rng, &n, &e, session_key).unwrap();
        let plain = decrypt(&mut rng, &key, &mpis).unwrap();
        assert_eq!(&plain, session_key);
    }

    #[test]
    fn test_sign_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let n: Mpi = key.n().into();
        let e: Mpi = key.e().into();

        let digest = HashAlgorithm::Sha256.digest(b"signed data").unwrap();
        let sig = sign(&key, HashAlgorithm::Sha256, &digest).unwrap();
        verify(&n, &e, HashAlgorithm::Sha256, &digest, &sig).unwrap();

        // wrong digest fails
        let other = HashAlgorithm::Sha256.digest(b"other data").unwrap();
        assert!(verify(&n, &e, HashAlgorithm::Sha256, &other, &sig).is_err());
    }

    #[test]
    fn test_generate_key_roundtrips_components() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (public_params, secret_params) = generate_key(&mut rng, 1024).unwrap();

        let (PublicParams::Rsa { n, e }, PlainSecretParams::Rsa { d, p, q, .. }) =
            (&public_params, &secret_params)
        else {
            panic!("unexpected params");
        };

        let key = private_key_from_mpis(n, e, d, p, q).unwrap();
        assert_eq!(Mpi::from(key.n()), *n);
    }
}
