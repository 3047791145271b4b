use num_bigint::traits::ModInverse;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, Rng};

use crate::errors::{BadSignatureSnafu, Result};
use crate::types::Mpi;

/// Truncates the digest to the bit length of `q`, interpreted big-endian.
///
/// Ref: FIPS 186-4, 4.2: only the leftmost min(N, outlen) bits are used.
fn hash_to_int(hashed: &[u8], q: &BigUint) -> BigUint {
    let q_bits = q.bits();
    let mut h = BigUint::from_bytes_be(hashed);
    let h_bits = hashed.len() * 8;
    if h_bits > q_bits {
        h >>= h_bits - q_bits;
    }
    h
}

fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    a.clone()
        .mod_inverse(m)
        .and_then(|i| i.to_biguint())
        .ok_or_else(|| format_err!("no modular inverse"))
}

/// DSA signature generation.
pub fn sign<R: CryptoRng + Rng>(
    rng: &mut R,
    p: &Mpi,
    q: &Mpi,
    g: &Mpi,
    x: &Mpi,
    hashed: &[u8],
) -> Result<Vec<Mpi>> {
    let p = p.to_biguint();
    let q = q.to_biguint();
    let g = g.to_biguint();
    let x = x.to_biguint();

    let h = hash_to_int(hashed, &q);

    loop {
        let k = rng.gen_biguint_range(&BigUint::one(), &q);
        let r = g.modpow(&k, &p) % &q;
        if r.is_zero() {
            continue;
        }

        let kinv = mod_inverse(&k, &q)?;
        let s = (&kinv * (&h + &x * &r)) % &q;
        if s.is_zero() {
            continue;
        }

        return Ok(vec![Mpi::from(r), Mpi::from(s)]);
    }
}

/// DSA signature verification.
pub fn verify(p: &Mpi, q: &Mpi, g: &Mpi, y: &Mpi, hashed: &[u8], sig: &[Mpi]) -> Result<()> {
    ensure_eq!(sig.len(), 2, "DSA signatures are two MPIs");

    let p = p.to_biguint();
    let q = q.to_biguint();
    let g = g.to_biguint();
    let y = y.to_biguint();
    let r = sig[0].to_biguint();
    let s = sig[1].to_biguint();

    if r.is_zero() || r >= q || s.is_zero() || s >= q {
        return BadSignatureSnafu {
            message: "DSA r/s out of range".to_string(),
        }
        .fail();
    }

    let h = hash_to_int(hashed, &q);

    let w = mod_inverse(&s, &q)?;
    let u1 = (&h * &w) % &q;
    let u2 = (&r * &w) % &q;
    let v = ((g.modpow(&u1, &p) * y.modpow(&u2, &p)) % &p) % &q;

    if v == r {
        Ok(())
    } else {
        BadSignatureSnafu {
            message: "DSA verification failed".to_string(),
        }
        .fail()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    // 1024/160 bit domain parameters, only for testing
    fn test_params() -> (Mpi, Mpi, Mpi) {
        let p = hex::decode(
            "fd7f53811d75122952df4a9c2eece4e7f611b7523cef4400c31e3f80b6512669\
             455d402251fb593d8d58fabfc5f5ba30f6cb9b556cd7813b801d346ff26660b7\
             6b9950a5a49f9fe8047b1022c24fbba9d7feb7c61bf83b57e7c6a8a6150f04fb\
             83f6d3c51ec3023554135a169132f675f3ae2b61d72aeff22203199dd14801c7",
        )
        .unwrap();
        let q = hex::decode("9760508f15230bccb292b982a2eb840bf0581cf5").unwrap();
        let g = hex::decode(
            "f7e1a085d69b3ddecbbcab5c36b857b97994afbbfa3aea82f9574c0b3d078267\
             5159578ebad4594fe67107108180b449167123e84c281613b7cf09328cc8a6e1\
             3c167a8b547c8d28e0a3ae1e2bb3a675916ea37f0bfa213562f1fb627a01243b\
             cca4f1bea8519089a883dfe15ae59f06928b665e807b552564014c3bfecf492a",
        )
        .unwrap();
        (
            Mpi::from_slice(&p),
            Mpi::from_slice(&q),
            Mpi::from_slice(&g),
        )
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (p, q, g) = test_params();

        // x random in [1, q), y = g^x mod p
        let x = rng.gen_biguint_range(&BigUint::one(), &q.to_biguint());
        let y = g.to_biguint().modpow(&x, &p.to_biguint());
        let x = Mpi::from(x);
        let y = Mpi::from(y);

        let digest = HashAlgorithm::Sha256.digest(b"dsa message").unwrap();
        let sig = sign(&mut rng, &p, &q, &g, &x, &digest).unwrap();
        verify(&p, &q, &g, &y, &digest, &sig).unwrap();

        let other = HashAlgorithm::Sha256.digest(b"not the message").unwrap();
        assert!(verify(&p, &q, &g, &y, &other, &sig).is_err());
    }
}
