use num_bigint::traits::ModInverse;
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand::{CryptoRng, Rng};

use crate::errors::Result;
use crate::types::Mpi;

/// EME-PKCS1-v1.5 encoding: `0x00 0x02 PS 0x00 M` with random non-zero
/// padding filling the block.
fn eme_pkcs1_encode<R: CryptoRng + Rng>(rng: &mut R, block_len: usize, m: &[u8]) -> Result<Vec<u8>> {
    ensure!(m.len() + 11 <= block_len, "message too long for the modulus");

    let mut em = vec![0u8; block_len];
    em[1] = 0x02;
    for byte in em.iter_mut().take(block_len - m.len() - 1).skip(2) {
        let mut b = 0u8;
        while b == 0 {
            b = rng.gen();
        }
        *byte = b;
    }
    em[block_len - m.len()..].copy_from_slice(m);
    Ok(em)
}

fn eme_pkcs1_decode(em: &[u8]) -> Result<Vec<u8>> {
    ensure!(em.len() >= 11, "padded block too short");
    ensure!(em[0] == 0x00 && em[1] == 0x02, "invalid padding header");

    let sep = em[2..]
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| format_err!("missing padding separator"))?;
    ensure!(sep >= 8, "padding string too short");

    Ok(em[2 + sep + 1..].to_vec())
}

/// ElGamal encryption of a padded session key.
pub fn encrypt<R: CryptoRng + Rng>(
    rng: &mut R,
    p: &Mpi,
    g: &Mpi,
    y: &Mpi,
    plaintext: &[u8],
) -> Result<Vec<Mpi>> {
    let p = p.to_biguint();
    let g = g.to_biguint();
    let y = y.to_biguint();

    let block_len = (p.bits() + 7) / 8;
    let em = BigUint::from_bytes_be(&eme_pkcs1_encode(rng, block_len, plaintext)?);

    // ephemeral k in [1, p-1)
    let k = rng.gen_biguint_range(&BigUint::one(), &(&p - BigUint::one()));
    let c1 = g.modpow(&k, &p);
    let c2 = (em * y.modpow(&k, &p)) % &p;

    Ok(vec![Mpi::from(c1), Mpi::from(c2)])
}

/// ElGamal decryption.
pub fn decrypt(p: &Mpi, x: &Mpi, mpis: &[Mpi]) -> Result<Vec<u8>> {
    ensure_eq!(mpis.len(), 2, "ElGamal ciphertext is two MPIs");

    let p = p.to_biguint();
    let x = x.to_biguint();
    let c1 = mpis[0].to_biguint();
    let c2 = mpis[1].to_biguint();

    let s = c1.modpow(&x, &p);
    let s_inv = s
        .mod_inverse(&p)
        .and_then(|i| i.to_biguint())
        .ok_or_else(|| format_err!("no modular inverse"))?;
    let em = (c2 * s_inv) % &p;

    // restore the fixed block width the padding was built for
    let block_len = (p.bits() + 7) / 8;
    let raw = em.to_bytes_be();
    let mut block = vec![0u8; block_len - raw.len()];
    block.extend_from_slice(&raw);

    eme_pkcs1_decode(&block)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        // RFC 5114 1024-bit MODP group 2 prime, generator 2; fine for a test
        let p_raw = hex::decode(
            "B10B8F96A080E01DDE92DE5EAE5D54EC52C99FBCFB06A3C69A6A9DCA52D23B61\
             6073E28675A23D189838EF1E2EE652C013ECB4AEA906112324975C3CD49B83BF\
             ACCBDD7D90C4BD7098488E9C219A73724EFFD6FAE5644738FAA31A4FF55BCCC0\
             A151AF5F0DC8B4BD45BF37DF365C1A65E68CFDA76D4DA708DF1FB2BC2E4A4371",
        )
        .unwrap();
        let p = Mpi::from_slice(&p_raw);
        let g = Mpi::from_slice(&[2]);

        let x = rng.gen_biguint_range(&BigUint::one(), &(p.to_biguint() - BigUint::one()));
        let y = g.to_biguint().modpow(&x, &p.to_biguint());
        let x = Mpi::from(x);
        let y = Mpi::from(y);

        let session_key = b"0123456789abcdef0123456789abcdef";
        let mpis = encrypt(&mut rng, &p, &g, &y, session_key).unwrap();
        let plain = decrypt(&p, &x, &mpis).unwrap();
        assert_eq!(&plain, session_key);
    }

    #[test]
    fn test_pkcs1_padding() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let em = eme_pkcs1_encode(&mut rng, 64, b"hello").unwrap();
        assert_eq!(em.len(), 64);
        assert_eq!(em[0], 0x00);
        assert_eq!(em[1], 0x02);
        assert!(em[2..64 - 6].iter().all(|b| *b != 0));
        assert_eq!(em[64 - 6], 0x00);
        assert_eq!(eme_pkcs1_decode(&em).unwrap(), b"hello");
    }
}
