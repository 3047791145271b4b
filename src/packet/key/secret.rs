use std::io;

use bytes::Buf;
use chrono::{DateTime, Utc};
use rand::{CryptoRng, Rng};

use crate::crypto::hash::{HashAlgorithm, Hasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::{dsa, ecdh, ecdsa, eddsa, elgamal, rsa};
use crate::errors::Result;
use crate::packet::key::{PubKeyInner, PublicKeyTrait, SecretKeyTrait};
use crate::packet::public_key_encrypted_session_key::EskValues;
use crate::packet::PacketTrait;
use crate::ser::Serialize;
use crate::types::{
    Fingerprint, KeyId, KeyVersion, Mpi, PacketHeaderVersion, PlainSecretParams, PublicParams,
    SecretParams, Tag,
};

macro_rules! impl_secret_packet {
    ($name:ident, $tag:path) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            packet_version: PacketHeaderVersion,
            details: PubKeyInner,
            secret_params: SecretParams,
        }

        impl $name {
            pub fn new(details: PubKeyInner, secret_params: SecretParams) -> Self {
                Self {
                    packet_version: Default::default(),
                    details,
                    secret_params,
                }
            }

            pub fn from_buf<B: Buf>(
                packet_version: PacketHeaderVersion,
                mut i: B,
            ) -> Result<Self> {
                let details = PubKeyInner::try_from_buf(&mut i)?;
                let secret_params = SecretParams::try_from_buf(details.algorithm(), &mut i)?;
                Ok(Self {
                    packet_version,
                    details,
                    secret_params,
                })
            }

            pub fn secret_params(&self) -> &SecretParams {
                &self.secret_params
            }

            pub fn has_sha1_checksum(&self) -> bool {
                self.secret_params.has_sha1_checksum()
            }

            pub fn inner(&self) -> &PubKeyInner {
                &self.details
            }

            /// Runs `work` on the unlocked secret material. For keys without
            /// passphrase protection any passphrase succeeds.
            pub fn unlock<G, T>(&self, passphrase: &str, work: G) -> Result<T>
            where
                G: FnOnce(&PublicParams, &PlainSecretParams) -> Result<T>,
            {
                let public_params = self.details.public_params();
                self.secret_params
                    .unlock(passphrase, self.details.algorithm(), |plain| {
                        work(public_params, plain)
                    })
            }

            fn decrypt_session_key_inner<R: CryptoRng + Rng>(
                &self,
                rng: &mut R,
                passphrase: &str,
                values: &EskValues,
            ) -> Result<Vec<u8>> {
                let fingerprint = self.fingerprint();
                self.unlock(passphrase, |public_params, secret_params| {
                    match (public_params, secret_params, values) {
                        (PublicParams::Rsa { n, e }, PlainSecretParams::Rsa { d, p, q, .. }, EskValues::Rsa(mpi)) => {
                            let key = rsa::private_key_from_mpis(n, e, d, p, q)?;
                            rsa::decrypt(rng, &key, &[mpi.clone()])
                        }
                        (PublicParams::Elgamal { p, .. }, PlainSecretParams::Elgamal(x), EskValues::Elgamal(first, second)) => {
                            elgamal::decrypt(p, x, &[first.clone(), second.clone()])
                        }
                        (
                            PublicParams::Ecdh { curve, hash, alg_sym, .. },
                            PlainSecretParams::Ecdh(secret),
                            EskValues::Ecdh { public_point, encrypted_session_key },
                        ) => ecdh::decrypt(
                            curve,
                            *alg_sym,
                            *hash,
                            secret.as_bytes(),
                            fingerprint.as_bytes(),
                            public_point,
                            encrypted_session_key,
                        ),
                        _ => bail!(
                            "mismatched esk material for algorithm {:?}",
                            self.algorithm()
                        ),
                    }
                })
            }
        }

        impl PublicKeyTrait for $name {
            fn version(&self) -> KeyVersion {
                self.details.version()
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.details.algorithm()
            }

            fn created_at(&self) -> &DateTime<Utc> {
                self.details.created_at()
            }

            fn public_params(&self) -> &PublicParams {
                self.details.public_params()
            }

            fn fingerprint(&self) -> Fingerprint {
                self.details.fingerprint()
            }

            fn key_id(&self) -> KeyId {
                self.details.key_id()
            }

            fn hash_public_key(&self, hasher: &mut dyn Hasher) -> Result<()> {
                self.details.hash_public_key(hasher)
            }

            fn verify_signature(
                &self,
                hash: HashAlgorithm,
                hashed: &[u8],
                sig: &[Mpi],
            ) -> Result<()> {
                self.details.verify_signature(hash, hashed, sig)
            }

            fn encrypt_session_key<R: CryptoRng + Rng>(
                &self,
                rng: &mut R,
                plain: &[u8],
            ) -> Result<EskValues> {
                self.details.encrypt_session_key(rng, plain)
            }
        }

        impl SecretKeyTrait for $name {
            fn decrypt_session_key<R: CryptoRng + Rng>(
                &self,
                rng: &mut R,
                passphrase: &str,
                values: &EskValues,
            ) -> Result<Vec<u8>> {
                self.decrypt_session_key_inner(rng, passphrase, values)
            }

            fn create_signature<R: CryptoRng + Rng>(
                &self,
                rng: &mut R,
                passphrase: &str,
                hash: HashAlgorithm,
                hashed: &[u8],
            ) -> Result<Vec<Mpi>> {
                self.unlock(passphrase, |public_params, secret_params| {
                    match (public_params, secret_params) {
                        (PublicParams::Rsa { n, e }, PlainSecretParams::Rsa { d, p, q, .. }) => {
                            let key = rsa::private_key_from_mpis(n, e, d, p, q)?;
                            rsa::sign(&key, hash, hashed)
                        }
                        (PublicParams::Dsa { p, q, g, .. }, PlainSecretParams::Dsa(x)) => {
                            dsa::sign(rng, p, q, g, x, hashed)
                        }
                        (PublicParams::Ecdsa { curve, .. }, PlainSecretParams::Ecdsa(secret)) => {
                            ecdsa::sign(curve, secret.as_bytes(), hashed)
                        }
                        (
                            PublicParams::EddsaLegacy { .. },
                            PlainSecretParams::EddsaLegacy(secret),
                        ) => {
                            // secret scalars are stored stripped
                            let mut padded = vec![0u8; 32 - secret.len().min(32)];
                            padded.extend_from_slice(secret.as_bytes());
                            eddsa::sign(&padded, hashed)
                        }
                        _ => bail!(
                            "key algorithm {:?} can not produce signatures",
                            self.algorithm()
                        ),
                    }
                })
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.details.to_writer(writer)?;
                self.secret_params.to_writer(writer)?;
                Ok(())
            }

            fn write_len(&self) -> usize {
                self.details.write_len() + self.secret_params.write_len()
            }
        }

        impl PacketTrait for $name {
            fn packet_version(&self) -> PacketHeaderVersion {
                self.packet_version
            }

            fn tag(&self) -> Tag {
                $tag
            }
        }
    };
}

impl_secret_packet!(SecretKey, Tag::SecretKey);
impl_secret_packet!(SecretSubkey, Tag::SecretSubkey);

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn eddsa_secret_key(rng: &mut ChaCha8Rng) -> SecretKey {
        let (public_params, secret_params) = crate::crypto::eddsa::generate_key(rng);
        let inner = PubKeyInner::new(
            KeyVersion::V4,
            PublicKeyAlgorithm::EddsaLegacy,
            Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
            None,
            public_params,
        )
        .unwrap();
        SecretKey::new(inner, SecretParams::Plain(secret_params))
    }

    #[test]
    fn test_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let key = eddsa_secret_key(&mut rng);

        let buf = key.to_bytes().unwrap();
        assert_eq!(buf.len(), key.write_len());

        let back = SecretKey::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(key, back);
        assert_eq!(key.fingerprint(), back.fingerprint());
    }

    #[test]
    fn test_sign_and_verify() {
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let key = eddsa_secret_key(&mut rng);

        let digest = HashAlgorithm::Sha256.digest(b"some data").unwrap();
        let sig = key
            .create_signature(&mut rng, "", HashAlgorithm::Sha256, &digest)
            .unwrap();

        key.verify_signature(HashAlgorithm::Sha256, &digest, &sig)
            .unwrap();
    }
}
