use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Buf;
use chrono::{DateTime, TimeZone, Utc};
use md5::Md5;
use rand::{CryptoRng, Rng};
use sha1::{Digest, Sha1};

use crate::crypto::hash::{HashAlgorithm, Hasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::{dsa, ecdh, ecdsa, eddsa, elgamal, rsa};
use crate::errors::Result;
use crate::packet::key::PublicKeyTrait;
use crate::packet::public_key_encrypted_session_key::EskValues;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{Fingerprint, KeyId, KeyVersion, Mpi, PacketHeaderVersion, PublicParams, Tag};

/// The shared contents of the four key packet types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubKeyInner {
    version: KeyVersion,
    algorithm: PublicKeyAlgorithm,
    created_at: DateTime<Utc>,
    /// v2/v3 only: validity period in days.
    expiration: Option<u16>,
    public_params: PublicParams,
}

impl PubKeyInner {
    pub fn new(
        version: KeyVersion,
        algorithm: PublicKeyAlgorithm,
        created_at: DateTime<Utc>,
        expiration: Option<u16>,
        public_params: PublicParams,
    ) -> Result<Self> {
        if (version == KeyVersion::V2 || version == KeyVersion::V3)
            && !matches!(
                algorithm,
                PublicKeyAlgorithm::RsaEncryptSign
                    | PublicKeyAlgorithm::RsaEncrypt
                    | PublicKeyAlgorithm::RsaSign
            )
        {
            bail!(
                "v2/v3 keys only support RSA, found {:?}",
                algorithm
            );
        }

        Ok(PubKeyInner {
            version,
            algorithm,
            created_at,
            expiration,
            public_params,
        })
    }

    pub fn try_from_buf<B: Buf>(i: &mut B) -> Result<Self> {
        let version = KeyVersion::from(i.read_u8()?);

        match version {
            KeyVersion::V2 | KeyVersion::V3 => {
                let created_at = read_timestamp(i)?;
                let expiration = i.read_be_u16()?;
                let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
                let public_params = PublicParams::try_from_buf(algorithm, i)?;
                Self::new(
                    version,
                    algorithm,
                    created_at,
                    Some(expiration),
                    public_params,
                )
            }
            KeyVersion::V4 => {
                let created_at = read_timestamp(i)?;
                let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
                let public_params = PublicParams::try_from_buf(algorithm, i)?;
                Self::new(version, algorithm, created_at, None, public_params)
            }
            KeyVersion::V5 | KeyVersion::Other(_) => {
                unsupported_err!("key version {:?}", version);
            }
        }
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    pub fn algorithm(&self) -> PublicKeyAlgorithm {
        self.algorithm
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn public_params(&self) -> &PublicParams {
        &self.public_params
    }

    /// V4: SHA-1 over `0x99 ‖ len16 ‖ body`. V2/V3: MD5 over the raw RSA
    /// modulus and exponent bytes.
    pub fn fingerprint(&self) -> Fingerprint {
        match self.version {
            KeyVersion::V2 | KeyVersion::V3 => {
                let mut hasher = Md5::new();
                if let PublicParams::Rsa { n, e } = &self.public_params {
                    hasher.update(n.as_bytes());
                    hasher.update(e.as_bytes());
                }
                Fingerprint::new(self.version, &hasher.finalize())
                    .expect("md5 digest length is 16")
            }
            _ => {
                let body = self.to_bytes().expect("serializing to a vec");
                let mut hasher = Sha1::new();
                hasher.update([0x99]);
                hasher.update((body.len() as u16).to_be_bytes());
                hasher.update(&body);
                Fingerprint::new(KeyVersion::V4, &hasher.finalize())
                    .expect("sha1 digest length is 20")
            }
        }
    }

    pub fn key_id(&self) -> KeyId {
        match self.version {
            KeyVersion::V2 | KeyVersion::V3 => {
                // low 64 bits of the modulus
                if let PublicParams::Rsa { n, .. } = &self.public_params {
                    let bytes = n.as_bytes();
                    if bytes.len() >= 8 {
                        return KeyId::from_slice(&bytes[bytes.len() - 8..])
                            .expect("length checked");
                    }
                }
                KeyId::WILDCARD
            }
            _ => self
                .fingerprint()
                .key_id()
                .expect("v4 fingerprints carry a key id"),
        }
    }

    pub fn hash_public_key(&self, hasher: &mut dyn Hasher) -> Result<()> {
        let body = self.to_bytes()?;
        hasher.update(&[0x99]);
        hasher.update(&(body.len() as u16).to_be_bytes());
        hasher.update(&body);
        Ok(())
    }

    pub fn verify_signature(
        &self,
        hash: HashAlgorithm,
        hashed: &[u8],
        sig: &[Mpi],
    ) -> Result<()> {
        match &self.public_params {
            PublicParams::Rsa { n, e } => rsa::verify(n, e, hash, hashed, sig),
            PublicParams::Dsa { p, q, g, y } => dsa::verify(p, q, g, y, hashed, sig),
            PublicParams::Ecdsa { curve, p } => ecdsa::verify(curve, p.as_bytes(), hashed, sig),
            PublicParams::EddsaLegacy { curve, q } => {
                eddsa::verify(curve, q.as_bytes(), hashed, sig)
            }
            PublicParams::Elgamal { .. } | PublicParams::Ecdh { .. } => {
                bail!("{:?} is not a signing algorithm", self.algorithm)
            }
            PublicParams::Unknown { alg, .. } => {
                unsupported_err!("signatures from unknown algorithm {}", alg)
            }
        }
    }

    pub fn encrypt_session_key<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        plain: &[u8],
    ) -> Result<EskValues> {
        match &self.public_params {
            PublicParams::Rsa { n, e } => {
                let mut mpis = rsa::encrypt(rng, n, e, plain)?;
                Ok(EskValues::Rsa(mpis.remove(0)))
            }
            PublicParams::Elgamal { p, g, y } => {
                let mut mpis = elgamal::encrypt(rng, p, g, y, plain)?;
                let second = mpis.remove(1);
                let first = mpis.remove(0);
                Ok(EskValues::Elgamal(first, second))
            }
            PublicParams::Ecdh {
                curve,
                p,
                hash,
                alg_sym,
            } => {
                let fingerprint = self.fingerprint();
                let (public_point, encrypted_session_key) = ecdh::encrypt(
                    rng,
                    curve,
                    *alg_sym,
                    *hash,
                    fingerprint.as_bytes(),
                    p.as_bytes(),
                    plain,
                )?;
                Ok(EskValues::Ecdh {
                    public_point,
                    encrypted_session_key: encrypted_session_key.into(),
                })
            }
            _ => bail!("{:?} is not an encryption algorithm", self.algorithm),
        }
    }
}

fn read_timestamp<B: Buf>(i: &mut B) -> Result<DateTime<Utc>> {
    let ts = i.read_be_u32()?;
    Utc.timestamp_opt(ts.into(), 0)
        .single()
        .ok_or_else(|| format_err!("invalid key creation time"))
}

impl Serialize for PubKeyInner {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.into())?;
        writer.write_u32::<BigEndian>(self.created_at.timestamp().try_into()?)?;
        if let Some(expiration) = self.expiration {
            writer.write_u16::<BigEndian>(expiration)?;
        }
        writer.write_u8(self.algorithm.into())?;
        self.public_params.to_writer(writer)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 1 + 4;
        if self.expiration.is_some() {
            sum += 2;
        }
        sum + 1 + self.public_params.write_len()
    }
}

macro_rules! impl_public_packet {
    ($name:ident, $tag:path) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            packet_version: PacketHeaderVersion,
            inner: PubKeyInner,
        }

        impl $name {
            pub fn from_inner(inner: PubKeyInner) -> Self {
                Self {
                    packet_version: Default::default(),
                    inner,
                }
            }

            pub fn from_buf<B: Buf>(
                packet_version: PacketHeaderVersion,
                mut i: B,
            ) -> Result<Self> {
                let inner = PubKeyInner::try_from_buf(&mut i)?;
                Ok(Self {
                    packet_version,
                    inner,
                })
            }

            pub fn inner(&self) -> &PubKeyInner {
                &self.inner
            }
        }

        impl PublicKeyTrait for $name {
            fn version(&self) -> KeyVersion {
                self.inner.version()
            }

            fn algorithm(&self) -> PublicKeyAlgorithm {
                self.inner.algorithm()
            }

            fn created_at(&self) -> &DateTime<Utc> {
                self.inner.created_at()
            }

            fn public_params(&self) -> &PublicParams {
                self.inner.public_params()
            }

            fn fingerprint(&self) -> Fingerprint {
                self.inner.fingerprint()
            }

            fn key_id(&self) -> KeyId {
                self.inner.key_id()
            }

            fn hash_public_key(&self, hasher: &mut dyn Hasher) -> Result<()> {
                self.inner.hash_public_key(hasher)
            }

            fn verify_signature(
                &self,
                hash: HashAlgorithm,
                hashed: &[u8],
                sig: &[Mpi],
            ) -> Result<()> {
                self.inner.verify_signature(hash, hashed, sig)
            }

            fn encrypt_session_key<R: CryptoRng + Rng>(
                &self,
                rng: &mut R,
                plain: &[u8],
            ) -> Result<EskValues> {
                self.inner.encrypt_session_key(rng, plain)
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.inner.to_writer(writer)
            }

            fn write_len(&self) -> usize {
                self.inner.write_len()
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

impl_public_packet!(PublicKey, Tag::PublicKey);
impl_public_packet!(PublicSubkey, Tag::PublicSubkey);

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn test_key() -> PublicKey {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let (public_params, _) = crate::crypto::eddsa::generate_key(&mut rng);
        let inner = PubKeyInner::new(
            KeyVersion::V4,
            PublicKeyAlgorithm::EddsaLegacy,
            Utc.timestamp_opt(1_500_000_000, 0).unwrap(),
            None,
            public_params,
        )
        .unwrap();
        PublicKey::from_inner(inner)
    }

    #[test]
    fn test_roundtrip() {
        let key = test_key();
        let buf = key.to_bytes().unwrap();
        assert_eq!(buf.len(), key.write_len());

        let back = PublicKey::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn test_fingerprint_stable_across_reencoding() {
        let key = test_key();
        let buf = key.to_bytes().unwrap();
        let back = PublicKey::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(key.fingerprint(), back.fingerprint());
        assert_eq!(key.key_id(), back.key_id());
    }

    #[test]
    fn test_fingerprint_matches_manual_hash() {
        let key = test_key();
        let body = key.to_bytes().unwrap();

        let mut hasher = Sha1::new();
        hasher.update([0x99]);
        hasher.update((body.len() as u16).to_be_bytes());
        hasher.update(&body);
        let digest = hasher.finalize();

        assert_eq!(key.fingerprint().as_bytes(), &digest[..]);
    }
}
