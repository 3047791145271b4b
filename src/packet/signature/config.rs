use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};
use rand::{CryptoRng, Rng};

use crate::crypto::hash::{HashAlgorithm, Hasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::key::{PublicKeyTrait, SecretKeyTrait};
use crate::packet::signature::subpacket::{Subpacket, SubpacketData};
use crate::packet::signature::{Signature, SignatureType, SignatureVersion};
use crate::ser::Serialize;
use crate::types::{KeyId, Tag};

/// Everything that describes a signature except the signature material
/// itself: type, algorithms and both subpacket areas.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignatureConfig {
    pub typ: SignatureType,
    pub pub_alg: PublicKeyAlgorithm,
    pub hash_alg: HashAlgorithm,

    pub hashed_subpackets: Vec<Subpacket>,
    pub unhashed_subpackets: Vec<Subpacket>,

    version_specific: SignatureVersionSpecific,
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum SignatureVersionSpecific {
    /// v2 and v3 signatures carry creation time and issuer in fixed fields.
    V3 {
        version: SignatureVersion,
        created: DateTime<Utc>,
        issuer: KeyId,
    },
    V4,
}

impl SignatureConfig {
    /// Describes a historical v2/v3 signature. Parsing only; new signatures
    /// are always v4.
    pub(crate) fn v3(
        version: SignatureVersion,
        typ: SignatureType,
        pub_alg: PublicKeyAlgorithm,
        hash_alg: HashAlgorithm,
        created: DateTime<Utc>,
        issuer: KeyId,
    ) -> Self {
        SignatureConfig {
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets: Vec::new(),
            unhashed_subpackets: Vec::new(),
            version_specific: SignatureVersionSpecific::V3 {
                version,
                created,
                issuer,
            },
        }
    }

    pub fn v4(typ: SignatureType, pub_alg: PublicKeyAlgorithm, hash_alg: HashAlgorithm) -> Self {
        SignatureConfig {
            typ,
            pub_alg,
            hash_alg,
            hashed_subpackets: Vec::new(),
            unhashed_subpackets: Vec::new(),
            version_specific: SignatureVersionSpecific::V4,
        }
    }

    pub fn version(&self) -> SignatureVersion {
        match &self.version_specific {
            SignatureVersionSpecific::V3 { version, .. } => *version,
            SignatureVersionSpecific::V4 => SignatureVersion::V4,
        }
    }

    pub(crate) fn v3_fields(&self) -> Option<(&DateTime<Utc>, &KeyId)> {
        match &self.version_specific {
            SignatureVersionSpecific::V3 {
                created, issuer, ..
            } => Some((created, issuer)),
            SignatureVersionSpecific::V4 => None,
        }
    }

    /// Signature Creation Time: fixed field for v3, hashed subpacket for v4.
    pub fn created(&self) -> Option<&DateTime<Utc>> {
        if let SignatureVersionSpecific::V3 { created, .. } = &self.version_specific {
            return Some(created);
        }

        self.hashed_subpackets.iter().find_map(|p| match p.data {
            SubpacketData::SignatureCreationTime(ref d) => Some(d),
            _ => None,
        })
    }

    /// Issuer Key ID. For v4, both areas are consulted: the id only acts as
    /// a hint, the cryptographic check runs against the purported key.
    pub fn issuer(&self) -> Option<&KeyId> {
        if let SignatureVersionSpecific::V3 { issuer, .. } = &self.version_specific {
            return Some(issuer);
        }

        self.hashed_subpackets
            .iter()
            .chain(self.unhashed_subpackets.iter())
            .find_map(|sp| match sp.data {
                SubpacketData::Issuer(ref id) => Some(id),
                _ => None,
            })
    }

    /// Appends the hashed signature data and the trailer to the context:
    /// for v4 the version/type/algorithm octets, the hashed subpacket area,
    /// and the final `0x04 0xFF len32` trailer; for v3 type and creation
    /// time. This suffix MUST be byte identical between signing and
    /// verification.
    pub fn hash_signature_data(&self, hasher: &mut dyn Hasher) -> Result<()> {
        match &self.version_specific {
            SignatureVersionSpecific::V3 { created, .. } => {
                let mut buf = [0u8; 5];
                buf[0] = self.typ.into();
                BigEndian::write_u32(&mut buf[1..], created.timestamp().try_into()?);
                hasher.update(&buf);
                Ok(())
            }
            SignatureVersionSpecific::V4 => {
                let mut res = vec![
                    SignatureVersion::V4.into(),
                    self.typ.into(),
                    self.pub_alg.into(),
                    self.hash_alg.into(),
                ];

                let hashed: &[Subpacket] = &self.hashed_subpackets;
                let hashed_len: u16 = hashed.write_len().try_into()?;
                res.extend_from_slice(&hashed_len.to_be_bytes());
                hashed.to_writer(&mut res)?;

                let len = res.len();
                hasher.update(&res);

                let mut trailer = [0x04, 0xFF, 0, 0, 0, 0];
                BigEndian::write_u32(&mut trailer[2..], len.try_into()?);
                hasher.update(&trailer);
                Ok(())
            }
        }
    }

    fn finish_sign<R, K>(
        self,
        rng: &mut R,
        key: &K,
        passphrase: &str,
        hasher: Box<dyn Hasher>,
    ) -> Result<Signature>
    where
        R: CryptoRng + Rng,
        K: SecretKeyTrait,
    {
        let hash = hasher.finish();
        let signed_hash_value = [hash[0], hash[1]];
        let signature = key.create_signature(rng, passphrase, self.hash_alg, &hash)?;

        Ok(Signature::from_config(self, signed_hash_value, signature))
    }

    fn new_hasher(&self) -> Result<Box<dyn Hasher>> {
        ensure!(
            self.version() == SignatureVersion::V4,
            "new signatures are always v4"
        );
        self.hash_alg.new_hasher()
    }

    /// Signs a binary or text document, hashing the payload chunk by chunk.
    /// Text mode normalizes line endings to CRLF on the fly.
    pub fn sign<R, K, D>(
        self,
        rng: &mut R,
        key: &K,
        passphrase: &str,
        mut data: D,
    ) -> Result<Signature>
    where
        R: CryptoRng + Rng,
        K: SecretKeyTrait,
        D: std::io::Read,
    {
        ensure!(
            matches!(self.typ, SignatureType::Binary | SignatureType::Text),
            "incompatible signature type {:?}",
            self.typ
        );

        let mut norm = crate::util::NormalizingHasher::new(
            self.new_hasher()?,
            self.typ == SignatureType::Text,
        );
        let mut buf = [0u8; 8 * 1024];
        loop {
            let read = data.read(&mut buf)?;
            if read == 0 {
                break;
            }
            norm.hash_buf(&buf[..read]);
        }
        let mut hasher = norm.done();

        self.hash_signature_data(&mut *hasher)?;
        self.finish_sign(rng, key, passphrase, hasher)
    }

    /// Signs a certification over `key` plus a user id or attribute.
    pub fn sign_certification<R, K>(
        self,
        rng: &mut R,
        signer: &K,
        passphrase: &str,
        key: &impl PublicKeyTrait,
        tag: Tag,
        id: &impl Serialize,
    ) -> Result<Signature>
    where
        R: CryptoRng + Rng,
        K: SecretKeyTrait,
    {
        let mut hasher = self.new_hasher()?;
        key.hash_public_key(&mut *hasher)?;

        let body = id.to_bytes()?;
        let prefix = match tag {
            Tag::UserId => 0xB4,
            Tag::UserAttribute => 0xD1,
            _ => bail!("invalid tag for certification: {:?}", tag),
        };
        let mut prefix_buf = [prefix, 0u8, 0u8, 0u8, 0u8];
        BigEndian::write_u32(&mut prefix_buf[1..], body.len().try_into()?);
        hasher.update(&prefix_buf);
        hasher.update(&body);

        self.hash_signature_data(&mut *hasher)?;
        self.finish_sign(rng, signer, passphrase, hasher)
    }

    /// Signs a key binding (0x18) or back signature (0x19): the hash covers
    /// `primary ‖ subkey`.
    pub fn sign_key_binding<R, K>(
        self,
        rng: &mut R,
        signer: &K,
        passphrase: &str,
        primary: &impl PublicKeyTrait,
        subkey: &impl PublicKeyTrait,
    ) -> Result<Signature>
    where
        R: CryptoRng + Rng,
        K: SecretKeyTrait,
    {
        let mut hasher = self.new_hasher()?;
        primary.hash_public_key(&mut *hasher)?;
        subkey.hash_public_key(&mut *hasher)?;

        self.hash_signature_data(&mut *hasher)?;
        self.finish_sign(rng, signer, passphrase, hasher)
    }

    /// Signs directly over a key: direct key signatures and revocations.
    pub fn sign_key<R, K>(
        self,
        rng: &mut R,
        signer: &K,
        passphrase: &str,
        key: &impl PublicKeyTrait,
    ) -> Result<Signature>
    where
        R: CryptoRng + Rng,
        K: SecretKeyTrait,
    {
        let mut hasher = self.new_hasher()?;
        key.hash_public_key(&mut *hasher)?;

        self.hash_signature_data(&mut *hasher)?;
        self.finish_sign(rng, signer, passphrase, hasher)
    }
}
