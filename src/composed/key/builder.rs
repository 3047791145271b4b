use chrono::{DateTime, SubsecRound, Utc};
use rand::{CryptoRng, Rng};
use smallvec::smallvec;

use crate::composed::key::{
    SignedKeyDetails, SignedSecretKey, SignedSecretSubKey, SignedUser,
};
use crate::crypto::ecc_curve::EccCurve;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::crypto::{ecdh, ecdsa, eddsa, rsa};
use crate::errors::Result;
use crate::packet::{
    KeyFlags, PubKeyInner, PublicKeyTrait, SecretKey, SecretSubkey, SignatureConfig,
    SignatureType, Subpacket, SubpacketData, UserId,
};
use crate::types::{
    CompressionAlgorithm, KeyVersion, PlainSecretParams, PublicParams, SecretParams,
};

/// Key algorithms available for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyType {
    /// RSA with the given modulus size in bits.
    Rsa(usize),
    /// EdDSA over ed25519, legacy MPI framing.
    EdDsaLegacy,
    /// ECDSA on the given curve.
    Ecdsa(EccCurve),
    /// ECDH on the given curve.
    Ecdh(EccCurve),
}

impl KeyType {
    fn algorithm(&self) -> PublicKeyAlgorithm {
        match self {
            KeyType::Rsa(_) => PublicKeyAlgorithm::RsaEncryptSign,
            KeyType::EdDsaLegacy => PublicKeyAlgorithm::EddsaLegacy,
            KeyType::Ecdsa(_) => PublicKeyAlgorithm::Ecdsa,
            KeyType::Ecdh(_) => PublicKeyAlgorithm::Ecdh,
        }
    }

    fn generate<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
    ) -> Result<(PublicParams, PlainSecretParams)> {
        match self {
            KeyType::Rsa(bits) => rsa::generate_key(rng, *bits),
            KeyType::EdDsaLegacy => Ok(eddsa::generate_key(rng)),
            KeyType::Ecdsa(curve) => ecdsa::generate_key(rng, curve),
            KeyType::Ecdh(curve) => ecdh::generate_key(rng, curve),
        }
    }
}

/// A subkey to be attached to a generated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubkeyBuilder {
    key_type: KeyType,
    flags: KeyFlags,
}

impl SubkeyBuilder {
    pub fn signing(key_type: KeyType) -> Self {
        let mut flags = KeyFlags::default();
        flags.set_sign(true);
        SubkeyBuilder { key_type, flags }
    }

    pub fn encryption(key_type: KeyType) -> Self {
        let mut flags = KeyFlags::default();
        flags.set_encrypt_comms(true);
        flags.set_encrypt_storage(true);
        SubkeyBuilder { key_type, flags }
    }
}

/// Builds self signed transferable secret keys.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    key_type: KeyType,
    user_ids: Vec<String>,
    subkeys: Vec<SubkeyBuilder>,
    created_at: DateTime<Utc>,
    hash_alg: HashAlgorithm,
    preferred_symmetric: Vec<SymmetricKeyAlgorithm>,
    preferred_hash: Vec<HashAlgorithm>,
    preferred_compression: Vec<CompressionAlgorithm>,
}

impl KeyBuilder {
    pub fn new(key_type: KeyType, primary_user_id: impl Into<String>) -> Self {
        KeyBuilder {
            key_type,
            user_ids: vec![primary_user_id.into()],
            subkeys: Vec::new(),
            created_at: Utc::now().trunc_subsecs(0),
            hash_alg: HashAlgorithm::Sha256,
            preferred_symmetric: vec![
                SymmetricKeyAlgorithm::Aes256,
                SymmetricKeyAlgorithm::Aes128,
            ],
            preferred_hash: vec![HashAlgorithm::Sha256, HashAlgorithm::Sha512],
            preferred_compression: vec![CompressionAlgorithm::Uncompressed],
        }
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_ids.push(id.into());
        self
    }

    pub fn subkey(mut self, subkey: SubkeyBuilder) -> Self {
        self.subkeys.push(subkey);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at.trunc_subsecs(0);
        self
    }

    /// Generates the key material and all self signatures.
    pub fn build<R: CryptoRng + Rng>(self, rng: &mut R) -> Result<SignedSecretKey> {
        let (public_params, secret_params) = self.key_type.generate(rng)?;
        let primary_inner = PubKeyInner::new(
            KeyVersion::V4,
            self.key_type.algorithm(),
            self.created_at,
            None,
            public_params,
        )?;
        let primary = SecretKey::new(primary_inner, SecretParams::Plain(secret_params));

        let mut primary_flags = KeyFlags::default();
        primary_flags.set_certify(true);
        if self.key_type.algorithm().is_signing() {
            primary_flags.set_sign(true);
        }

        // certify each user id
        let mut users = Vec::with_capacity(self.user_ids.len());
        for (index, id) in self.user_ids.iter().enumerate() {
            let id = UserId::from_string(id);

            let mut config = SignatureConfig::v4(
                SignatureType::CertPositive,
                self.key_type.algorithm(),
                self.hash_alg,
            );
            config.hashed_subpackets = vec![
                Subpacket::critical(SubpacketData::SignatureCreationTime(self.created_at)),
                Subpacket::regular(SubpacketData::Issuer(primary.key_id())),
                Subpacket::regular(SubpacketData::KeyFlags(smallvec![primary_flags.0])),
                Subpacket::regular(SubpacketData::PreferredSymmetricAlgorithms(
                    self.preferred_symmetric.iter().copied().collect(),
                )),
                Subpacket::regular(SubpacketData::PreferredHashAlgorithms(
                    self.preferred_hash.iter().copied().collect(),
                )),
                Subpacket::regular(SubpacketData::PreferredCompressionAlgorithms(
                    self.preferred_compression.iter().copied().collect(),
                )),
                Subpacket::regular(SubpacketData::IsPrimary(index == 0)),
            ];

            let sig = config.sign_certification(
                rng,
                &primary,
                "",
                &primary,
                crate::types::Tag::UserId,
                &id,
            )?;
            users.push(SignedUser::new(id, vec![sig]));
        }

        // bind subkeys
        let mut subkeys = Vec::with_capacity(self.subkeys.len());
        for spec in &self.subkeys {
            let (public_params, secret_params) = spec.key_type.generate(rng)?;
            let inner = PubKeyInner::new(
                KeyVersion::V4,
                spec.key_type.algorithm(),
                self.created_at,
                None,
                public_params,
            )?;
            let subkey = SecretSubkey::new(inner, SecretParams::Plain(secret_params));

            let mut config = SignatureConfig::v4(
                SignatureType::SubkeyBinding,
                self.key_type.algorithm(),
                self.hash_alg,
            );
            config.hashed_subpackets = vec![
                Subpacket::critical(SubpacketData::SignatureCreationTime(self.created_at)),
                Subpacket::regular(SubpacketData::Issuer(primary.key_id())),
                Subpacket::regular(SubpacketData::KeyFlags(smallvec![spec.flags.0])),
            ];

            // signing subkeys embed a back signature by the subkey
            if spec.flags.sign() {
                let mut back_config = SignatureConfig::v4(
                    SignatureType::KeyBinding,
                    spec.key_type.algorithm(),
                    self.hash_alg,
                );
                back_config.hashed_subpackets = vec![
                    Subpacket::critical(SubpacketData::SignatureCreationTime(self.created_at)),
                    Subpacket::regular(SubpacketData::Issuer(subkey.key_id())),
                ];
                let back_sig =
                    back_config.sign_key_binding(rng, &subkey, "", &primary, &subkey)?;
                config
                    .unhashed_subpackets
                    .push(Subpacket::regular(SubpacketData::EmbeddedSignature(
                        Box::new(back_sig),
                    )));
            }

            let sig = config.sign_key_binding(rng, &primary, "", &primary, &subkey)?;
            subkeys.push(SignedSecretSubKey::new(subkey, vec![sig]));
        }

        Ok(SignedSecretKey::new(
            primary,
            SignedKeyDetails::new(Vec::new(), Vec::new(), users, Vec::new()),
            subkeys,
        ))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::ser::Serialize;

    #[test]
    fn test_eddsa_key_with_subkeys() {
        let mut rng = ChaCha8Rng::seed_from_u64(30);
        let key = KeyBuilder::new(KeyType::EdDsaLegacy, "Alice <alice@example.org>")
            .subkey(SubkeyBuilder::encryption(KeyType::Ecdh(
                EccCurve::Curve25519,
            )))
            .subkey(SubkeyBuilder::signing(KeyType::EdDsaLegacy))
            .build(&mut rng)
            .unwrap();

        key.verify().unwrap();

        let now = Utc::now();
        assert!(key.encryption_key(None, now).is_some());
        assert!(key.signing_key(None, now).is_some());
        assert_eq!(key.valid_users(now).len(), 1);
    }

    #[test]
    fn test_serialized_key_reparses() {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let key = KeyBuilder::new(KeyType::EdDsaLegacy, "Bob <bob@example.org>")
            .subkey(SubkeyBuilder::encryption(KeyType::Ecdh(
                EccCurve::Curve25519,
            )))
            .build(&mut rng)
            .unwrap();

        let bytes = key.to_bytes().unwrap();
        let parsed = SignedSecretKey::from_bytes_single(&bytes[..]).unwrap();
        assert_eq!(key, parsed);
        assert_eq!(key.fingerprint(), parsed.fingerprint());
        parsed.verify().unwrap();

        // the public projection keeps the same fingerprint and bindings
        let public = parsed.to_public();
        public.verify().unwrap();
        assert_eq!(public.fingerprint(), parsed.fingerprint());
    }
}
