mod builder;
mod parse;

pub use self::builder::{KeyBuilder, KeyType, SubkeyBuilder};
pub use self::parse::{parse_public_keys, parse_secret_keys};

use std::io;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::errors::{Error, Result};
use crate::packet::{
    PacketTrait, PublicKey, PublicKeyTrait, PublicSubkey, SecretKey, SecretKeyTrait, SecretSubkey,
    Signature, SignatureType, UserAttribute, UserId,
};
use crate::ser::Serialize;
use crate::types::{Fingerprint, KeyId, KeyVersion, Tag};

/// Tolerated clock skew when checking that signatures are not from the
/// future.
const MAX_SKEW: i64 = 3600;

/// A transferable public key: primary key, user ids, subkeys and all their
/// binding signatures.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-11.1>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPublicKey {
    pub primary_key: PublicKey,
    pub details: SignedKeyDetails,
    pub public_subkeys: Vec<SignedPublicSubKey>,
}

/// A transferable secret key. Secret keys carry the same graph as public
/// keys, with secret key packets in the primary and subkey positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSecretKey {
    pub primary_key: SecretKey,
    pub details: SignedKeyDetails,
    pub secret_subkeys: Vec<SignedSecretSubKey>,
}

/// The parts of a transferable key that hang off the primary key itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedKeyDetails {
    pub revocation_signatures: Vec<Signature>,
    pub direct_signatures: Vec<Signature>,
    pub users: Vec<SignedUser>,
    pub user_attributes: Vec<SignedUserAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUser {
    pub id: UserId,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUserAttribute {
    pub attr: UserAttribute,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPublicSubKey {
    pub key: PublicSubkey,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSecretSubKey {
    pub key: SecretSubkey,
    pub signatures: Vec<Signature>,
}

/// The outcome of a signing/encryption key query: the primary key or one of
/// the subkeys. Implements the key traits by delegation, so callers use it
/// wherever a single key packet is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelection<'a, P, S> {
    Primary(&'a P),
    Subkey(&'a S),
}

impl<P: PublicKeyTrait, S: PublicKeyTrait> PublicKeyTrait for KeySelection<'_, P, S> {
    fn version(&self) -> KeyVersion {
        match self {
            Self::Primary(key) => key.version(),
            Self::Subkey(key) => key.version(),
        }
    }

    fn algorithm(&self) -> crate::crypto::PublicKeyAlgorithm {
        match self {
            Self::Primary(key) => key.algorithm(),
            Self::Subkey(key) => key.algorithm(),
        }
    }

    fn created_at(&self) -> &DateTime<Utc> {
        match self {
            Self::Primary(key) => key.created_at(),
            Self::Subkey(key) => key.created_at(),
        }
    }

    fn public_params(&self) -> &crate::types::PublicParams {
        match self {
            Self::Primary(key) => key.public_params(),
            Self::Subkey(key) => key.public_params(),
        }
    }

    fn fingerprint(&self) -> Fingerprint {
        match self {
            Self::Primary(key) => key.fingerprint(),
            Self::Subkey(key) => key.fingerprint(),
        }
    }

    fn key_id(&self) -> KeyId {
        match self {
            Self::Primary(key) => key.key_id(),
            Self::Subkey(key) => key.key_id(),
        }
    }

    fn hash_public_key(&self, hasher: &mut dyn crate::crypto::hash::Hasher) -> Result<()> {
        match self {
            Self::Primary(key) => key.hash_public_key(hasher),
            Self::Subkey(key) => key.hash_public_key(hasher),
        }
    }

    fn verify_signature(
        &self,
        hash: crate::crypto::HashAlgorithm,
        hashed: &[u8],
        sig: &[crate::types::Mpi],
    ) -> Result<()> {
        match self {
            Self::Primary(key) => key.verify_signature(hash, hashed, sig),
            Self::Subkey(key) => key.verify_signature(hash, hashed, sig),
        }
    }

    fn encrypt_session_key<R: rand::CryptoRng + rand::Rng>(
        &self,
        rng: &mut R,
        plain: &[u8],
    ) -> Result<crate::packet::EskValues> {
        match self {
            Self::Primary(key) => key.encrypt_session_key(rng, plain),
            Self::Subkey(key) => key.encrypt_session_key(rng, plain),
        }
    }
}

impl<P: SecretKeyTrait, S: SecretKeyTrait> SecretKeyTrait for KeySelection<'_, P, S> {
    fn create_signature<R: rand::CryptoRng + rand::Rng>(
        &self,
        rng: &mut R,
        passphrase: &str,
        hash: crate::crypto::HashAlgorithm,
        hashed: &[u8],
    ) -> Result<Vec<crate::types::Mpi>> {
        match self {
            Self::Primary(key) => key.create_signature(rng, passphrase, hash, hashed),
            Self::Subkey(key) => key.create_signature(rng, passphrase, hash, hashed),
        }
    }

    fn decrypt_session_key<R: rand::CryptoRng + rand::Rng>(
        &self,
        rng: &mut R,
        passphrase: &str,
        values: &crate::packet::EskValues,
    ) -> Result<Vec<u8>> {
        match self {
            Self::Primary(key) => key.decrypt_session_key(rng, passphrase, values),
            Self::Subkey(key) => key.decrypt_session_key(rng, passphrase, values),
        }
    }
}

/// Why a key, user or subkey is not usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRejection {
    NoBindingSignature,
    InvalidBindingSignature,
    MissingBackSignature,
    Revoked,
    Expired,
    CreatedInTheFuture,
    WrongAlgorithm,
}

impl SignedUser {
    pub fn new(id: UserId, signatures: Vec<Signature>) -> Self {
        let signatures = retain_signature_types(
            signatures,
            &[
                SignatureType::CertGeneric,
                SignatureType::CertPersona,
                SignatureType::CertCasual,
                SignatureType::CertPositive,
                SignatureType::CertRevocation,
            ],
        );
        SignedUser { id, signatures }
    }

    /// Verifies all certifications of this user made by `key`.
    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        ensure!(!self.signatures.is_empty(), "missing user certifications");
        for sig in &self.signatures {
            sig.verify_certification(key, key, Tag::UserId, &self.id)?;
        }
        Ok(())
    }

    /// Is there a valid (non superseded) revocation for this user?
    pub fn is_revoked(&self, key: &impl PublicKeyTrait, date: DateTime<Utc>) -> bool {
        let last_cert = self
            .signatures
            .iter()
            .filter(|sig| sig.is_certification() && signature_usable_at(sig, date))
            .filter_map(|sig| sig.created())
            .max();

        self.signatures
            .iter()
            .filter(|sig| {
                sig.typ() == SignatureType::CertRevocation && signature_usable_at(sig, date)
            })
            .filter(|sig| {
                sig.verify_certification(key, key, Tag::UserId, &self.id)
                    .is_ok()
            })
            // a revocation older than the newest certification is superseded
            .any(|sig| match (sig.created(), last_cert) {
                (Some(revoked_at), Some(latest)) => revoked_at >= latest,
                (Some(_), None) => true,
                (None, _) => false,
            })
    }
}

impl SignedUserAttribute {
    pub fn new(attr: UserAttribute, signatures: Vec<Signature>) -> Self {
        SignedUserAttribute { attr, signatures }
    }

    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        ensure!(!self.signatures.is_empty(), "missing attribute certifications");
        for sig in &self.signatures {
            sig.verify_certification(key, key, Tag::UserAttribute, &self.attr)?;
        }
        Ok(())
    }
}

fn retain_signature_types(signatures: Vec<Signature>, allowed: &[SignatureType]) -> Vec<Signature> {
    signatures
        .into_iter()
        .filter(|sig| {
            if allowed.contains(&sig.typ()) {
                true
            } else {
                warn!("ignoring unexpected signature of type {:?}", sig.typ());
                false
            }
        })
        .collect()
}

/// A signature is usable at `date` when it is not from the future and not
/// past its own expiration.
fn signature_usable_at(sig: &Signature, date: DateTime<Utc>) -> bool {
    let Some(created) = sig.created() else {
        return false;
    };
    if *created > date + Duration::seconds(MAX_SKEW) {
        return false;
    }
    if let Some(expiry) = sig.signature_expiration_time() {
        if *created + Duration::seconds(i64::from(expiry)) < date {
            return false;
        }
    }
    true
}

/// Checks a subkey binding at `date`, returning the binding signature that
/// grants use, or the reason it is rejected.
fn check_subkey<P, S>(
    primary: &P,
    subkey: &S,
    signatures: &[Signature],
    date: DateTime<Utc>,
) -> std::result::Result<Signature, KeyRejection>
where
    P: PublicKeyTrait,
    S: PublicKeyTrait,
{
    if *subkey.created_at() > date + Duration::seconds(MAX_SKEW) {
        return Err(KeyRejection::CreatedInTheFuture);
    }

    let mut binding: Option<&Signature> = None;
    for sig in signatures
        .iter()
        .filter(|sig| sig.typ() == SignatureType::SubkeyBinding)
        .filter(|sig| signature_usable_at(sig, date))
    {
        if sig.verify_key_binding(primary, primary, subkey).is_err() {
            continue;
        }

        // signing subkeys need a valid embedded back signature
        if sig.key_flags().sign() {
            let Some(back_sig) = sig.embedded_signature() else {
                return Err(KeyRejection::MissingBackSignature);
            };
            if back_sig.typ() != SignatureType::KeyBinding
                || back_sig
                    .verify_key_binding(subkey, primary, subkey)
                    .is_err()
            {
                return Err(KeyRejection::MissingBackSignature);
            }
        }

        if binding.map_or(true, |prev| prev.created() < sig.created()) {
            binding = Some(sig);
        }
    }

    let Some(binding) = binding else {
        return Err(if signatures.is_empty() {
            KeyRejection::NoBindingSignature
        } else {
            KeyRejection::InvalidBindingSignature
        });
    };

    // revocations issued by the primary kill the binding
    let revoked = signatures.iter().any(|sig| {
        sig.typ() == SignatureType::SubkeyRevocation
            && signature_usable_at(sig, date)
            && sig.verify_key_binding(primary, primary, subkey).is_ok()
    });
    if revoked {
        return Err(KeyRejection::Revoked);
    }

    if let Some(expiry) = binding.key_expiration_time() {
        if *subkey.created_at() + Duration::seconds(i64::from(expiry)) < date {
            return Err(KeyRejection::Expired);
        }
    }

    Ok(binding.clone())
}

macro_rules! impl_signed_subkey {
    ($name:ident, $inner:ty) => {
        impl $name {
            pub fn new(key: $inner, signatures: Vec<Signature>) -> Self {
                let signatures = retain_signature_types(
                    signatures,
                    &[SignatureType::SubkeyBinding, SignatureType::SubkeyRevocation],
                );
                Self { key, signatures }
            }

            /// Verifies all binding signatures against the given primary.
            pub fn verify(&self, primary: &impl PublicKeyTrait) -> Result<()> {
                ensure!(!self.signatures.is_empty(), "missing subkey bindings");
                for sig in &self.signatures {
                    sig.verify_key_binding(primary, primary, &self.key)?;
                }
                Ok(())
            }
        }
    };
}

impl_signed_subkey!(SignedPublicSubKey, PublicSubkey);
impl_signed_subkey!(SignedSecretSubKey, SecretSubkey);

impl SignedKeyDetails {
    pub fn new(
        revocation_signatures: Vec<Signature>,
        direct_signatures: Vec<Signature>,
        users: Vec<SignedUser>,
        user_attributes: Vec<SignedUserAttribute>,
    ) -> Self {
        let users = users
            .into_iter()
            .filter(|user| {
                if user.signatures.is_empty() {
                    warn!("ignoring unsigned {:?}", user.id);
                    false
                } else {
                    true
                }
            })
            .collect();

        SignedKeyDetails {
            revocation_signatures,
            direct_signatures,
            users,
            user_attributes,
        }
    }

    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        for sig in self
            .revocation_signatures
            .iter()
            .chain(self.direct_signatures.iter())
        {
            sig.verify_key(key)?;
        }
        for user in &self.users {
            user.verify(key)?;
        }
        for attr in &self.user_attributes {
            attr.verify(key)?;
        }
        Ok(())
    }

    fn merge(&mut self, other: SignedKeyDetails) {
        merge_signatures(&mut self.revocation_signatures, other.revocation_signatures);
        merge_signatures(&mut self.direct_signatures, other.direct_signatures);

        for other_user in other.users {
            match self
                .users
                .iter_mut()
                .find(|user| user.id == other_user.id)
            {
                Some(user) => merge_signatures(&mut user.signatures, other_user.signatures),
                None => self.users.push(other_user),
            }
        }

        for other_attr in other.user_attributes {
            match self
                .user_attributes
                .iter_mut()
                .find(|attr| attr.attr == other_attr.attr)
            {
                Some(attr) => merge_signatures(&mut attr.signatures, other_attr.signatures),
                None => self.user_attributes.push(other_attr),
            }
        }
    }
}

/// Set union of signatures, deduplicated by serialized form.
fn merge_signatures(existing: &mut Vec<Signature>, incoming: Vec<Signature>) {
    for sig in incoming {
        let duplicate = existing.iter().any(|have| {
            match (have.to_bytes(), sig.to_bytes()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        });
        if !duplicate {
            existing.push(sig);
        }
    }
}

macro_rules! impl_signed_key {
    ($name:ident, $primary:ty, $subkey_field:ident, $signed_subkey:ty, $subkey_raw:ty) => {
        impl $name {
            pub fn fingerprint(&self) -> Fingerprint {
                self.primary_key.fingerprint()
            }

            pub fn key_id(&self) -> KeyId {
                self.primary_key.key_id()
            }

            /// Verifies every signature in the key graph.
            pub fn verify(&self) -> Result<()> {
                for subkey in &self.$subkey_field {
                    subkey.verify(&self.primary_key)?;
                }
                self.details.verify(&self.primary_key)
            }

            /// Checks the primary key itself at `date`.
            pub fn verify_primary_key(
                &self,
                date: DateTime<Utc>,
            ) -> std::result::Result<(), KeyRejection> {
                if *self.primary_key.created_at() > date + Duration::seconds(MAX_SKEW) {
                    return Err(KeyRejection::CreatedInTheFuture);
                }

                let revoked = self.details.revocation_signatures.iter().any(|sig| {
                    sig.typ() == SignatureType::KeyRevocation
                        && signature_usable_at(sig, date)
                        && sig.verify_key(&self.primary_key).is_ok()
                });
                if revoked {
                    return Err(KeyRejection::Revoked);
                }

                // key expiration lives on the self certifications
                let expired = self.valid_self_signatures(date).iter().any(|sig| {
                    sig.key_expiration_time().is_some_and(|expiry| {
                        *self.primary_key.created_at() + Duration::seconds(i64::from(expiry))
                            < date
                    })
                });
                if expired {
                    return Err(KeyRejection::Expired);
                }

                Ok(())
            }

            fn valid_self_signatures(&self, date: DateTime<Utc>) -> Vec<&Signature> {
                self.details
                    .users
                    .iter()
                    .flat_map(|user| {
                        let id = &user.id;
                        user.signatures
                            .iter()
                            .filter(move |sig| {
                                sig.is_certification()
                                    && signature_usable_at(sig, date)
                                    && sig
                                        .verify_certification(
                                            &self.primary_key,
                                            &self.primary_key,
                                            Tag::UserId,
                                            id,
                                        )
                                        .is_ok()
                            })
                    })
                    .chain(self.details.direct_signatures.iter().filter(|sig| {
                        signature_usable_at(sig, date)
                            && sig.verify_key(&self.primary_key).is_ok()
                    }))
                    .collect()
            }

            /// The users whose certifications verify and which are not
            /// revoked at `date`.
            pub fn valid_users(&self, date: DateTime<Utc>) -> Vec<&SignedUser> {
                self.details
                    .users
                    .iter()
                    .filter(|user| {
                        user.signatures.iter().any(|sig| {
                            sig.is_certification()
                                && signature_usable_at(sig, date)
                                && sig
                                    .verify_certification(
                                        &self.primary_key,
                                        &self.primary_key,
                                        Tag::UserId,
                                        &user.id,
                                    )
                                    .is_ok()
                        }) && !user.is_revoked(&self.primary_key, date)
                    })
                    .collect()
            }

            /// Checks a single user at `date`.
            pub fn verify_user(
                &self,
                user: &SignedUser,
                date: DateTime<Utc>,
            ) -> std::result::Result<(), KeyRejection> {
                let certified = user.signatures.iter().any(|sig| {
                    sig.is_certification()
                        && signature_usable_at(sig, date)
                        && sig
                            .verify_certification(
                                &self.primary_key,
                                &self.primary_key,
                                Tag::UserId,
                                &user.id,
                            )
                            .is_ok()
                });
                if !certified {
                    if user.signatures.is_empty() {
                        return Err(KeyRejection::NoBindingSignature);
                    }
                    return Err(KeyRejection::InvalidBindingSignature);
                }
                if user.is_revoked(&self.primary_key, date) {
                    return Err(KeyRejection::Revoked);
                }
                Ok(())
            }

            /// Checks a subkey binding at `date`.
            pub fn verify_subkey(
                &self,
                subkey: &$signed_subkey,
                date: DateTime<Utc>,
            ) -> std::result::Result<Signature, KeyRejection> {
                check_subkey(&self.primary_key, &subkey.key, &subkey.signatures, date)
            }

            fn query_subkey<F>(
                &self,
                key_id: Option<&KeyId>,
                date: DateTime<Utc>,
                want: F,
            ) -> Option<&$signed_subkey>
            where
                F: Fn(&Signature) -> bool,
            {
                self.$subkey_field
                    .iter()
                    .filter(|subkey| {
                        key_id.map_or(true, |id| &subkey.key.key_id() == id)
                    })
                    .filter_map(|subkey| {
                        self.verify_subkey(subkey, date)
                            .ok()
                            .filter(|binding| want(binding))
                            .map(|_| subkey)
                    })
                    .max_by_key(|subkey| *subkey.key.created_at())
            }

            /// Selects the newest usable signing key at `date`: a
            /// sign-flagged subkey, falling back to the primary.
            pub fn signing_key(
                &self,
                key_id: Option<&KeyId>,
                date: DateTime<Utc>,
            ) -> Option<KeySelection<'_, $primary, $subkey_raw>> {
                if let Some(subkey) = self.query_subkey(key_id, date, |sig| sig.key_flags().sign())
                {
                    debug!("selected signing subkey {:?}", subkey.key.key_id());
                    return Some(KeySelection::Subkey(&subkey.key));
                }

                if key_id.is_some_and(|id| id != &self.primary_key.key_id()) {
                    return None;
                }
                if self.verify_primary_key(date).is_err() {
                    return None;
                }
                if !self.primary_key.is_signing_key() {
                    return None;
                }
                Some(KeySelection::Primary(&self.primary_key))
            }

            /// Selects the newest usable encryption key at `date`.
            pub fn encryption_key(
                &self,
                key_id: Option<&KeyId>,
                date: DateTime<Utc>,
            ) -> Option<KeySelection<'_, $primary, $subkey_raw>> {
                if let Some(subkey) = self.query_subkey(key_id, date, |sig| {
                    sig.key_flags().encrypt_comms() || sig.key_flags().encrypt_storage()
                }) {
                    debug!("selected encryption subkey {:?}", subkey.key.key_id());
                    return Some(KeySelection::Subkey(&subkey.key));
                }

                if key_id.is_some_and(|id| id != &self.primary_key.key_id()) {
                    return None;
                }
                if self.verify_primary_key(date).is_err() {
                    return None;
                }
                if !self.primary_key.is_encryption_key() {
                    return None;
                }
                // the primary is only an encryption fallback when a self
                // signature grants the flag
                let allowed = self.valid_self_signatures(date).iter().any(|sig| {
                    sig.key_flags().encrypt_comms() || sig.key_flags().encrypt_storage()
                });
                if !allowed {
                    return None;
                }
                Some(KeySelection::Primary(&self.primary_key))
            }

            /// Merges another copy of the same key: set union of users,
            /// subkeys and signatures. Fails on mismatched fingerprints.
            pub fn merge(&mut self, other: $name) -> Result<()> {
                ensure_eq!(
                    self.fingerprint(),
                    other.fingerprint(),
                    "merging different keys"
                );

                self.details.merge(other.details);

                for other_subkey in other.$subkey_field {
                    match self
                        .$subkey_field
                        .iter_mut()
                        .find(|subkey| subkey.key == other_subkey.key)
                    {
                        Some(subkey) => {
                            merge_signatures(&mut subkey.signatures, other_subkey.signatures)
                        }
                        None => self.$subkey_field.push(other_subkey),
                    }
                }

                Ok(())
            }
        }

        impl Serialize for $name {
            fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
                self.primary_key.to_writer_with_header(writer)?;

                for sig in &self.details.revocation_signatures {
                    sig.to_writer_with_header(writer)?;
                }
                for sig in &self.details.direct_signatures {
                    sig.to_writer_with_header(writer)?;
                }
                for user in &self.details.users {
                    user.id.to_writer_with_header(writer)?;
                    for sig in &user.signatures {
                        sig.to_writer_with_header(writer)?;
                    }
                }
                for attr in &self.details.user_attributes {
                    attr.attr.to_writer_with_header(writer)?;
                    for sig in &attr.signatures {
                        sig.to_writer_with_header(writer)?;
                    }
                }
                for subkey in &self.$subkey_field {
                    subkey.key.to_writer_with_header(writer)?;
                    for sig in &subkey.signatures {
                        sig.to_writer_with_header(writer)?;
                    }
                }

                Ok(())
            }

            fn write_len(&self) -> usize {
                let mut sum = self.primary_key.write_len_with_header();
                for sig in self
                    .details
                    .revocation_signatures
                    .iter()
                    .chain(self.details.direct_signatures.iter())
                {
                    sum += sig.write_len_with_header();
                }
                for user in &self.details.users {
                    sum += user.id.write_len_with_header();
                    sum += user
                        .signatures
                        .iter()
                        .map(|sig| sig.write_len_with_header())
                        .sum::<usize>();
                }
                for attr in &self.details.user_attributes {
                    sum += attr.attr.write_len_with_header();
                    sum += attr
                        .signatures
                        .iter()
                        .map(|sig| sig.write_len_with_header())
                        .sum::<usize>();
                }
                for subkey in &self.$subkey_field {
                    sum += subkey.key.write_len_with_header();
                    sum += subkey
                        .signatures
                        .iter()
                        .map(|sig| sig.write_len_with_header())
                        .sum::<usize>();
                }
                sum
            }
        }
    };
}

impl_signed_key!(
    SignedPublicKey,
    PublicKey,
    public_subkeys,
    SignedPublicSubKey,
    PublicSubkey
);
impl_signed_key!(
    SignedSecretKey,
    SecretKey,
    secret_subkeys,
    SignedSecretSubKey,
    SecretSubkey
);

impl SignedSecretKey {
    /// Drops all secret material, leaving the public transferable key.
    pub fn to_public(&self) -> SignedPublicKey {
        let primary = PublicKey::from_inner(self.primary_key.inner().clone());
        let subkeys = self
            .secret_subkeys
            .iter()
            .map(|subkey| SignedPublicSubKey {
                key: PublicSubkey::from_inner(subkey.key.inner().clone()),
                signatures: subkey.signatures.clone(),
            })
            .collect();

        SignedPublicKey {
            primary_key: primary,
            details: self.details.clone(),
            public_subkeys: subkeys,
        }
    }
}

impl SignedPublicKey {
    pub fn new(
        primary_key: PublicKey,
        details: SignedKeyDetails,
        public_subkeys: Vec<SignedPublicSubKey>,
    ) -> Self {
        SignedPublicKey {
            primary_key,
            details,
            public_subkeys,
        }
    }
}

impl SignedSecretKey {
    pub fn new(
        primary_key: SecretKey,
        details: SignedKeyDetails,
        secret_subkeys: Vec<SignedSecretSubKey>,
    ) -> Self {
        SignedSecretKey {
            primary_key,
            details,
            secret_subkeys,
        }
    }
}

impl From<KeyRejection> for Error {
    fn from(value: KeyRejection) -> Self {
        format_err!("key not usable: {:?}", value)
    }
}
