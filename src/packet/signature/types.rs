use std::fmt;
use std::io;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::Buf;
use chrono::{DateTime, TimeZone, Utc};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use subtle::ConstantTimeEq;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{BadSignatureSnafu, Result};
use crate::packet::key::PublicKeyTrait;
use crate::packet::signature::subpacket::{
    parse_subpackets, RevocationCode, Subpacket, SubpacketData,
};
use crate::packet::signature::SignatureConfig;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, KeyId, Mpi, PacketHeaderVersion, Tag};

/// Signature versions. V2 and V3 share a layout; V4 is current.
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive, Default)]
#[repr(u8)]
pub enum SignatureVersion {
    V2 = 2,
    V3 = 3,
    #[default]
    V4 = 4,
}

/// Signature type ids.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SignatureType {
    /// Signature over a binary document.
    Binary = 0x00,
    /// Signature over a text document, hashed with CRLF line endings.
    Text = 0x01,
    /// Standalone signature over its own subpackets.
    Standalone = 0x02,
    /// Generic certification of a User ID and Public-Key packet.
    CertGeneric = 0x10,
    /// Persona certification: no identity verification was done.
    CertPersona = 0x11,
    /// Casual certification: some casual identity verification was done.
    CertCasual = 0x12,
    /// Positive certification: substantial identity verification was done.
    CertPositive = 0x13,
    /// Subkey binding, issued by the primary key over a subkey. A signing
    /// subkey additionally needs an embedded 0x19 back signature.
    SubkeyBinding = 0x18,
    /// Primary key binding ("back signature"), issued by a signing subkey
    /// over the primary.
    KeyBinding = 0x19,
    /// Signature directly on a key.
    Key = 0x1F,
    /// Key revocation, issued by the key itself or a designated revoker.
    KeyRevocation = 0x20,
    /// Subkey revocation.
    SubkeyRevocation = 0x28,
    /// Certification revocation, revokes an earlier 0x10..0x13 or 0x1F.
    CertRevocation = 0x30,
    /// Timestamp signature.
    Timestamp = 0x40,
    /// Third-party confirmation signature.
    ThirdParty = 0x50,
}

impl SignatureType {
    pub fn from_u8(v: u8) -> Result<Self> {
        Self::try_from(v).map_err(|_| format_err!("invalid signature type 0x{:02x}", v))
    }
}

/// Signature Packet.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.2>
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    packet_version: PacketHeaderVersion,
    pub config: SignatureConfig,
    pub signed_hash_value: [u8; 2],
    pub signature: Vec<Mpi>,
}

impl Signature {
    pub fn from_config(
        config: SignatureConfig,
        signed_hash_value: [u8; 2],
        signature: Vec<Mpi>,
    ) -> Self {
        Signature {
            packet_version: Default::default(),
            config,
            signed_hash_value,
            signature,
        }
    }

    /// Parses a `Signature` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        let version = SignatureVersion::try_from(version)
            .map_err(|_| format_err!("unsupported signature version {}", version))?;

        match version {
            SignatureVersion::V2 | SignatureVersion::V3 => {
                Self::parse_v3(packet_version, version, &mut i)
            }
            SignatureVersion::V4 => Self::parse_v4(packet_version, &mut i),
        }
    }

    fn parse_v3<B: Buf>(
        packet_version: PacketHeaderVersion,
        version: SignatureVersion,
        i: &mut B,
    ) -> Result<Self> {
        let hashed_len = i.read_u8()?;
        ensure_eq!(hashed_len, 5, "invalid v3 hashed material length");

        let typ = SignatureType::from_u8(i.read_u8()?)?;
        let created = i.read_be_u32()?;
        let created = Utc
            .timestamp_opt(created.into(), 0)
            .single()
            .ok_or_else(|| format_err!("invalid creation time"))?;
        let issuer = KeyId::from_slice(&i.read_array::<8>()?)?;
        let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
        let hash_alg = HashAlgorithm::from(i.read_u8()?);
        let signed_hash_value = i.read_array::<2>()?;
        let signature = read_signature_mpis(pub_alg, i)?;

        let config = SignatureConfig::v3(version, typ, pub_alg, hash_alg, created, issuer);

        Ok(Signature {
            packet_version,
            config,
            signed_hash_value,
            signature,
        })
    }

    fn parse_v4<B: Buf>(packet_version: PacketHeaderVersion, i: &mut B) -> Result<Self> {
        let typ = SignatureType::from_u8(i.read_u8()?)?;
        let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
        let hash_alg = HashAlgorithm::from(i.read_u8()?);

        let hashed_len = i.read_be_u16()?;
        let hashed_area = i.read_take(hashed_len.into())?;
        let hashed_subpackets = parse_subpackets(hashed_area)?;

        let unhashed_len = i.read_be_u16()?;
        let unhashed_area = i.read_take(unhashed_len.into())?;
        let unhashed_subpackets = parse_subpackets(unhashed_area)?;

        let signed_hash_value = i.read_array::<2>()?;
        let signature = read_signature_mpis(pub_alg, i)?;

        let mut config = SignatureConfig::v4(typ, pub_alg, hash_alg);
        config.hashed_subpackets = hashed_subpackets;
        config.unhashed_subpackets = unhashed_subpackets;

        Ok(Signature {
            packet_version,
            config,
            signed_hash_value,
            signature,
        })
    }

    /// Returns what kind of signature this is.
    pub fn typ(&self) -> SignatureType {
        self.config.typ
    }

    /// Checks the 16 bit hash prefix and the cryptographic signature over an
    /// already finalized hash context.
    fn finish_verification(
        &self,
        key: &impl PublicKeyTrait,
        hasher: Box<dyn crate::crypto::hash::Hasher>,
    ) -> Result<()> {
        let hash = hasher.finish();

        if !bool::from(self.signed_hash_value.ct_eq(&hash[..2])) {
            return BadSignatureSnafu {
                message: "signed hash prefix mismatch".to_string(),
            }
            .fail();
        }

        key.verify_signature(self.config.hash_alg, &hash, &self.signature)
    }

    fn check_issuer(&self, key: &impl PublicKeyTrait) -> Result<()> {
        if let Some(issuer) = self.config.issuer() {
            let key_id = key.key_id();
            ensure_eq!(issuer, &key_id, "signature issued by a different key");
        }
        Ok(())
    }

    /// Verifies a document signature (binary or text) over `data`.
    ///
    /// Text mode normalizes line endings to CRLF while hashing.
    pub fn verify(&self, key: &impl PublicKeyTrait, data: &[u8]) -> Result<()> {
        self.verify_reader(key, data)
    }

    /// Verifies a document signature over a byte stream.
    ///
    /// The payload is pulled and hashed chunk by chunk; nothing is
    /// materialized, so arbitrarily long documents verify in constant
    /// memory.
    pub fn verify_reader<R: io::Read>(&self, key: &impl PublicKeyTrait, mut data: R) -> Result<()> {
        self.check_issuer(key)?;

        let mut norm = crate::util::NormalizingHasher::new(
            self.config.hash_alg.new_hasher()?,
            self.typ() == SignatureType::Text,
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

        self.config.hash_signature_data(&mut *hasher)?;
        self.finish_verification(key, hasher)
    }

    /// Verifies a certification signature over `key` and a user id or user
    /// attribute packet (serialized body in `id`).
    pub fn verify_certification(
        &self,
        signer: &impl PublicKeyTrait,
        key: &impl PublicKeyTrait,
        tag: Tag,
        id: &impl Serialize,
    ) -> Result<()> {
        self.check_issuer(signer)?;

        let mut hasher = self.config.hash_alg.new_hasher()?;
        key.hash_public_key(&mut *hasher)?;

        let body = id.to_bytes()?;
        let prefix = match tag {
            Tag::UserId => 0xB4,
            Tag::UserAttribute => 0xD1,
            _ => bail!("invalid tag for certification: {:?}", tag),
        };
        match self.config.version() {
            SignatureVersion::V2 | SignatureVersion::V3 => {}
            SignatureVersion::V4 => {
                let mut prefix_buf = [prefix, 0u8, 0u8, 0u8, 0u8];
                BigEndian::write_u32(&mut prefix_buf[1..], body.len() as u32);
                hasher.update(&prefix_buf);
            }
        }
        hasher.update(&body);

        self.config.hash_signature_data(&mut *hasher)?;
        self.finish_verification(signer, hasher)
    }

    /// Verifies a subkey binding (0x18) or back signature (0x19): the hash
    /// covers `pubkey ‖ subkey`.
    pub fn verify_key_binding(
        &self,
        signer: &impl PublicKeyTrait,
        primary: &impl PublicKeyTrait,
        subkey: &impl PublicKeyTrait,
    ) -> Result<()> {
        self.check_issuer(signer)?;

        let mut hasher = self.config.hash_alg.new_hasher()?;
        primary.hash_public_key(&mut *hasher)?;
        subkey.hash_public_key(&mut *hasher)?;

        self.config.hash_signature_data(&mut *hasher)?;
        self.finish_verification(signer, hasher)
    }

    /// Verifies a direct key signature or key revocation.
    pub fn verify_key(&self, key: &impl PublicKeyTrait) -> Result<()> {
        self.check_issuer(key)?;

        let mut hasher = self.config.hash_alg.new_hasher()?;
        key.hash_public_key(&mut *hasher)?;

        self.config.hash_signature_data(&mut *hasher)?;
        self.finish_verification(key, hasher)
    }

    /// Is this a certification signature (0x10..0x13)?
    pub fn is_certification(&self) -> bool {
        matches!(
            self.typ(),
            SignatureType::CertGeneric
                | SignatureType::CertPersona
                | SignatureType::CertCasual
                | SignatureType::CertPositive
        )
    }

    fn subpackets(&self) -> impl Iterator<Item = &Subpacket> {
        self.config
            .hashed_subpackets
            .iter()
            .chain(self.config.unhashed_subpackets.iter())
    }

    pub fn created(&self) -> Option<&DateTime<Utc>> {
        self.config.created()
    }

    pub fn issuer(&self) -> Option<&KeyId> {
        self.config.issuer()
    }

    /// Key expiration, in seconds after the key creation time. Only read
    /// from the hashed area.
    pub fn key_expiration_time(&self) -> Option<u32> {
        self.config.hashed_subpackets.iter().find_map(|p| match p.data {
            SubpacketData::KeyExpirationTime(d) => Some(d),
            _ => None,
        })
    }

    /// Signature expiration, in seconds after the signature creation time.
    pub fn signature_expiration_time(&self) -> Option<u32> {
        self.config.hashed_subpackets.iter().find_map(|p| match p.data {
            SubpacketData::SignatureExpirationTime(d) => Some(d),
            _ => None,
        })
    }

    pub fn key_flags(&self) -> KeyFlags {
        self.subpackets()
            .find_map(|p| match &p.data {
                SubpacketData::KeyFlags(d) => Some(KeyFlags::from(&d[..])),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn is_primary(&self) -> bool {
        self.subpackets()
            .find_map(|p| match p.data {
                SubpacketData::IsPrimary(d) => Some(d),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn embedded_signature(&self) -> Option<&Signature> {
        self.subpackets().find_map(|p| match &p.data {
            SubpacketData::EmbeddedSignature(d) => Some(&**d),
            _ => None,
        })
    }

    pub fn revocation_reason(&self) -> Option<(&RevocationCode, &[u8])> {
        self.subpackets().find_map(|p| match &p.data {
            SubpacketData::RevocationReason(code, reason) => Some((code, reason.as_ref())),
            _ => None,
        })
    }

    pub fn preferred_symmetric_algs(&self) -> &[SymmetricKeyAlgorithm] {
        self.subpackets()
            .find_map(|p| match &p.data {
                SubpacketData::PreferredSymmetricAlgorithms(d) => Some(&d[..]),
                _ => None,
            })
            .unwrap_or(&[][..])
    }

    pub fn preferred_hash_algs(&self) -> &[HashAlgorithm] {
        self.subpackets()
            .find_map(|p| match &p.data {
                SubpacketData::PreferredHashAlgorithms(d) => Some(&d[..]),
                _ => None,
            })
            .unwrap_or(&[][..])
    }

    pub fn preferred_compression_algs(&self) -> &[CompressionAlgorithm] {
        self.subpackets()
            .find_map(|p| match &p.data {
                SubpacketData::PreferredCompressionAlgorithms(d) => Some(&d[..]),
                _ => None,
            })
            .unwrap_or(&[][..])
    }

    pub fn features(&self) -> &[u8] {
        self.subpackets()
            .find_map(|p| match &p.data {
                SubpacketData::Features(d) => Some(&d[..]),
                _ => None,
            })
            .unwrap_or(&[][..])
    }
}

/// Key usage flags from the key flags subpacket.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
pub struct KeyFlags(pub u8);

impl KeyFlags {
    pub fn certify(&self) -> bool {
        self.0 & 0x01 != 0
    }
    pub fn sign(&self) -> bool {
        self.0 & 0x02 != 0
    }
    pub fn encrypt_comms(&self) -> bool {
        self.0 & 0x04 != 0
    }
    pub fn encrypt_storage(&self) -> bool {
        self.0 & 0x08 != 0
    }
    pub fn authentication(&self) -> bool {
        self.0 & 0x20 != 0
    }

    pub fn set_certify(&mut self, value: bool) {
        self.set_bit(0x01, value)
    }
    pub fn set_sign(&mut self, value: bool) {
        self.set_bit(0x02, value)
    }
    pub fn set_encrypt_comms(&mut self, value: bool) {
        self.set_bit(0x04, value)
    }
    pub fn set_encrypt_storage(&mut self, value: bool) {
        self.set_bit(0x08, value)
    }

    fn set_bit(&mut self, mask: u8, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }
}

impl From<&[u8]> for KeyFlags {
    fn from(other: &[u8]) -> Self {
        if other.is_empty() {
            Default::default()
        } else {
            KeyFlags(other[0])
        }
    }
}

fn read_signature_mpis<B: Buf>(alg: PublicKeyAlgorithm, i: &mut B) -> Result<Vec<Mpi>> {
    match alg {
        PublicKeyAlgorithm::RsaEncryptSign | PublicKeyAlgorithm::RsaSign => {
            Ok(vec![Mpi::try_from_buf(i)?])
        }
        PublicKeyAlgorithm::Dsa
        | PublicKeyAlgorithm::Ecdsa
        | PublicKeyAlgorithm::EddsaLegacy => {
            Ok(vec![Mpi::try_from_buf(&mut *i)?, Mpi::try_from_buf(i)?])
        }
        _ => {
            // one or more mpis until the body ends
            let mut mpis = Vec::new();
            while i.has_remaining() {
                mpis.push(Mpi::try_from_buf(&mut *i)?);
            }
            ensure!(!mpis.is_empty(), "missing signature material");
            Ok(mpis)
        }
    }
}

impl Serialize for Signature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.config.version().into())?;

        match self.config.version() {
            SignatureVersion::V2 | SignatureVersion::V3 => {
                let (created, issuer) = self
                    .config
                    .v3_fields()
                    .ok_or_else(|| format_err!("inconsistent v3 signature"))?;
                writer.write_u8(5)?;
                writer.write_u8(self.config.typ.into())?;
                writer.write_u32::<BigEndian>(created.timestamp().try_into()?)?;
                writer.write_all(issuer.as_ref())?;
                writer.write_u8(self.config.pub_alg.into())?;
                writer.write_u8(self.config.hash_alg.into())?;
            }
            SignatureVersion::V4 => {
                writer.write_u8(self.config.typ.into())?;
                writer.write_u8(self.config.pub_alg.into())?;
                writer.write_u8(self.config.hash_alg.into())?;

                let hashed: &[Subpacket] = &self.config.hashed_subpackets;
                writer.write_u16::<BigEndian>(hashed.write_len().try_into()?)?;
                hashed.to_writer(writer)?;

                let unhashed: &[Subpacket] = &self.config.unhashed_subpackets;
                writer.write_u16::<BigEndian>(unhashed.write_len().try_into()?)?;
                unhashed.to_writer(writer)?;
            }
        }

        writer.write_all(&self.signed_hash_value)?;
        for mpi in &self.signature {
            mpi.to_writer(writer)?;
        }

        Ok(())
    }

    fn write_len(&self) -> usize {
        let mut sum = 1; // version
        match self.config.version() {
            SignatureVersion::V2 | SignatureVersion::V3 => {
                sum += 1 + 1 + 4 + 8 + 1 + 1;
            }
            SignatureVersion::V4 => {
                sum += 3;
                sum += 2 + (&self.config.hashed_subpackets[..]).write_len();
                sum += 2 + (&self.config.unhashed_subpackets[..]).write_len();
            }
        }
        sum += 2;
        sum += self.signature.iter().map(|mpi| mpi.write_len()).sum::<usize>();
        sum
    }
}

impl PacketTrait for Signature {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::Signature
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("config", &self.config)
            .field("signed_hash_value", &hex::encode(self.signed_hash_value))
            .field(
                "signature",
                &self.signature.iter().map(hex::encode).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyflags() {
        let mut flags = KeyFlags::default();
        assert_eq!(flags.0, 0x00);

        flags.set_certify(true);
        assert!(flags.certify());
        assert_eq!(flags.0, 0x01);

        let mut flags = KeyFlags::default();
        flags.set_sign(true);
        assert_eq!(flags.0, 0x02);

        let mut flags = KeyFlags::default();
        flags.set_encrypt_comms(true);
        flags.set_encrypt_storage(true);
        assert_eq!(flags.0, 0x0C);
        flags.set_encrypt_comms(false);
        assert_eq!(flags.0, 0x08);
    }

    #[test]
    fn test_signature_type_ids() {
        assert_eq!(u8::from(SignatureType::Binary), 0x00);
        assert_eq!(u8::from(SignatureType::CertGeneric), 0x10);
        assert_eq!(u8::from(SignatureType::SubkeyBinding), 0x18);
        assert_eq!(u8::from(SignatureType::KeyBinding), 0x19);
        assert_eq!(u8::from(SignatureType::KeyRevocation), 0x20);
        assert_eq!(u8::from(SignatureType::CertRevocation), 0x30);
        assert!(SignatureType::from_u8(0x42).is_err());
    }
}
