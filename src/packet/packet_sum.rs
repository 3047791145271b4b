use std::io;

use bytes::Bytes;
use log::warn;
use snafu::IntoError;

use crate::errors::{Error, InvalidPacketContentSnafu, Result};
use crate::packet::{
    AeadEncryptedData, CompressedData, LiteralData, Marker, ModDetectionCode, OnePassSignature,
    PacketTrait, PublicKey, PublicKeyEncryptedSessionKey, PublicSubkey, SecretKey, SecretSubkey,
    Signature, SymEncryptedData, SymEncryptedProtectedData, SymKeyEncryptedSessionKey, Trust,
    UserAttribute, UserId,
};
use crate::ser::Serialize;
use crate::types::{PacketHeaderVersion, Tag};

/// The packet sum: one variant per supported tag.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Packet {
    CompressedData(CompressedData),
    PublicKey(PublicKey),
    PublicSubkey(PublicSubkey),
    SecretKey(SecretKey),
    SecretSubkey(SecretSubkey),
    LiteralData(LiteralData),
    Marker(Marker),
    ModDetectionCode(ModDetectionCode),
    OnePassSignature(OnePassSignature),
    PublicKeyEncryptedSessionKey(PublicKeyEncryptedSessionKey),
    Signature(Signature),
    SymEncryptedData(SymEncryptedData),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
    AeadEncryptedData(AeadEncryptedData),
    Trust(Trust),
    UserAttribute(UserAttribute),
    UserId(UserId),
}

impl Packet {
    /// Parses a packet body for the given tag.
    ///
    /// `Ok(None)` means the packet was recognized as skippable (marker,
    /// unknown non-critical tags are handled by the caller).
    pub fn from_body(version: PacketHeaderVersion, tag: Tag, body: Bytes) -> Result<Packet> {
        let res = match tag {
            Tag::PublicKeyEncryptedSessionKey => {
                PublicKeyEncryptedSessionKey::from_buf(version, body)
                    .map(Packet::PublicKeyEncryptedSessionKey)
            }
            Tag::Signature => Signature::from_buf(version, body).map(Packet::Signature),
            Tag::SymKeyEncryptedSessionKey => {
                SymKeyEncryptedSessionKey::from_buf(version, body)
                    .map(Packet::SymKeyEncryptedSessionKey)
            }
            Tag::OnePassSignature => {
                OnePassSignature::from_buf(version, body).map(Packet::OnePassSignature)
            }
            Tag::SecretKey => SecretKey::from_buf(version, body).map(Packet::SecretKey),
            Tag::PublicKey => PublicKey::from_buf(version, body).map(Packet::PublicKey),
            Tag::SecretSubkey => SecretSubkey::from_buf(version, body).map(Packet::SecretSubkey),
            Tag::CompressedData => {
                CompressedData::from_buf(version, body).map(Packet::CompressedData)
            }
            Tag::SymEncryptedData => {
                SymEncryptedData::from_buf(version, body).map(Packet::SymEncryptedData)
            }
            Tag::Marker => Marker::from_buf(version, body).map(Packet::Marker),
            Tag::LiteralData => LiteralData::from_buf(version, body).map(Packet::LiteralData),
            Tag::Trust => Trust::from_buf(version, body).map(Packet::Trust),
            Tag::UserId => UserId::from_buf(version, body).map(Packet::UserId),
            Tag::PublicSubkey => PublicSubkey::from_buf(version, body).map(Packet::PublicSubkey),
            Tag::UserAttribute => UserAttribute::from_buf(version, body).map(Packet::UserAttribute),
            Tag::SymEncryptedProtectedData => SymEncryptedProtectedData::from_buf(version, body)
                .map(Packet::SymEncryptedProtectedData),
            Tag::ModDetectionCode => {
                ModDetectionCode::from_buf(version, body).map(Packet::ModDetectionCode)
            }
            Tag::AeadEncryptedData => {
                AeadEncryptedData::from_buf(version, body).map(Packet::AeadEncryptedData)
            }
            Tag::Critical(id) => {
                return Err(Error::UnknownCriticalPacket { tag: id });
            }
            Tag::NonCritical(id) | Tag::Experimental(id) => {
                warn!("skipping unknown packet with tag {}", id);
                bail!("unknown non-critical packet {}", id);
            }
            Tag::Other(id) => {
                bail!("invalid packet type id {}", id);
            }
        };

        res.map_err(|err| InvalidPacketContentSnafu.into_error(Box::new(err)))
    }

    /// Returns the tag for this packet type.
    pub fn tag(&self) -> Tag {
        match self {
            Packet::CompressedData(p) => p.tag(),
            Packet::PublicKey(p) => p.tag(),
            Packet::PublicSubkey(p) => p.tag(),
            Packet::SecretKey(p) => p.tag(),
            Packet::SecretSubkey(p) => p.tag(),
            Packet::LiteralData(p) => p.tag(),
            Packet::Marker(p) => p.tag(),
            Packet::ModDetectionCode(p) => p.tag(),
            Packet::OnePassSignature(p) => p.tag(),
            Packet::PublicKeyEncryptedSessionKey(p) => p.tag(),
            Packet::Signature(p) => p.tag(),
            Packet::SymEncryptedData(p) => p.tag(),
            Packet::SymEncryptedProtectedData(p) => p.tag(),
            Packet::SymKeyEncryptedSessionKey(p) => p.tag(),
            Packet::AeadEncryptedData(p) => p.tag(),
            Packet::Trust(p) => p.tag(),
            Packet::UserAttribute(p) => p.tag(),
            Packet::UserId(p) => p.tag(),
        }
    }
}

impl Serialize for Packet {
    /// Writes the full framed packet: header plus body.
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Packet::CompressedData(p) => p.to_writer_with_header(writer),
            Packet::PublicKey(p) => p.to_writer_with_header(writer),
            Packet::PublicSubkey(p) => p.to_writer_with_header(writer),
            Packet::SecretKey(p) => p.to_writer_with_header(writer),
            Packet::SecretSubkey(p) => p.to_writer_with_header(writer),
            Packet::LiteralData(p) => p.to_writer_with_header(writer),
            Packet::Marker(p) => p.to_writer_with_header(writer),
            Packet::ModDetectionCode(p) => p.to_writer_with_header(writer),
            Packet::OnePassSignature(p) => p.to_writer_with_header(writer),
            Packet::PublicKeyEncryptedSessionKey(p) => p.to_writer_with_header(writer),
            Packet::Signature(p) => p.to_writer_with_header(writer),
            Packet::SymEncryptedData(p) => p.to_writer_with_header(writer),
            Packet::SymEncryptedProtectedData(p) => p.to_writer_with_header(writer),
            Packet::SymKeyEncryptedSessionKey(p) => p.to_writer_with_header(writer),
            Packet::AeadEncryptedData(p) => p.to_writer_with_header(writer),
            Packet::Trust(p) => p.to_writer_with_header(writer),
            Packet::UserAttribute(p) => p.to_writer_with_header(writer),
            Packet::UserId(p) => p.to_writer_with_header(writer),
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Packet::CompressedData(p) => p.write_len_with_header(),
            Packet::PublicKey(p) => p.write_len_with_header(),
            Packet::PublicSubkey(p) => p.write_len_with_header(),
            Packet::SecretKey(p) => p.write_len_with_header(),
            Packet::SecretSubkey(p) => p.write_len_with_header(),
            Packet::LiteralData(p) => p.write_len_with_header(),
            Packet::Marker(p) => p.write_len_with_header(),
            Packet::ModDetectionCode(p) => p.write_len_with_header(),
            Packet::OnePassSignature(p) => p.write_len_with_header(),
            Packet::PublicKeyEncryptedSessionKey(p) => p.write_len_with_header(),
            Packet::Signature(p) => p.write_len_with_header(),
            Packet::SymEncryptedData(p) => p.write_len_with_header(),
            Packet::SymEncryptedProtectedData(p) => p.write_len_with_header(),
            Packet::SymKeyEncryptedSessionKey(p) => p.write_len_with_header(),
            Packet::AeadEncryptedData(p) => p.write_len_with_header(),
            Packet::Trust(p) => p.write_len_with_header(),
            Packet::UserAttribute(p) => p.write_len_with_header(),
            Packet::UserId(p) => p.write_len_with_header(),
        }
    }
}

macro_rules! impl_from_into {
    ($($name:ident),* $(,)?) => {
        $(
            impl From<$name> for Packet {
                fn from(other: $name) -> Packet {
                    Packet::$name(other)
                }
            }

            impl TryFrom<Packet> for $name {
                type Error = Error;

                fn try_from(other: Packet) -> Result<$name> {
                    if let Packet::$name(value) = other {
                        Ok(value)
                    } else {
                        Err(format_err!("invalid packet type: {:?}", other.tag()))
                    }
                }
            }
        )*
    }
}

impl_from_into!(
    CompressedData,
    PublicKey,
    PublicSubkey,
    SecretKey,
    SecretSubkey,
    LiteralData,
    Marker,
    ModDetectionCode,
    OnePassSignature,
    PublicKeyEncryptedSessionKey,
    Signature,
    SymEncryptedData,
    SymEncryptedProtectedData,
    SymKeyEncryptedSessionKey,
    AeadEncryptedData,
    Trust,
    UserAttribute,
    UserId,
);
