use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, Bytes};
use chrono::{DateTime, TimeZone, Utc};
use smallvec::SmallVec;

use crate::crypto::aead::AeadAlgorithm;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::packet::signature::Signature;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, KeyId, KeyVersion};
use crate::util::{packet_length_len, read_packet_length, write_packet_length};

/// Available signature subpacket types.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SubpacketType {
    SignatureCreationTime,
    SignatureExpirationTime,
    ExportableCertification,
    TrustSignature,
    RegularExpression,
    Revocable,
    KeyExpirationTime,
    PreferredSymmetricAlgorithms,
    RevocationKey,
    Issuer,
    Notation,
    PreferredHashAlgorithms,
    PreferredCompressionAlgorithms,
    KeyServerPreferences,
    PreferredKeyServer,
    PrimaryUserId,
    PolicyUri,
    KeyFlags,
    SignersUserId,
    RevocationReason,
    Features,
    SignatureTarget,
    EmbeddedSignature,
    IssuerFingerprint,
    PreferredAead,
    Experimental(u8),
    Other(u8),
}

impl SubpacketType {
    pub fn as_u8(&self, is_critical: bool) -> u8 {
        let raw: u8 = match self {
            SubpacketType::SignatureCreationTime => 2,
            SubpacketType::SignatureExpirationTime => 3,
            SubpacketType::ExportableCertification => 4,
            SubpacketType::TrustSignature => 5,
            SubpacketType::RegularExpression => 6,
            SubpacketType::Revocable => 7,
            SubpacketType::KeyExpirationTime => 9,
            SubpacketType::PreferredSymmetricAlgorithms => 11,
            SubpacketType::RevocationKey => 12,
            SubpacketType::Issuer => 16,
            SubpacketType::Notation => 20,
            SubpacketType::PreferredHashAlgorithms => 21,
            SubpacketType::PreferredCompressionAlgorithms => 22,
            SubpacketType::KeyServerPreferences => 23,
            SubpacketType::PreferredKeyServer => 24,
            SubpacketType::PrimaryUserId => 25,
            SubpacketType::PolicyUri => 26,
            SubpacketType::KeyFlags => 27,
            SubpacketType::SignersUserId => 28,
            SubpacketType::RevocationReason => 29,
            SubpacketType::Features => 30,
            SubpacketType::SignatureTarget => 31,
            SubpacketType::EmbeddedSignature => 32,
            SubpacketType::IssuerFingerprint => 33,
            SubpacketType::PreferredAead => 34,
            SubpacketType::Experimental(n) => *n,
            SubpacketType::Other(n) => *n,
        };

        if is_critical {
            raw | 0b1000_0000
        } else {
            raw
        }
    }

    #[inline]
    pub fn from_u8(n: u8) -> (Self, bool) {
        let is_critical = (n >> 7) == 1;
        let n = n & 0b0111_1111;

        let m = match n {
            2 => SubpacketType::SignatureCreationTime,
            3 => SubpacketType::SignatureExpirationTime,
            4 => SubpacketType::ExportableCertification,
            5 => SubpacketType::TrustSignature,
            6 => SubpacketType::RegularExpression,
            7 => SubpacketType::Revocable,
            9 => SubpacketType::KeyExpirationTime,
            11 => SubpacketType::PreferredSymmetricAlgorithms,
            12 => SubpacketType::RevocationKey,
            16 => SubpacketType::Issuer,
            20 => SubpacketType::Notation,
            21 => SubpacketType::PreferredHashAlgorithms,
            22 => SubpacketType::PreferredCompressionAlgorithms,
            23 => SubpacketType::KeyServerPreferences,
            24 => SubpacketType::PreferredKeyServer,
            25 => SubpacketType::PrimaryUserId,
            26 => SubpacketType::PolicyUri,
            27 => SubpacketType::KeyFlags,
            28 => SubpacketType::SignersUserId,
            29 => SubpacketType::RevocationReason,
            30 => SubpacketType::Features,
            31 => SubpacketType::SignatureTarget,
            32 => SubpacketType::EmbeddedSignature,
            33 => SubpacketType::IssuerFingerprint,
            34 => SubpacketType::PreferredAead,
            100..=110 => SubpacketType::Experimental(n),
            _ => SubpacketType::Other(n),
        };

        (m, is_critical)
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Subpacket {
    pub is_critical: bool,
    pub data: SubpacketData,
}

impl Subpacket {
    pub const fn regular(data: SubpacketData) -> Self {
        Subpacket {
            is_critical: false,
            data,
        }
    }

    pub const fn critical(data: SubpacketData) -> Self {
        Subpacket {
            is_critical: true,
            data,
        }
    }

    pub fn typ(&self) -> SubpacketType {
        self.data.typ()
    }
}

/// Designates a key holding revocation authority over this key.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RevocationKey {
    pub class: u8,
    pub algorithm: PublicKeyAlgorithm,
    pub fingerprint: [u8; 20],
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Notation {
    pub readable: bool,
    pub name: Bytes,
    pub value: Bytes,
}

/// Codes for revocation reasons.
#[derive(Debug, PartialEq, Eq, Copy, Clone, num_enum::FromPrimitive, num_enum::IntoPrimitive)]
#[repr(u8)]
pub enum RevocationCode {
    /// No reason specified (key revocations or cert revocations)
    NoReason = 0,
    /// Key is superseded (key revocations)
    KeySuperseded = 1,
    /// Key material has been compromised (key revocations)
    KeyCompromised = 2,
    /// Key is retired and no longer used (key revocations)
    KeyRetired = 3,
    /// User ID information is no longer valid (cert revocations)
    CertUserIdInvalid = 32,

    #[num_enum(catch_all)]
    Other(u8),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SubpacketData {
    /// The time the signature was made.
    SignatureCreationTime(DateTime<Utc>),
    /// Seconds after the creation time after which the signature expires.
    SignatureExpirationTime(u32),
    /// Seconds after the key creation time after which the key expires.
    KeyExpirationTime(u32),
    /// The OpenPGP Key ID of the key issuing the signature.
    Issuer(KeyId),
    PreferredSymmetricAlgorithms(SmallVec<[SymmetricKeyAlgorithm; 8]>),
    PreferredHashAlgorithms(SmallVec<[HashAlgorithm; 8]>),
    PreferredCompressionAlgorithms(SmallVec<[CompressionAlgorithm; 8]>),
    PreferredAeadAlgorithms(SmallVec<[AeadAlgorithm; 2]>),
    KeyServerPreferences(SmallVec<[u8; 4]>),
    KeyFlags(SmallVec<[u8; 4]>),
    Features(SmallVec<[u8; 4]>),
    RevocationReason(RevocationCode, Bytes),
    IsPrimary(bool),
    Revocable(bool),
    EmbeddedSignature(Box<Signature>),
    PreferredKeyServer(String),
    Notation(Notation),
    RevocationKey(RevocationKey),
    SignersUserId(Bytes),
    PolicyUri(String),
    TrustSignature(u8, u8),
    RegularExpression(Bytes),
    ExportableCertification(bool),
    IssuerFingerprint(KeyVersion, SmallVec<[u8; 20]>),
    SignatureTarget(PublicKeyAlgorithm, HashAlgorithm, Vec<u8>),
    Experimental(u8, SmallVec<[u8; 2]>),
    Other(u8, Vec<u8>),
}

impl SubpacketData {
    pub fn typ(&self) -> SubpacketType {
        match self {
            SubpacketData::SignatureCreationTime(_) => SubpacketType::SignatureCreationTime,
            SubpacketData::SignatureExpirationTime(_) => SubpacketType::SignatureExpirationTime,
            SubpacketData::KeyExpirationTime(_) => SubpacketType::KeyExpirationTime,
            SubpacketData::Issuer(_) => SubpacketType::Issuer,
            SubpacketData::PreferredSymmetricAlgorithms(_) => {
                SubpacketType::PreferredSymmetricAlgorithms
            }
            SubpacketData::PreferredHashAlgorithms(_) => SubpacketType::PreferredHashAlgorithms,
            SubpacketData::PreferredCompressionAlgorithms(_) => {
                SubpacketType::PreferredCompressionAlgorithms
            }
            SubpacketData::PreferredAeadAlgorithms(_) => SubpacketType::PreferredAead,
            SubpacketData::KeyServerPreferences(_) => SubpacketType::KeyServerPreferences,
            SubpacketData::KeyFlags(_) => SubpacketType::KeyFlags,
            SubpacketData::Features(_) => SubpacketType::Features,
            SubpacketData::RevocationReason(_, _) => SubpacketType::RevocationReason,
            SubpacketData::IsPrimary(_) => SubpacketType::PrimaryUserId,
            SubpacketData::Revocable(_) => SubpacketType::Revocable,
            SubpacketData::EmbeddedSignature(_) => SubpacketType::EmbeddedSignature,
            SubpacketData::PreferredKeyServer(_) => SubpacketType::PreferredKeyServer,
            SubpacketData::Notation(_) => SubpacketType::Notation,
            SubpacketData::RevocationKey(_) => SubpacketType::RevocationKey,
            SubpacketData::SignersUserId(_) => SubpacketType::SignersUserId,
            SubpacketData::PolicyUri(_) => SubpacketType::PolicyUri,
            SubpacketData::TrustSignature(_, _) => SubpacketType::TrustSignature,
            SubpacketData::RegularExpression(_) => SubpacketType::RegularExpression,
            SubpacketData::ExportableCertification(_) => SubpacketType::ExportableCertification,
            SubpacketData::IssuerFingerprint(_, _) => SubpacketType::IssuerFingerprint,
            SubpacketData::SignatureTarget(_, _, _) => SubpacketType::SignatureTarget,
            SubpacketData::Experimental(n, _) => SubpacketType::Experimental(*n),
            SubpacketData::Other(n, _) => SubpacketType::Other(*n),
        }
    }
}

fn read_timestamp<B: Buf>(i: &mut B) -> Result<DateTime<Utc>> {
    let ts = i.read_be_u32()?;
    Utc.timestamp_opt(ts.into(), 0)
        .single()
        .ok_or_else(|| format_err!("invalid timestamp"))
}

/// Parses a single subpacket body.
fn parse_body<B: Buf>(typ: SubpacketType, is_critical: bool, mut i: B) -> Result<SubpacketData> {
    let data = match typ {
        SubpacketType::SignatureCreationTime => {
            SubpacketData::SignatureCreationTime(read_timestamp(&mut i)?)
        }
        SubpacketType::SignatureExpirationTime => {
            SubpacketData::SignatureExpirationTime(i.read_be_u32()?)
        }
        SubpacketType::KeyExpirationTime => SubpacketData::KeyExpirationTime(i.read_be_u32()?),
        SubpacketType::Issuer => {
            SubpacketData::Issuer(KeyId::from_slice(&i.read_array::<8>()?)?)
        }
        SubpacketType::PreferredSymmetricAlgorithms => SubpacketData::PreferredSymmetricAlgorithms(
            i.rest().iter().map(|v| SymmetricKeyAlgorithm::from(*v)).collect(),
        ),
        SubpacketType::PreferredHashAlgorithms => SubpacketData::PreferredHashAlgorithms(
            i.rest().iter().map(|v| HashAlgorithm::from(*v)).collect(),
        ),
        SubpacketType::PreferredCompressionAlgorithms => {
            SubpacketData::PreferredCompressionAlgorithms(
                i.rest().iter().map(|v| CompressionAlgorithm::from(*v)).collect(),
            )
        }
        SubpacketType::PreferredAead => SubpacketData::PreferredAeadAlgorithms(
            i.rest().iter().map(|v| AeadAlgorithm::from(*v)).collect(),
        ),
        SubpacketType::KeyServerPreferences => {
            SubpacketData::KeyServerPreferences(SmallVec::from_slice(&i.rest()))
        }
        SubpacketType::KeyFlags => SubpacketData::KeyFlags(SmallVec::from_slice(&i.rest())),
        SubpacketType::Features => SubpacketData::Features(SmallVec::from_slice(&i.rest())),
        SubpacketType::RevocationReason => {
            let code = RevocationCode::from(i.read_u8()?);
            SubpacketData::RevocationReason(code, i.rest())
        }
        SubpacketType::PrimaryUserId => SubpacketData::IsPrimary(i.read_u8()? == 1),
        SubpacketType::Revocable => SubpacketData::Revocable(i.read_u8()? == 1),
        SubpacketType::EmbeddedSignature => {
            let sig = Signature::from_buf(Default::default(), &mut i)?;
            SubpacketData::EmbeddedSignature(Box::new(sig))
        }
        SubpacketType::PreferredKeyServer => {
            SubpacketData::PreferredKeyServer(std::str::from_utf8(&i.rest())?.to_string())
        }
        SubpacketType::Notation => {
            let flags = i.read_u8()?;
            let readable = flags == 0x80;
            i.read_tag(&[0, 0, 0])?;
            let name_len = i.read_be_u16()?;
            let value_len = i.read_be_u16()?;
            let name = i.read_take(name_len.into())?;
            let value = i.read_take(value_len.into())?;
            SubpacketData::Notation(Notation {
                readable,
                name,
                value,
            })
        }
        SubpacketType::RevocationKey => {
            let class = i.read_u8()?;
            let algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
            let fingerprint = i.read_array::<20>()?;
            SubpacketData::RevocationKey(RevocationKey {
                class,
                algorithm,
                fingerprint,
            })
        }
        SubpacketType::SignersUserId => SubpacketData::SignersUserId(i.rest()),
        SubpacketType::PolicyUri => {
            SubpacketData::PolicyUri(std::str::from_utf8(&i.rest())?.to_string())
        }
        SubpacketType::TrustSignature => {
            SubpacketData::TrustSignature(i.read_u8()?, i.read_u8()?)
        }
        SubpacketType::RegularExpression => SubpacketData::RegularExpression(i.rest()),
        SubpacketType::ExportableCertification => {
            SubpacketData::ExportableCertification(i.read_u8()? == 1)
        }
        SubpacketType::IssuerFingerprint => {
            let version = KeyVersion::from(i.read_u8()?);
            SubpacketData::IssuerFingerprint(version, SmallVec::from_slice(&i.rest()))
        }
        SubpacketType::SignatureTarget => {
            let pub_alg = PublicKeyAlgorithm::from(i.read_u8()?);
            let hash_alg = HashAlgorithm::from(i.read_u8()?);
            SubpacketData::SignatureTarget(pub_alg, hash_alg, i.rest().to_vec())
        }
        SubpacketType::Experimental(n) => {
            SubpacketData::Experimental(n, SmallVec::from_slice(&i.rest()))
        }
        SubpacketType::Other(n) => {
            if is_critical {
                bail!("unknown critical subpacket type {}", n);
            }
            SubpacketData::Other(n, i.rest().to_vec())
        }
    };

    Ok(data)
}

/// Parses a complete subpacket area of the given byte size.
pub fn parse_subpackets<B: Buf>(mut i: B) -> Result<Vec<Subpacket>> {
    let mut packets = Vec::new();

    while i.has_remaining() {
        let len = read_packet_length(&mut i)?;
        ensure!(len > 0, "empty subpacket");
        let (typ, is_critical) = SubpacketType::from_u8(i.read_u8()?);
        let body = i.read_take(len - 1)?;
        let data = parse_body(typ, is_critical, body)?;
        packets.push(Subpacket { is_critical, data });
    }

    Ok(packets)
}

impl Serialize for Subpacket {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        let body = self.body_bytes()?;
        write_packet_length(1 + body.len(), writer)?;
        writer.write_u8(self.typ().as_u8(self.is_critical))?;
        writer.write_all(&body)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        let body_len = self.body_len();
        packet_length_len(1 + body_len) + 1 + body_len
    }
}

impl Subpacket {
    fn body_bytes(&self) -> Result<Vec<u8>> {
        let mut w = Vec::with_capacity(self.body_len());
        match &self.data {
            SubpacketData::SignatureCreationTime(ts) => {
                w.write_u32::<BigEndian>(ts.timestamp().try_into()?)?;
            }
            SubpacketData::SignatureExpirationTime(d) | SubpacketData::KeyExpirationTime(d) => {
                w.write_u32::<BigEndian>(*d)?;
            }
            SubpacketData::Issuer(id) => w.extend_from_slice(id.as_ref()),
            SubpacketData::PreferredSymmetricAlgorithms(list) => {
                w.extend(list.iter().map(|a| u8::from(*a)));
            }
            SubpacketData::PreferredHashAlgorithms(list) => {
                w.extend(list.iter().map(|a| u8::from(*a)));
            }
            SubpacketData::PreferredCompressionAlgorithms(list) => {
                w.extend(list.iter().map(|a| u8::from(*a)));
            }
            SubpacketData::PreferredAeadAlgorithms(list) => {
                w.extend(list.iter().map(|a| u8::from(*a)));
            }
            SubpacketData::KeyServerPreferences(body)
            | SubpacketData::KeyFlags(body)
            | SubpacketData::Features(body) => w.extend_from_slice(body),
            SubpacketData::RevocationReason(code, reason) => {
                w.push(u8::from(*code));
                w.extend_from_slice(reason);
            }
            SubpacketData::IsPrimary(flag)
            | SubpacketData::Revocable(flag)
            | SubpacketData::ExportableCertification(flag) => w.push(u8::from(*flag)),
            SubpacketData::EmbeddedSignature(sig) => {
                sig.to_writer(&mut w)?;
            }
            SubpacketData::PreferredKeyServer(server) => w.extend_from_slice(server.as_bytes()),
            SubpacketData::Notation(notation) => {
                w.push(if notation.readable { 0x80 } else { 0 });
                w.extend_from_slice(&[0, 0, 0]);
                w.write_u16::<BigEndian>(notation.name.len().try_into()?)?;
                w.write_u16::<BigEndian>(notation.value.len().try_into()?)?;
                w.extend_from_slice(&notation.name);
                w.extend_from_slice(&notation.value);
            }
            SubpacketData::RevocationKey(rev_key) => {
                w.push(rev_key.class);
                w.push(rev_key.algorithm.into());
                w.extend_from_slice(&rev_key.fingerprint);
            }
            SubpacketData::SignersUserId(id) => w.extend_from_slice(id),
            SubpacketData::PolicyUri(uri) => w.extend_from_slice(uri.as_bytes()),
            SubpacketData::TrustSignature(depth, value) => {
                w.push(*depth);
                w.push(*value);
            }
            SubpacketData::RegularExpression(regexp) => w.extend_from_slice(regexp),
            SubpacketData::IssuerFingerprint(version, fp) => {
                w.push((*version).into());
                w.extend_from_slice(fp);
            }
            SubpacketData::SignatureTarget(pub_alg, hash_alg, hash) => {
                w.push((*pub_alg).into());
                w.push((*hash_alg).into());
                w.extend_from_slice(hash);
            }
            SubpacketData::Experimental(_, body) => w.extend_from_slice(body),
            SubpacketData::Other(_, body) => w.extend_from_slice(body),
        }
        Ok(w)
    }

    fn body_len(&self) -> usize {
        match &self.data {
            SubpacketData::SignatureCreationTime(_)
            | SubpacketData::SignatureExpirationTime(_)
            | SubpacketData::KeyExpirationTime(_) => 4,
            SubpacketData::Issuer(_) => 8,
            SubpacketData::PreferredSymmetricAlgorithms(list) => list.len(),
            SubpacketData::PreferredHashAlgorithms(list) => list.len(),
            SubpacketData::PreferredCompressionAlgorithms(list) => list.len(),
            SubpacketData::PreferredAeadAlgorithms(list) => list.len(),
            SubpacketData::KeyServerPreferences(body)
            | SubpacketData::KeyFlags(body)
            | SubpacketData::Features(body) => body.len(),
            SubpacketData::RevocationReason(_, reason) => 1 + reason.len(),
            SubpacketData::IsPrimary(_)
            | SubpacketData::Revocable(_)
            | SubpacketData::ExportableCertification(_) => 1,
            SubpacketData::EmbeddedSignature(sig) => sig.write_len(),
            SubpacketData::PreferredKeyServer(server) => server.len(),
            SubpacketData::Notation(notation) => 8 + notation.name.len() + notation.value.len(),
            SubpacketData::RevocationKey(_) => 22,
            SubpacketData::SignersUserId(id) => id.len(),
            SubpacketData::PolicyUri(uri) => uri.len(),
            SubpacketData::TrustSignature(_, _) => 2,
            SubpacketData::RegularExpression(regexp) => regexp.len(),
            SubpacketData::IssuerFingerprint(_, fp) => 1 + fp.len(),
            SubpacketData::SignatureTarget(_, _, hash) => 2 + hash.len(),
            SubpacketData::Experimental(_, body) => body.len(),
            SubpacketData::Other(_, body) => body.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_critical_bit() {
        use SubpacketType::*;

        let cases = [
            SignatureCreationTime,
            SignatureExpirationTime,
            ExportableCertification,
            TrustSignature,
            RegularExpression,
            Revocable,
            KeyExpirationTime,
            PreferredSymmetricAlgorithms,
            RevocationKey,
            Issuer,
            Notation,
            PreferredHashAlgorithms,
            PreferredCompressionAlgorithms,
            KeyServerPreferences,
            PreferredKeyServer,
            PrimaryUserId,
            PolicyUri,
            KeyFlags,
            SignersUserId,
            RevocationReason,
            Features,
            SignatureTarget,
            EmbeddedSignature,
            IssuerFingerprint,
            PreferredAead,
            Experimental(101),
            Other(95),
        ];
        for case in cases {
            assert_eq!(SubpacketType::from_u8(case.as_u8(false)), (case, false));
            assert_eq!(SubpacketType::from_u8(case.as_u8(true)), (case, true));
        }
    }

    #[test]
    fn test_roundtrip_area() {
        let subpackets = vec![
            Subpacket::critical(SubpacketData::SignatureCreationTime(
                Utc.timestamp_opt(1_500_000_000, 0).unwrap(),
            )),
            Subpacket::regular(SubpacketData::Issuer(
                KeyId::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(),
            )),
            Subpacket::regular(SubpacketData::KeyFlags(SmallVec::from_slice(&[0x03]))),
            Subpacket::regular(SubpacketData::PreferredSymmetricAlgorithms(
                [
                    SymmetricKeyAlgorithm::Aes256,
                    SymmetricKeyAlgorithm::Aes128,
                ]
                .into_iter()
                .collect(),
            )),
        ];

        let mut buf = Vec::new();
        for sp in &subpackets {
            sp.to_writer(&mut buf).unwrap();
        }
        assert_eq!(
            buf.len(),
            subpackets.iter().map(|sp| sp.write_len()).sum::<usize>()
        );

        let back = parse_subpackets(&buf[..]).unwrap();
        assert_eq!(subpackets, back);
    }

    #[test]
    fn test_unknown_critical_rejected() {
        let mut buf = Vec::new();
        write_packet_length(2, &mut buf).unwrap();
        buf.push(0x80 | 99); // critical unknown type
        buf.push(0x00);
        assert!(parse_subpackets(&buf[..]).is_err());
    }

    #[test]
    fn test_unknown_non_critical_kept() {
        let mut buf = Vec::new();
        write_packet_length(2, &mut buf).unwrap();
        buf.push(99);
        buf.push(0xAB);
        let parsed = parse_subpackets(&buf[..]).unwrap();
        assert_eq!(
            parsed,
            vec![Subpacket::regular(SubpacketData::Other(99, vec![0xAB]))]
        );
    }
}
