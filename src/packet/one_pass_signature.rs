use std::io;

use bytes::Buf;

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::signature::SignatureType;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{KeyId, PacketHeaderVersion, Tag};

/// One-Pass Signature Packet, announcing a trailing Signature packet so the
/// verifier can hash the literal data in a single pass.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.4>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnePassSignature {
    packet_version: PacketHeaderVersion,
    typ: SignatureType,
    hash_algorithm: HashAlgorithm,
    pub_algorithm: PublicKeyAlgorithm,
    key_id: KeyId,
    /// Zero when another OPS/signature pair nests inside this one.
    last: u8,
}

impl OnePassSignature {
    pub fn new(
        typ: SignatureType,
        hash_algorithm: HashAlgorithm,
        pub_algorithm: PublicKeyAlgorithm,
        key_id: KeyId,
    ) -> Self {
        OnePassSignature {
            packet_version: Default::default(),
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last: 1,
        }
    }

    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let version = i.read_u8()?;
        ensure_eq!(version, 3, "unsupported one pass signature version");

        let typ = SignatureType::from_u8(i.read_u8()?)?;
        let hash_algorithm = HashAlgorithm::from(i.read_u8()?);
        let pub_algorithm = PublicKeyAlgorithm::from(i.read_u8()?);
        let key_id = KeyId::from_slice(&i.read_array::<8>()?)?;
        let last = i.read_u8()?;

        Ok(OnePassSignature {
            packet_version,
            typ,
            hash_algorithm,
            pub_algorithm,
            key_id,
            last,
        })
    }

    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    pub fn pub_algorithm(&self) -> PublicKeyAlgorithm {
        self.pub_algorithm
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub fn is_last(&self) -> bool {
        self.last != 0
    }

    pub fn set_is_last(&mut self, last: bool) {
        self.last = u8::from(last);
    }
}

impl Serialize for OnePassSignature {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[
            3,
            self.typ.into(),
            self.hash_algorithm.into(),
            self.pub_algorithm.into(),
        ])?;
        writer.write_all(self.key_id.as_ref())?;
        writer.write_all(&[self.last])?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        4 + 8 + 1
    }
}

impl PacketTrait for OnePassSignature {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::OnePassSignature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let ops = OnePassSignature::new(
            SignatureType::Binary,
            HashAlgorithm::Sha256,
            PublicKeyAlgorithm::EddsaLegacy,
            KeyId::from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap(),
        );

        let buf = ops.to_bytes().unwrap();
        assert_eq!(buf.len(), ops.write_len());

        let back = OnePassSignature::from_buf(Default::default(), &buf[..]).unwrap();
        assert_eq!(ops, back);
        assert!(back.is_last());
    }
}
