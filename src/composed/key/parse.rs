use std::io::BufRead;

use crate::composed::key::{
    SignedKeyDetails, SignedPublicKey, SignedPublicSubKey, SignedSecretKey, SignedSecretSubKey,
    SignedUser, SignedUserAttribute,
};
use crate::errors::{CompositionSnafu, Result};
use crate::packet::{Packet, PacketParser, Signature, SignatureType};
use crate::types::Tag;

fn composition_err(message: impl Into<String>) -> crate::errors::Error {
    CompositionSnafu {
        message: message.into(),
    }
    .build()
}

macro_rules! key_parser {
    ($name:ident, $fn_name:ident, $primary_tag:path, $primary:ident, $subkey_tag:path, $subkey:ident, $signed_subkey:ident) => {
        /// Parses transferable keys from a packet sequence, RFC 4880 §11.1.
        pub fn $fn_name(packets: impl IntoIterator<Item = Packet>) -> Result<Vec<$name>> {
            let mut keys = Vec::new();
            let mut packets = packets.into_iter().peekable();

            while let Some(packet) = packets.next() {
                // -- One Public-Key (or Secret-Key) packet
                let Packet::$primary(primary_key) = packet else {
                    return Err(composition_err(format!(
                        "expected a {:?} packet, got {:?}",
                        $primary_tag,
                        packet.tag()
                    )));
                };

                // -- Zero or more revocation signatures
                let mut revocation_signatures = Vec::new();
                let mut direct_signatures = Vec::new();
                while let Some(Packet::Signature(_)) = packets.peek() {
                    let Some(Packet::Signature(sig)) = packets.next() else {
                        unreachable!("peeked");
                    };
                    match sig.typ() {
                        SignatureType::KeyRevocation => revocation_signatures.push(sig),
                        _ => direct_signatures.push(sig),
                    }
                }

                // -- Zero or more User ID / User Attribute packets, each with
                //    their certifications
                let mut users = Vec::new();
                let mut user_attributes = Vec::new();
                loop {
                    match packets.peek().map(|p| p.tag()) {
                        Some(Tag::UserId) => {
                            let Some(Packet::UserId(id)) = packets.next() else {
                                unreachable!("peeked");
                            };
                            users.push(SignedUser::new(id, take_signatures(&mut packets)));
                        }
                        Some(Tag::UserAttribute) => {
                            let Some(Packet::UserAttribute(attr)) = packets.next() else {
                                unreachable!("peeked");
                            };
                            user_attributes
                                .push(SignedUserAttribute::new(attr, take_signatures(&mut packets)));
                        }
                        Some(Tag::Trust) => {
                            // implementation specific, dropped on import
                            packets.next();
                        }
                        _ => break,
                    }
                }

                // -- Zero or more Subkey packets with binding signatures
                let mut subkeys: Vec<$signed_subkey> = Vec::new();
                while let Some($subkey_tag) = packets.peek().map(|p| p.tag()) {
                    let Some(Packet::$subkey(key)) = packets.next() else {
                        unreachable!("peeked");
                    };
                    let signatures = take_signatures(&mut packets);
                    if signatures.is_empty() {
                        return Err(composition_err("subkey without a binding signature"));
                    }
                    subkeys.push($signed_subkey::new(key, signatures));
                }

                keys.push($name::new(
                    primary_key,
                    SignedKeyDetails::new(
                        revocation_signatures,
                        direct_signatures,
                        users,
                        user_attributes,
                    ),
                    subkeys,
                ));
            }

            Ok(keys)
        }

        impl $name {
            /// Reads keys from their binary serialization.
            pub fn from_bytes(source: impl BufRead) -> Result<Vec<$name>> {
                let packets = PacketParser::new(source).collect::<Result<Vec<_>>>()?;
                $fn_name(packets)
            }

            /// Reads exactly one key from its binary serialization.
            pub fn from_bytes_single(source: impl BufRead) -> Result<$name> {
                let mut keys = Self::from_bytes(source)?;
                ensure_eq!(keys.len(), 1, "expected a single key");
                Ok(keys.remove(0))
            }
        }
    };
}

fn take_signatures(
    packets: &mut std::iter::Peekable<impl Iterator<Item = Packet>>,
) -> Vec<Signature> {
    let mut signatures = Vec::new();
    loop {
        match packets.peek().map(|p| p.tag()) {
            Some(Tag::Signature) => {
                let Some(Packet::Signature(sig)) = packets.next() else {
                    unreachable!("peeked");
                };
                signatures.push(sig);
            }
            Some(Tag::Trust) => {
                packets.next();
            }
            _ => return signatures,
        }
    }
}

key_parser!(
    SignedPublicKey,
    parse_public_keys,
    Tag::PublicKey,
    PublicKey,
    Tag::PublicSubkey,
    PublicSubkey,
    SignedPublicSubKey
);
key_parser!(
    SignedSecretKey,
    parse_secret_keys,
    Tag::SecretKey,
    SecretKey,
    Tag::SecretSubkey,
    SecretSubkey,
    SignedSecretSubKey
);
