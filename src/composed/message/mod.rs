use std::io::{self, BufRead};
use std::iter::Peekable;

use chrono::SubsecRound;
use log::{debug, warn};
use rand::{CryptoRng, Rng};
use zeroize::Zeroizing;

use crate::composed::key::SignedSecretKey;
use crate::config::Config;
use crate::crypto::aead::AeadAlgorithm;
use crate::crypto::checksum;
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{CompositionSnafu, Error, MissingSessionKeySnafu, PolicySnafu, Result};
use crate::packet::{
    AeadEncryptedData, CompressedData, LiteralData, OnePassSignature, Packet, PacketParser,
    PacketTrait, PublicKeyTrait, SecretKeyTrait, Signature, SignatureConfig, SignatureType,
    Subpacket, SubpacketData, SymEncryptedData, SymEncryptedProtectedData,
    SymKeyEncryptedSessionKey,
};
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, KeyId};

/// An encrypted session key packet, public key or passphrase based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Esk {
    PublicKeyEncryptedSessionKey(crate::packet::PublicKeyEncryptedSessionKey),
    SymKeyEncryptedSessionKey(SymKeyEncryptedSessionKey),
}

/// The encrypted payload of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edata {
    SymEncryptedData(SymEncryptedData),
    SymEncryptedProtectedData(SymEncryptedProtectedData),
    AeadEncryptedData(AeadEncryptedData),
}

/// A decrypted session key: algorithm and raw key bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub sym_algorithm: SymmetricKeyAlgorithm,
    pub key: Zeroizing<Vec<u8>>,
}

/// An OpenPGP message, one of the four grammar productions, possibly nested.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-11.3>
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Message {
    Literal(LiteralData),
    Compressed(CompressedData),
    Signed {
        /// The signed content. `None` for detached signatures.
        message: Option<Box<Message>>,
        /// Present for one pass signed messages.
        one_pass_signature: Option<OnePassSignature>,
        signature: Signature,
    },
    Encrypted {
        esk: Vec<Esk>,
        edata: Edata,
    },
}

impl Message {
    /// Builds a literal message from a binary payload.
    pub fn new_literal_bytes(file_name: &[u8], data: &[u8]) -> Self {
        Message::Literal(LiteralData::from_bytes(
            bytes::Bytes::copy_from_slice(file_name),
            bytes::Bytes::copy_from_slice(data),
        ))
    }

    /// Builds a literal message from text, normalizing line endings.
    pub fn new_literal(file_name: &[u8], text: &str) -> Self {
        Message::Literal(LiteralData::from_str(
            bytes::Bytes::copy_from_slice(file_name),
            text,
        ))
    }

    /// Parses a message from its binary serialization, pulling packet by
    /// packet from the source.
    pub fn from_bytes(source: impl BufRead) -> Result<Self> {
        let packets = PacketParser::new(source).collect::<Result<Vec<_>>>()?;
        Self::from_packets(packets)
    }

    /// Interprets a packet sequence as a single message, enforcing the
    /// composition rules.
    pub fn from_packets(packets: impl IntoIterator<Item = Packet>) -> Result<Self> {
        let mut iter = packets.into_iter().peekable();
        let message = next_message(&mut iter)?;
        if let Some(trailing) = iter.next() {
            return CompositionSnafu {
                message: format!("trailing packet {:?} after the message", trailing.tag()),
            }
            .fail();
        }
        Ok(message)
    }

    /// Descends to the literal data, through signature layers.
    pub fn get_literal(&self) -> Option<&LiteralData> {
        match self {
            Message::Literal(literal) => Some(literal),
            Message::Signed { message, .. } => message.as_ref()?.get_literal(),
            _ => None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Message::Encrypted { .. })
    }

    /// Expands a compressed message into its inner message, decompressing
    /// as the packet parser pulls.
    pub fn decompress(&self) -> Result<Message> {
        match self {
            Message::Compressed(packet) => {
                Message::from_bytes(io::BufReader::new(packet.decompress()?))
            }
            _ => Ok(self.clone()),
        }
    }

    /// Wraps the message in a compressed data packet.
    pub fn compress(&self, alg: CompressionAlgorithm, level: u32) -> Result<Message> {
        let data = self.to_bytes()?;
        Ok(Message::Compressed(CompressedData::from_compressible(
            alg, level, &data,
        )?))
    }

    /// Signs the message, producing a one pass signed message.
    pub fn sign<R, K>(
        self,
        rng: &mut R,
        key: &K,
        passphrase: &str,
        hash_alg: HashAlgorithm,
    ) -> Result<Message>
    where
        R: CryptoRng + Rng,
        K: SecretKeyTrait,
    {
        let literal = self
            .get_literal()
            .ok_or_else(|| format_err!("only literal content can be signed"))?;

        // text mode is normalized on the fly while hashing
        let typ = if literal.is_binary() {
            SignatureType::Binary
        } else {
            SignatureType::Text
        };

        let mut config = SignatureConfig::v4(typ, key.algorithm(), hash_alg);
        config.hashed_subpackets = vec![
            Subpacket::critical(SubpacketData::SignatureCreationTime(
                chrono::Utc::now().trunc_subsecs(0),
            )),
            Subpacket::regular(SubpacketData::Issuer(key.key_id())),
        ];

        let ops = OnePassSignature::new(typ, hash_alg, key.algorithm(), key.key_id());
        let signature = config.sign(rng, key, passphrase, literal.data())?;

        Ok(Message::Signed {
            message: Some(Box::new(self)),
            one_pass_signature: Some(ops),
            signature,
        })
    }

    /// Verifies every signature layer against the given key.
    ///
    /// Results become observable only after the whole payload was hashed;
    /// nested one pass signature layers pair LIFO with their trailing
    /// signature packets, which the [`Message`] structure encodes directly.
    pub fn verify(&self, key: &impl PublicKeyTrait) -> Result<()> {
        match self {
            Message::Signed {
                message, signature, ..
            } => {
                let inner = message
                    .as_ref()
                    .ok_or_else(|| format_err!("detached signatures need external data"))?;

                let literal = inner
                    .get_literal()
                    .ok_or_else(|| format_err!("no literal data to verify"))?;

                // the payload streams through the hash context; text mode
                // normalization happens inside
                signature.verify_reader(key, literal.data())?;

                // nested layers verify against the same key only if they
                // claim the same issuer
                if let Message::Signed { .. } = &**inner {
                    inner.verify(key)?;
                }
                Ok(())
            }
            Message::Compressed(_) => self.decompress()?.verify(key),
            Message::Literal(_) => bail!("message carries no signature"),
            Message::Encrypted { .. } => bail!("decrypt the message before verifying"),
        }
    }

    /// Encrypts the message to a set of public keys.
    pub fn encrypt_to_keys<R, K>(
        &self,
        rng: &mut R,
        config: &Config,
        keys: &[&K],
    ) -> Result<Message>
    where
        R: CryptoRng + Rng,
        K: PublicKeyTrait,
    {
        ensure!(!keys.is_empty(), "no recipients");

        let (session_key, edata) = self.encrypt_payload(rng, config)?;

        let mut esk = Vec::with_capacity(keys.len());
        for key in keys {
            let payload = session_key_payload(&session_key);
            let values = key.encrypt_session_key(rng, &payload)?;
            esk.push(Esk::PublicKeyEncryptedSessionKey(
                crate::packet::PublicKeyEncryptedSessionKey::new(
                    key.key_id(),
                    key.algorithm(),
                    values,
                ),
            ));
        }

        Ok(Message::Encrypted { esk, edata })
    }

    /// Encrypts the message with a passphrase.
    pub fn encrypt_with_password<R>(
        &self,
        rng: &mut R,
        config: &Config,
        passphrase: &str,
    ) -> Result<Message>
    where
        R: CryptoRng + Rng,
    {
        let (session_key, edata) = self.encrypt_payload(rng, config)?;

        let skesk = SymKeyEncryptedSessionKey::encrypt(
            rng,
            passphrase,
            &session_key.key,
            session_key.sym_algorithm,
            config.preferred_symmetric_algorithm,
            config.s2k_iteration_count_byte,
        )?;

        Ok(Message::Encrypted {
            esk: vec![Esk::SymKeyEncryptedSessionKey(skesk)],
            edata,
        })
    }

    fn encrypt_payload<R>(&self, rng: &mut R, config: &Config) -> Result<(SessionKey, Edata)>
    where
        R: CryptoRng + Rng,
    {
        let sym = config.preferred_symmetric_algorithm;
        let mut key = Zeroizing::new(vec![0u8; sym.key_size()]);
        rng.fill_bytes(&mut key);

        let plaintext = self.to_bytes()?;

        let edata = if config.aead_protect {
            let aead = config.preferred_aead_algorithm;
            if aead == AeadAlgorithm::ExperimentalGcm && !config.allow_experimental_gcm {
                return PolicySnafu {
                    message: "experimental GCM is not enabled".to_string(),
                }
                .fail();
            }
            Edata::AeadEncryptedData(AeadEncryptedData::encrypt(
                rng,
                sym,
                aead,
                config.chunk_size_byte(),
                &key,
                &plaintext,
            )?)
        } else {
            Edata::SymEncryptedProtectedData(SymEncryptedProtectedData::encrypt(
                rng, sym, &key, &plaintext,
            )?)
        };

        Ok((
            SessionKey {
                sym_algorithm: sym,
                key,
            },
            edata,
        ))
    }

    /// Decrypts an encrypted message with any combination of secret keys
    /// (with their unlock passphrases) and message passphrases.
    pub fn decrypt<R>(
        &self,
        rng: &mut R,
        config: &Config,
        keys: &[(&SignedSecretKey, &str)],
        passphrases: &[&str],
    ) -> Result<Message>
    where
        R: CryptoRng + Rng,
    {
        let Message::Encrypted { esk, edata } = self else {
            bail!("the message is not encrypted");
        };

        let candidates = collect_session_keys(rng, config, esk, keys, passphrases);
        if candidates.is_empty() {
            return MissingSessionKeySnafu.fail();
        }

        let mut last_err = None;
        for session_key in &candidates {
            match decrypt_edata(config, edata, session_key) {
                Ok(message) => return Ok(message),
                Err(err) => {
                    debug!("session key candidate failed: {:?}", err);
                    last_err = Some(err);
                }
            }
        }

        // integrity failures are propagated as-is, never downgraded to a
        // missing session key
        match last_err {
            Some(err) => Err(err),
            None => MissingSessionKeySnafu.fail(),
        }
    }

    /// Decrypts the payload with an already known session key.
    pub fn decrypt_with_session_key(
        &self,
        config: &Config,
        session_key: &SessionKey,
    ) -> Result<Message> {
        let Message::Encrypted { edata, .. } = self else {
            bail!("the message is not encrypted");
        };
        decrypt_edata(config, edata, session_key)
    }
}

/// `algorithm ‖ key ‖ checksum`, the plaintext body of a PKESK.
fn session_key_payload(session_key: &SessionKey) -> Zeroizing<Vec<u8>> {
    let mut payload = Zeroizing::new(Vec::with_capacity(session_key.key.len() + 3));
    payload.push(session_key.sym_algorithm.into());
    payload.extend_from_slice(&session_key.key);
    payload.extend_from_slice(&checksum::calculate_simple(&session_key.key).to_be_bytes());
    payload
}

fn parse_session_key_payload(payload: &[u8]) -> Result<SessionKey> {
    ensure!(payload.len() > 3, "esk payload too short");
    let sym_algorithm = SymmetricKeyAlgorithm::from(payload[0]);
    let (key, expected) = payload[1..].split_at(payload.len() - 3);
    checksum::simple(expected, key)?;
    ensure_eq!(key.len(), sym_algorithm.key_size(), "session key length");

    Ok(SessionKey {
        sym_algorithm,
        key: Zeroizing::new(key.to_vec()),
    })
}

fn collect_session_keys<R>(
    rng: &mut R,
    config: &Config,
    esks: &[Esk],
    keys: &[(&SignedSecretKey, &str)],
    passphrases: &[&str],
) -> Vec<SessionKey>
where
    R: CryptoRng + Rng,
{
    let mut candidates = Vec::new();

    for esk in esks {
        match esk {
            Esk::PublicKeyEncryptedSessionKey(pkesk) => {
                for (key, key_pw) in keys {
                    for secret in matching_secret_keys(key, pkesk.id(), config) {
                        match secret
                            .decrypt_session_key(rng, key_pw, pkesk.values())
                            .and_then(|payload| parse_session_key_payload(&payload))
                        {
                            Ok(session_key) => candidates.push(session_key),
                            Err(err) => {
                                warn!("esk decryption failed: {:?}", err);
                                if config.constant_time_pkcs1_decryption {
                                    // substitute a random session key so a
                                    // padding failure is indistinguishable
                                    // from a later integrity failure
                                    if let Some(session_key) =
                                        random_session_key(rng, config)
                                    {
                                        candidates.push(session_key);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            Esk::SymKeyEncryptedSessionKey(skesk) => {
                for passphrase in passphrases {
                    match skesk.decrypt(passphrase) {
                        Ok((sym_algorithm, key)) => candidates.push(SessionKey {
                            sym_algorithm,
                            key,
                        }),
                        Err(err) => warn!("skesk decryption failed: {:?}", err),
                    }
                }
            }
        }
    }

    candidates
}

fn random_session_key<R>(rng: &mut R, config: &Config) -> Option<SessionKey>
where
    R: CryptoRng + Rng,
{
    let sym = *config
        .constant_time_pkcs1_supported_symmetric_algorithms
        .first()?;
    let mut key = Zeroizing::new(vec![0u8; sym.key_size()]);
    rng.fill_bytes(&mut key);
    Some(SessionKey {
        sym_algorithm: sym,
        key,
    })
}

/// All secret keys in the transferable key that a PKESK with `id` may
/// address: exact key id matches, or every key for the wildcard id.
fn matching_secret_keys<'a>(
    key: &'a SignedSecretKey,
    id: &KeyId,
    config: &Config,
) -> Vec<crate::composed::key::KeySelection<'a, crate::packet::SecretKey, crate::packet::SecretSubkey>> {
    use crate::composed::key::KeySelection;

    let mut matches = Vec::new();

    if id.is_wildcard() {
        for subkey in &key.secret_subkeys {
            matches.push(KeySelection::Subkey(&subkey.key));
        }
        matches.push(KeySelection::Primary(&key.primary_key));
        return matches;
    }

    for subkey in &key.secret_subkeys {
        if &subkey.key.key_id() == id {
            let usable = key.encryption_key(Some(id), chrono::Utc::now()).is_some()
                || config.allow_insecure_decryption_with_signing_keys;
            if usable {
                matches.push(KeySelection::Subkey(&subkey.key));
            } else {
                warn!("skipping subkey {:?} without encryption flags", id);
            }
        }
    }
    if &key.primary_key.key_id() == id {
        matches.push(KeySelection::Primary(&key.primary_key));
    }

    matches
}

/// Decrypts the payload by letting the packet parser pull plaintext through
/// the streaming decryptor: nothing is materialized between the ciphertext
/// and the parsed packets, and the MDC / final AEAD tag is validated before
/// the final read completes.
fn decrypt_edata(config: &Config, edata: &Edata, session_key: &SessionKey) -> Result<Message> {
    let plaintext: Box<dyn BufRead> = match edata {
        Edata::SymEncryptedData(packet) => {
            if !config.allow_unauthenticated_messages {
                return PolicySnafu {
                    message: "unauthenticated (tag 9) messages are not allowed".to_string(),
                }
                .fail();
            }
            Box::new(packet.decryptor(session_key.sym_algorithm, &session_key.key)?)
        }
        Edata::SymEncryptedProtectedData(packet) => {
            Box::new(packet.decryptor(session_key.sym_algorithm, &session_key.key)?)
        }
        Edata::AeadEncryptedData(packet) => {
            if packet.aead() == AeadAlgorithm::ExperimentalGcm && !config.allow_experimental_gcm {
                return PolicySnafu {
                    message: "experimental GCM is not enabled".to_string(),
                }
                .fail();
            }
            ensure_eq!(
                packet.sym_algorithm(),
                session_key.sym_algorithm,
                "session key cipher mismatch"
            );
            Box::new(packet.reader(&session_key.key)?)
        }
    };

    let packets = PacketParser::new(plaintext)
        .collect::<Result<Vec<_>>>()
        .map_err(|err| match err {
            Error::IO { source, .. } => Error::from_stream_io(source),
            err => err,
        })?;
    Message::from_packets(packets)
}

fn next_message(packets: &mut Peekable<impl Iterator<Item = Packet>>) -> Result<Message> {
    // skip leading markers
    while matches!(packets.peek(), Some(Packet::Marker(_))) {
        packets.next();
    }

    let Some(packet) = packets.next() else {
        return CompositionSnafu {
            message: "empty message".to_string(),
        }
        .fail();
    };

    match packet {
        Packet::LiteralData(literal) => Ok(Message::Literal(literal)),
        Packet::CompressedData(compressed) => Ok(Message::Compressed(compressed)),
        Packet::OnePassSignature(ops) => {
            // OPS, nested message, then the matching trailing signature
            let message = next_message(packets)?;
            let Some(Packet::Signature(signature)) = packets.next() else {
                return CompositionSnafu {
                    message: "one pass signature without a trailing signature".to_string(),
                }
                .fail();
            };
            Ok(Message::Signed {
                message: Some(Box::new(message)),
                one_pass_signature: Some(ops),
                signature,
            })
        }
        Packet::Signature(signature) => {
            // prefixed signed message, or a detached signature
            let message = if packets.peek().is_some() {
                Some(Box::new(next_message(packets)?))
            } else {
                None
            };
            Ok(Message::Signed {
                message,
                one_pass_signature: None,
                signature,
            })
        }
        Packet::PublicKeyEncryptedSessionKey(_) | Packet::SymKeyEncryptedSessionKey(_) => {
            let mut esk = vec![match packet {
                Packet::PublicKeyEncryptedSessionKey(p) => Esk::PublicKeyEncryptedSessionKey(p),
                Packet::SymKeyEncryptedSessionKey(p) => Esk::SymKeyEncryptedSessionKey(p),
                _ => unreachable!("matched above"),
            }];

            loop {
                match packets.peek() {
                    Some(Packet::PublicKeyEncryptedSessionKey(_)) => {
                        let Some(Packet::PublicKeyEncryptedSessionKey(p)) = packets.next() else {
                            unreachable!("peeked");
                        };
                        esk.push(Esk::PublicKeyEncryptedSessionKey(p));
                    }
                    Some(Packet::SymKeyEncryptedSessionKey(_)) => {
                        let Some(Packet::SymKeyEncryptedSessionKey(p)) = packets.next() else {
                            unreachable!("peeked");
                        };
                        esk.push(Esk::SymKeyEncryptedSessionKey(p));
                    }
                    _ => break,
                }
            }

            let edata = match packets.next() {
                Some(Packet::SymEncryptedData(p)) => Edata::SymEncryptedData(p),
                Some(Packet::SymEncryptedProtectedData(p)) => Edata::SymEncryptedProtectedData(p),
                Some(Packet::AeadEncryptedData(p)) => Edata::AeadEncryptedData(p),
                other => {
                    return CompositionSnafu {
                        message: format!(
                            "expected encrypted data after the esks, got {:?}",
                            other.map(|p| p.tag())
                        ),
                    }
                    .fail();
                }
            };

            Ok(Message::Encrypted { esk, edata })
        }
        // a session-key-less encrypted message
        Packet::SymEncryptedData(p) => Ok(Message::Encrypted {
            esk: Vec::new(),
            edata: Edata::SymEncryptedData(p),
        }),
        Packet::SymEncryptedProtectedData(p) => Ok(Message::Encrypted {
            esk: Vec::new(),
            edata: Edata::SymEncryptedProtectedData(p),
        }),
        Packet::AeadEncryptedData(p) => Ok(Message::Encrypted {
            esk: Vec::new(),
            edata: Edata::AeadEncryptedData(p),
        }),
        other => CompositionSnafu {
            message: format!("packet {:?} is not valid in a message", other.tag()),
        }
        .fail(),
    }
}

impl Serialize for Message {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Message::Literal(literal) => literal.to_writer_with_header(writer),
            Message::Compressed(compressed) => compressed.to_writer_with_header(writer),
            Message::Signed {
                message,
                one_pass_signature,
                signature,
            } => {
                if let Some(ops) = one_pass_signature {
                    ops.to_writer_with_header(writer)?;
                }
                if let Some(message) = message {
                    message.to_writer(writer)?;
                }
                signature.to_writer_with_header(writer)
            }
            Message::Encrypted { esk, edata } => {
                for esk in esk {
                    match esk {
                        Esk::PublicKeyEncryptedSessionKey(p) => p.to_writer_with_header(writer)?,
                        Esk::SymKeyEncryptedSessionKey(p) => p.to_writer_with_header(writer)?,
                    }
                }
                match edata {
                    Edata::SymEncryptedData(p) => p.to_writer_with_header(writer),
                    Edata::SymEncryptedProtectedData(p) => p.to_writer_with_header(writer),
                    Edata::AeadEncryptedData(p) => p.to_writer_with_header(writer),
                }
            }
        }
    }

    fn write_len(&self) -> usize {
        match self {
            Message::Literal(literal) => literal.write_len_with_header(),
            Message::Compressed(compressed) => compressed.write_len_with_header(),
            Message::Signed {
                message,
                one_pass_signature,
                signature,
            } => {
                let mut sum = 0;
                if let Some(ops) = one_pass_signature {
                    sum += ops.write_len_with_header();
                }
                if let Some(message) = message {
                    sum += message.write_len();
                }
                sum + signature.write_len_with_header()
            }
            Message::Encrypted { esk, edata } => {
                let mut sum = 0;
                for esk in esk {
                    sum += match esk {
                        Esk::PublicKeyEncryptedSessionKey(p) => p.write_len_with_header(),
                        Esk::SymKeyEncryptedSessionKey(p) => p.write_len_with_header(),
                    };
                }
                sum + match edata {
                    Edata::SymEncryptedData(p) => p.write_len_with_header(),
                    Edata::SymEncryptedProtectedData(p) => p.write_len_with_header(),
                    Edata::AeadEncryptedData(p) => p.write_len_with_header(),
                }
            }
        }
    }
}
