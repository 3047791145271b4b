use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use zeroize::Zeroizing;

use opgp::composed::key::{KeyBuilder, KeyType, SubkeyBuilder};
use opgp::composed::message::{Edata, SessionKey};
use opgp::crypto::aead::AeadAlgorithm;
use opgp::crypto::ecc_curve::EccCurve;
use opgp::crypto::hash::HashAlgorithm;
use opgp::crypto::sym::SymmetricKeyAlgorithm;
use opgp::errors::Error;
use opgp::packet::{AeadEncryptedData, PublicKeyTrait};
use opgp::ser::Serialize;
use opgp::{Config, Message};

fn test_key(seed: u64) -> opgp::SignedSecretKey {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    KeyBuilder::new(KeyType::EdDsaLegacy, "Msg <msg@example.org>")
        .subkey(SubkeyBuilder::encryption(KeyType::Ecdh(EccCurve::Curve25519)))
        .subkey(SubkeyBuilder::signing(KeyType::EdDsaLegacy))
        .build(&mut rng)
        .unwrap()
}

#[test]
fn password_encryption_roundtrip_seipd() {
    let mut rng = ChaCha8Rng::seed_from_u64(200);
    let config = Config::default();

    let message = Message::new_literal_bytes(b"", b"under passphrase");
    let encrypted = message
        .encrypt_with_password(&mut rng, &config, "secret")
        .unwrap();

    // serialization roundtrip of the encrypted form
    let bytes = encrypted.to_bytes().unwrap();
    let parsed = Message::from_bytes(&bytes[..]).unwrap();
    assert_eq!(parsed, encrypted);

    let decrypted = parsed
        .decrypt(&mut rng, &config, &[], &["secret"])
        .unwrap();
    assert_eq!(decrypted.get_literal().unwrap().data(), b"under passphrase");

    // wrong passphrase never yields plaintext
    assert!(parsed.decrypt(&mut rng, &config, &[], &["wrong"]).is_err());
}

#[test]
fn public_key_encryption_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(201);
    let config = Config::default();
    let key = test_key(202);

    let now = chrono::Utc::now();
    let recipient = key.encryption_key(None, now).unwrap();

    let message = Message::new_literal_bytes(b"file", b"to a key");
    let encrypted = message
        .encrypt_to_keys(&mut rng, &config, &[&recipient])
        .unwrap();

    let bytes = encrypted.to_bytes().unwrap();
    let parsed = Message::from_bytes(&bytes[..]).unwrap();

    let decrypted = parsed
        .decrypt(&mut rng, &config, &[(&key, "")], &[])
        .unwrap();
    assert_eq!(decrypted.get_literal().unwrap().data(), b"to a key");

    // an unrelated key has no matching esk
    let other = test_key(203);
    let err = parsed
        .decrypt(&mut rng, &config, &[(&other, "")], &[])
        .unwrap_err();
    assert!(matches!(err, Error::MissingSessionKey { .. }));
}

#[test]
fn aead_encryption_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(204);
    let config = Config {
        aead_protect: true,
        ..Config::default()
    };
    let key = test_key(205);
    let now = chrono::Utc::now();
    let recipient = key.encryption_key(None, now).unwrap();

    let message = Message::new_literal_bytes(b"", b"aead protected payload");
    let encrypted = message
        .encrypt_to_keys(&mut rng, &config, &[&recipient])
        .unwrap();

    let bytes = encrypted.to_bytes().unwrap();
    let parsed = Message::from_bytes(&bytes[..]).unwrap();
    let decrypted = parsed
        .decrypt(&mut rng, &config, &[(&key, "")], &[])
        .unwrap();
    assert_eq!(
        decrypted.get_literal().unwrap().data(),
        b"aead protected payload"
    );
}

#[test]
fn aead_known_session_key_and_tamper() {
    // AES-256 / EAX, chunk size octet 14, fixed session key
    let config = Config::default();
    let sym = SymmetricKeyAlgorithm::Aes256;
    let session_key = SessionKey {
        sym_algorithm: sym,
        key: Zeroizing::new(vec![0x42; sym.key_size()]),
    };

    let literal = Message::new_literal_bytes(b"", b"Hello, World!\n");
    let edata = AeadEncryptedData::encrypt_with_iv(
        sym,
        AeadAlgorithm::Eax,
        14,
        &session_key.key,
        &[0x24; 16],
        &literal.to_bytes().unwrap(),
    )
    .unwrap();
    let encrypted = Message::Encrypted {
        esk: vec![],
        edata: Edata::AeadEncryptedData(edata),
    };

    let decrypted = encrypted
        .decrypt_with_session_key(&config, &session_key)
        .unwrap();
    assert_eq!(decrypted.get_literal().unwrap().data(), b"Hello, World!\n");

    // flip the last byte of the final tag
    let mut bytes = encrypted.to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let tampered = Message::from_bytes(&bytes[..]).unwrap();

    // the data chunks still stream out, the final tag aborts
    let Message::Encrypted {
        edata: Edata::AeadEncryptedData(packet),
        ..
    } = &tampered
    else {
        panic!("expected aead edata");
    };
    let mut decryptor = packet.decryptor(&session_key.key).unwrap();
    let mut emitted = 0usize;
    let err = loop {
        match decryptor.next() {
            Some(Ok(chunk)) => emitted += chunk.len(),
            Some(Err(err)) => break err,
            None => panic!("expected an integrity failure"),
        }
    };
    assert_eq!(emitted, literal.to_bytes().unwrap().len());
    assert!(matches!(err, Error::AeadTagMismatch { .. }));

    // and the high level api refuses to produce plaintext
    assert!(tampered
        .decrypt_with_session_key(&config, &session_key)
        .is_err());
}

#[test]
fn tampered_mdc_yields_no_plaintext() {
    let mut rng = ChaCha8Rng::seed_from_u64(206);
    let config = Config::default();

    let message = Message::new_literal_bytes(b"", b"integrity protected");
    let encrypted = message
        .encrypt_with_password(&mut rng, &config, "pw")
        .unwrap();

    // zero the trailing 20 bytes of the encrypted blob: that is where the
    // encrypted MDC hash lives
    let mut bytes = encrypted.to_bytes().unwrap();
    let len = bytes.len();
    for byte in &mut bytes[len - 20..] {
        *byte = 0;
    }

    let tampered = Message::from_bytes(&bytes[..]).unwrap();
    let err = tampered
        .decrypt(&mut rng, &config, &[], &["pw"])
        .unwrap_err();
    assert!(matches!(err, Error::MdcMismatch { .. }));
}

#[test]
fn one_pass_sign_and_verify() {
    // sign the binary message 0x00..0xff with ed25519, verify, then mutate
    let mut rng = ChaCha8Rng::seed_from_u64(207);
    let key = test_key(208);
    let now = chrono::Utc::now();
    let signer = key.signing_key(None, now).unwrap();
    let data: Vec<u8> = (0u8..=255).collect();

    let message = Message::new_literal_bytes(b"", &data);
    let signed = message
        .sign(&mut rng, &signer, "", HashAlgorithm::Sha256)
        .unwrap();

    let bytes = signed.to_bytes().unwrap();
    let parsed = Message::from_bytes(&bytes[..]).unwrap();
    assert_eq!(parsed, signed);

    parsed.verify(&signer).unwrap();

    // mutating byte 17 of the literal payload breaks verification; locate
    // the framed literal packet inside the signed message
    let literal_packet = {
        let mut v = Vec::new();
        use opgp::packet::PacketTrait;
        parsed
            .get_literal()
            .unwrap()
            .to_writer_with_header(&mut v)
            .unwrap();
        v
    };
    let pos = bytes
        .windows(literal_packet.len())
        .position(|w| w == &literal_packet[..])
        .unwrap();
    let header_len = literal_packet.len() - data.len();
    let mut mutated = bytes.clone();
    mutated[pos + header_len + 17] ^= 0x01;

    let broken = Message::from_bytes(&mutated[..]).unwrap();
    assert!(broken.verify(&signer).is_err());

    // a bit flip in the signature material also fails
    let mut mutated = bytes.clone();
    let last = mutated.len() - 1;
    mutated[last] ^= 0x01;
    match Message::from_bytes(&mutated[..]) {
        Ok(broken) => assert!(broken.verify(&signer).is_err()),
        Err(_) => {} // mpi re-framing may already reject it
    }

    // the wrong key does not verify
    let other = test_key(209);
    let other_signer = other.signing_key(None, now).unwrap();
    assert!(parsed.verify(&other_signer).is_err());
}

#[test]
fn signed_message_inside_encryption() {
    let mut rng = ChaCha8Rng::seed_from_u64(210);
    let config = Config::default();
    let key = test_key(211);
    let now = chrono::Utc::now();

    let signer = key.signing_key(None, now).unwrap();
    let recipient = key.encryption_key(None, now).unwrap();

    let signed = Message::new_literal_bytes(b"", b"sign then encrypt")
        .sign(&mut rng, &signer, "", HashAlgorithm::Sha256)
        .unwrap();
    let encrypted = signed
        .encrypt_to_keys(&mut rng, &config, &[&recipient])
        .unwrap();

    let decrypted = Message::from_bytes(&encrypted.to_bytes().unwrap()[..])
        .unwrap()
        .decrypt(&mut rng, &config, &[(&key, "")], &[])
        .unwrap();

    decrypted.verify(&signer).unwrap();
    assert_eq!(
        decrypted.get_literal().unwrap().data(),
        b"sign then encrypt"
    );
}

#[test]
fn compressed_message_roundtrip() {
    use opgp::types::CompressionAlgorithm;

    let message = Message::new_literal_bytes(b"", b"zip zip zip zip zip zip zip");
    for alg in [
        CompressionAlgorithm::Uncompressed,
        CompressionAlgorithm::Zip,
        CompressionAlgorithm::Zlib,
        CompressionAlgorithm::Bzip2,
    ] {
        let compressed = message.compress(alg, 6).unwrap();
        let bytes = compressed.to_bytes().unwrap();
        let parsed = Message::from_bytes(&bytes[..]).unwrap();
        let decompressed = parsed.decompress().unwrap();
        assert_eq!(
            decompressed.get_literal().unwrap().data(),
            message.get_literal().unwrap().data(),
            "{alg:?}"
        );
    }
}

#[test]
fn unauthenticated_messages_are_gated() {
    use opgp::packet::SymEncryptedData;

    let mut rng = ChaCha8Rng::seed_from_u64(212);
    let sym = SymmetricKeyAlgorithm::Aes256;
    let session_key = SessionKey {
        sym_algorithm: sym,
        key: Zeroizing::new(vec![0x11; sym.key_size()]),
    };

    let literal = Message::new_literal_bytes(b"", b"legacy");
    let packet = SymEncryptedData::encrypt(
        &mut rng,
        sym,
        &session_key.key,
        &literal.to_bytes().unwrap(),
    )
    .unwrap();
    let encrypted = Message::Encrypted {
        esk: vec![],
        edata: Edata::SymEncryptedData(packet),
    };

    // rejected by default
    let config = Config::default();
    let err = encrypted
        .decrypt_with_session_key(&config, &session_key)
        .unwrap_err();
    assert!(matches!(err, Error::Policy { .. }));

    // allowed when explicitly configured
    let config = Config {
        allow_unauthenticated_messages: true,
        ..Config::default()
    };
    let decrypted = encrypted
        .decrypt_with_session_key(&config, &session_key)
        .unwrap();
    assert_eq!(decrypted.get_literal().unwrap().data(), b"legacy");
}

#[test]
fn gcm_requires_opt_in() {
    let config = Config {
        aead_protect: true,
        preferred_aead_algorithm: AeadAlgorithm::ExperimentalGcm,
        ..Config::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(213);

    let message = Message::new_literal_bytes(b"", b"gcm");
    let err = message
        .encrypt_with_password(&mut rng, &config, "pw")
        .unwrap_err();
    assert!(matches!(err, Error::Policy { .. }));

    let config = Config {
        allow_experimental_gcm: true,
        ..config
    };
    let encrypted = message
        .encrypt_with_password(&mut rng, &config, "pw")
        .unwrap();
    let decrypted = encrypted
        .decrypt(&mut rng, &config, &[], &["pw"])
        .unwrap();
    assert_eq!(decrypted.get_literal().unwrap().data(), b"gcm");
}

#[test]
fn aead_chunk_size_changes_ciphertext_not_plaintext() {
    let sym = SymmetricKeyAlgorithm::Aes256;
    let key = vec![0x07; sym.key_size()];
    let iv = [0x09; 16];
    let plaintext = vec![0x5C; 1000];

    let c1 = AeadEncryptedData::encrypt_with_iv(sym, AeadAlgorithm::Eax, 6, &key, &iv, &plaintext)
        .unwrap();
    let c2 = AeadEncryptedData::encrypt_with_iv(sym, AeadAlgorithm::Eax, 10, &key, &iv, &plaintext)
        .unwrap();

    assert_ne!(c1.to_bytes().unwrap(), c2.to_bytes().unwrap());
    assert_eq!(c1.decrypt(&key).unwrap(), plaintext);
    assert_eq!(c2.decrypt(&key).unwrap(), plaintext);
}
