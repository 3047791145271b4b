use chrono::{SubsecRound, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use opgp::composed::key::{parse_secret_keys, KeyBuilder, KeyType, SubkeyBuilder};
use opgp::crypto::ecc_curve::EccCurve;
use opgp::crypto::hash::HashAlgorithm;
use opgp::crypto::sym::SymmetricKeyAlgorithm;
use opgp::packet::{
    PacketParser, PublicKeyTrait, SignatureConfig, SignatureType, Subpacket, SubpacketData,
};
use opgp::ser::Serialize;
use opgp::types::{EncryptedSecretParams, SecretParams, Tag};
use opgp::SignedSecretKey;

#[test]
fn key_roundtrip_preserves_fingerprint_and_bindings() {
    let mut rng = ChaCha8Rng::seed_from_u64(100);

    let key = KeyBuilder::new(KeyType::EdDsaLegacy, "Test One <one@example.org>")
        .subkey(SubkeyBuilder::encryption(KeyType::Ecdh(EccCurve::Curve25519)))
        .subkey(SubkeyBuilder::signing(KeyType::EdDsaLegacy))
        .build(&mut rng)
        .unwrap();
    key.verify().unwrap();

    let bytes = key.to_bytes().unwrap();
    assert_eq!(bytes.len(), key.write_len());

    let parsed = SignedSecretKey::from_bytes_single(&bytes[..]).unwrap();
    assert_eq!(parsed.fingerprint(), key.fingerprint());
    parsed.verify().unwrap();

    // byte identical re-serialization
    assert_eq!(parsed.to_bytes().unwrap(), bytes);
}

#[test]
fn locked_secret_key_roundtrip() {
    // generate, lock the secret material under a passphrase, serialize,
    // parse back, unlock and re-serialize byte identically
    let mut rng = ChaCha8Rng::seed_from_u64(101);
    let passphrase = "hello world";

    let mut key = KeyBuilder::new(KeyType::EdDsaLegacy, "Locked <locked@example.org>")
        .build(&mut rng)
        .unwrap();

    let SecretParams::Plain(plain) = key.primary_key.secret_params().clone() else {
        panic!("builder produces plain keys");
    };
    let locked = EncryptedSecretParams::lock(
        &mut rng,
        &plain,
        passphrase,
        SymmetricKeyAlgorithm::Aes256,
        224,
    )
    .unwrap();
    key.primary_key = opgp::packet::SecretKey::new(
        key.primary_key.inner().clone(),
        SecretParams::Encrypted(locked),
    );

    let bytes = key.to_bytes().unwrap();
    let parsed = SignedSecretKey::from_bytes_single(&bytes[..]).unwrap();
    assert!(parsed.primary_key.secret_params().is_encrypted());
    assert!(parsed.primary_key.has_sha1_checksum());

    // the secret material unlocks with the right passphrase only
    parsed
        .primary_key
        .unlock(passphrase, |_, unlocked| {
            assert_eq!(unlocked, &plain);
            Ok(())
        })
        .unwrap();
    assert!(parsed.primary_key.unlock("wrong", |_, _| Ok(())).is_err());

    // re-serialization does not touch the encrypted blob
    assert_eq!(parsed.to_bytes().unwrap(), bytes);
}

#[test]
fn key_queries_select_the_right_subkeys() {
    let mut rng = ChaCha8Rng::seed_from_u64(102);
    let now = Utc::now().trunc_subsecs(0);

    let key = KeyBuilder::new(KeyType::EdDsaLegacy, "Main <main@example.org>")
        .user_id("Second <second@example.org>")
        .subkey(SubkeyBuilder::encryption(KeyType::Ecdh(EccCurve::Curve25519)))
        .subkey(SubkeyBuilder::signing(KeyType::EdDsaLegacy))
        .build(&mut rng)
        .unwrap();

    let encryption = key.encryption_key(None, now).expect("encryption subkey");
    let signing = key.signing_key(None, now).expect("signing subkey");

    assert_eq!(
        encryption.key_id(),
        key.secret_subkeys[0].key.key_id(),
        "the ecdh subkey handles encryption"
    );
    assert_eq!(
        signing.key_id(),
        key.secret_subkeys[1].key.key_id(),
        "the signing subkey takes precedence over the primary"
    );

    // revoke the second user id; only the first remains valid
    let revoked_id = key.details.users[1].id.clone();
    let mut config = SignatureConfig::v4(
        SignatureType::CertRevocation,
        key.primary_key.algorithm(),
        HashAlgorithm::Sha256,
    );
    config.hashed_subpackets = vec![
        Subpacket::critical(SubpacketData::SignatureCreationTime(
            now + chrono::Duration::seconds(10),
        )),
        Subpacket::regular(SubpacketData::Issuer(key.primary_key.key_id())),
    ];
    let revocation = config
        .sign_certification(
            &mut rng,
            &key.primary_key,
            "",
            &key.primary_key,
            Tag::UserId,
            &revoked_id,
        )
        .unwrap();

    let mut key = key;
    key.details.users[1].signatures.push(revocation);

    let later = now + chrono::Duration::seconds(60);
    let valid: Vec<_> = key
        .valid_users(later)
        .iter()
        .map(|user| user.id.clone())
        .collect();
    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].id(), &b"Main <main@example.org>"[..]);
}

#[test]
fn merge_unions_subkeys_and_signatures() {
    let mut rng = ChaCha8Rng::seed_from_u64(103);

    let full = KeyBuilder::new(KeyType::EdDsaLegacy, "Merge <merge@example.org>")
        .subkey(SubkeyBuilder::encryption(KeyType::Ecdh(EccCurve::Curve25519)))
        .build(&mut rng)
        .unwrap();

    // a stripped copy without the subkey
    let mut stripped = full.clone();
    stripped.secret_subkeys.clear();

    stripped.merge(full.clone()).unwrap();
    assert_eq!(stripped, full);

    // merging again is a no-op
    stripped.merge(full.clone()).unwrap();
    assert_eq!(stripped, full);

    // different keys refuse to merge
    let other = KeyBuilder::new(KeyType::EdDsaLegacy, "Other <other@example.org>")
        .build(&mut rng)
        .unwrap();
    assert!(stripped.merge(other).is_err());
}

#[test]
fn transferable_key_packet_sequence() {
    // RFC 4880 section 11.1: primary, user ids with certs, subkeys with
    // bindings, in order
    let mut rng = ChaCha8Rng::seed_from_u64(104);
    let key = KeyBuilder::new(KeyType::EdDsaLegacy, "Seq <seq@example.org>")
        .subkey(SubkeyBuilder::encryption(KeyType::Ecdh(EccCurve::Curve25519)))
        .build(&mut rng)
        .unwrap();

    let bytes = key.to_bytes().unwrap();
    let tags: Vec<Tag> = PacketParser::new(&bytes[..])
        .map(|p| p.unwrap().tag())
        .collect();

    assert_eq!(
        tags,
        vec![
            Tag::SecretKey,
            Tag::UserId,
            Tag::Signature,
            Tag::SecretSubkey,
            Tag::Signature,
        ]
    );

    let keys = parse_secret_keys(PacketParser::new(&bytes[..]).collect::<Result<Vec<_>, _>>().unwrap()).unwrap();
    assert_eq!(keys.len(), 1);
}
