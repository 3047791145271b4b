mod aead_encrypted_data;
mod body_reader;
mod compressed_data;
mod key;
mod literal_data;
mod many;
mod marker;
mod mod_detection_code;
mod one_pass_signature;
mod packet_sum;
mod packet_trait;
mod public_key_encrypted_session_key;
pub mod signature;
mod sym_encrypted_data;
mod sym_encrypted_protected_data;
mod sym_key_encrypted_session_key;
mod trust;
mod user_attribute;
mod user_id;

pub use self::aead_encrypted_data::AeadEncryptedData;
pub use self::body_reader::PacketBodyReader;
pub use self::compressed_data::{CompressedData, Decompressor};
pub use self::key::{
    PubKeyInner, PublicKey, PublicKeyTrait, PublicSubkey, SecretKey, SecretKeyTrait, SecretSubkey,
};
pub use self::literal_data::{DataMode, LiteralData};
pub use self::many::PacketParser;
pub use self::marker::Marker;
pub use self::mod_detection_code::ModDetectionCode;
pub use self::one_pass_signature::OnePassSignature;
pub use self::packet_sum::Packet;
pub use self::packet_trait::PacketTrait;
pub use self::public_key_encrypted_session_key::{EskValues, PublicKeyEncryptedSessionKey};
pub use self::signature::{
    KeyFlags, Signature, SignatureConfig, SignatureType, SignatureVersion, Subpacket,
    SubpacketData, SubpacketType,
};
pub use self::sym_encrypted_data::SymEncryptedData;
pub use self::sym_encrypted_protected_data::SymEncryptedProtectedData;
pub use self::sym_key_encrypted_session_key::SymKeyEncryptedSessionKey;
pub use self::trust::Trust;
pub use self::user_attribute::{UserAttribute, UserAttributeSubpacket};
pub use self::user_id::UserId;
