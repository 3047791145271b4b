pub mod key;
pub mod message;

pub use self::key::{
    KeyBuilder, KeyRejection, KeySelection, KeyType, SignedPublicKey, SignedPublicSubKey,
    SignedSecretKey, SignedSecretSubKey, SignedUser, SubkeyBuilder,
};
pub use self::message::{Edata, Esk, Message, SessionKey};
