mod config;
mod subpacket;
mod types;

pub use self::config::SignatureConfig;
pub use self::subpacket::{
    Notation, RevocationCode, RevocationKey, Subpacket, SubpacketData, SubpacketType,
};
pub use self::types::{KeyFlags, Signature, SignatureType, SignatureVersion};
