use std::fmt;

use crate::errors::Result;

/// Represents a Key ID: the low 64 bits of the fingerprint.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct KeyId([u8; 8]);

impl KeyId {
    /// Key ID consisting only of zeros, used by anonymous recipient PKESKs.
    pub const WILDCARD: KeyId = KeyId([0u8; 8]);

    pub fn from_slice(input: &[u8]) -> Result<KeyId> {
        ensure_eq!(input.len(), 8, "invalid key id length");
        let mut r = [0u8; 8];
        r.copy_from_slice(input);

        Ok(KeyId(r))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// True for the all-zero wildcard id.
    pub fn is_wildcard(&self) -> bool {
        self.0 == [0u8; 8]
    }
}

impl From<[u8; 8]> for KeyId {
    fn from(value: [u8; 8]) -> Self {
        KeyId(value)
    }
}

impl AsRef<[u8]> for KeyId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", hex::encode(self.as_ref()))
    }
}

impl fmt::LowerHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_ref()))
    }
}

impl fmt::UpperHex for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoded = hex::encode(self.as_ref());
        encoded.make_ascii_uppercase();
        write!(f, "{encoded}")
    }
}
