use std::fmt;

use crate::errors::Result;
use crate::types::{KeyId, KeyVersion};

/// A key fingerprint, tagged with the key version that produced it.
///
/// V2/V3 fingerprints are MD5 over the public material, V4 is SHA-1 over the
/// `0x99 ‖ len16 ‖ body` framing, V5 is SHA-256.
#[derive(Clone, Eq, Hash, PartialEq)]
pub enum Fingerprint {
    V2([u8; 16]),
    V3([u8; 16]),
    V4([u8; 20]),
    V5([u8; 32]),
}

impl Fingerprint {
    /// Tags `fp` with `version`; the length must match the version.
    pub fn new(version: KeyVersion, fp: &[u8]) -> Result<Self> {
        let fingerprint = match version {
            KeyVersion::V2 => Fingerprint::V2(
                fp.try_into()
                    .map_err(|_| format_err!("invalid v2 fingerprint length {}", fp.len()))?,
            ),
            KeyVersion::V3 => Fingerprint::V3(
                fp.try_into()
                    .map_err(|_| format_err!("invalid v3 fingerprint length {}", fp.len()))?,
            ),
            KeyVersion::V4 => Fingerprint::V4(
                fp.try_into()
                    .map_err(|_| format_err!("invalid v4 fingerprint length {}", fp.len()))?,
            ),
            KeyVersion::V5 => Fingerprint::V5(
                fp.try_into()
                    .map_err(|_| format_err!("invalid v5 fingerprint length {}", fp.len()))?,
            ),
            KeyVersion::Other(v) => bail!("unsupported key version {}", v),
        };

        Ok(fingerprint)
    }

    pub fn version(&self) -> KeyVersion {
        match self {
            Self::V2(_) => KeyVersion::V2,
            Self::V3(_) => KeyVersion::V3,
            Self::V4(_) => KeyVersion::V4,
            Self::V5(_) => KeyVersion::V5,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::V2(fp) | Self::V3(fp) => fp,
            Self::V4(fp) => fp,
            Self::V5(fp) => fp,
        }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// The Key ID: low 64 bits of the fingerprint for V4/V5.
    ///
    /// V2/V3 RSA key ids are the low 64 bits of the modulus and can not be
    /// derived from the fingerprint; those are computed in the key packet.
    pub fn key_id(&self) -> Option<KeyId> {
        match self {
            Self::V4(fp) => {
                let mut id = [0u8; 8];
                id.copy_from_slice(&fp[12..]);
                Some(id.into())
            }
            Self::V5(fp) => {
                let mut id = [0u8; 8];
                id.copy_from_slice(&fp[..8]);
                Some(id.into())
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(self.as_bytes()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}
