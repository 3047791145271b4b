mod public;
mod secret;

pub use self::public::{PubKeyInner, PublicKey, PublicSubkey};
pub use self::secret::{SecretKey, SecretSubkey};

use chrono::{DateTime, Utc};
use rand::{CryptoRng, Rng};

use crate::crypto::hash::{HashAlgorithm, Hasher};
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::packet::public_key_encrypted_session_key::EskValues;
use crate::types::{Fingerprint, KeyId, KeyVersion, Mpi, PublicParams};

/// Read access to the public half of a key packet.
pub trait PublicKeyTrait {
    fn version(&self) -> KeyVersion;
    fn algorithm(&self) -> PublicKeyAlgorithm;
    fn created_at(&self) -> &DateTime<Utc>;
    fn public_params(&self) -> &PublicParams;
    fn fingerprint(&self) -> Fingerprint;
    fn key_id(&self) -> KeyId;

    /// Feeds the key into a hash context the way signatures require:
    /// `0x99 ‖ len16 ‖ body`.
    fn hash_public_key(&self, hasher: &mut dyn Hasher) -> Result<()>;

    /// Verifies a raw signature over `hashed` made by this key.
    fn verify_signature(&self, hash: HashAlgorithm, hashed: &[u8], sig: &[Mpi]) -> Result<()>;

    /// Encrypts a session key payload to this key.
    fn encrypt_session_key<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        plain: &[u8],
    ) -> Result<EskValues>;

    fn is_signing_key(&self) -> bool {
        self.algorithm().is_signing()
    }

    fn is_encryption_key(&self) -> bool {
        self.algorithm().is_encryption()
    }
}

/// Operations requiring the secret half of a key packet.
pub trait SecretKeyTrait: PublicKeyTrait {
    /// Creates a raw signature over the digest `hashed`.
    fn create_signature<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        passphrase: &str,
        hash: HashAlgorithm,
        hashed: &[u8],
    ) -> Result<Vec<Mpi>>;

    /// Decrypts a PKESK payload addressed to this key. The returned bytes
    /// still carry the algorithm prefix and checksum.
    fn decrypt_session_key<R: CryptoRng + Rng>(
        &self,
        rng: &mut R,
        passphrase: &str,
        values: &EskValues,
    ) -> Result<Vec<u8>>;
}
