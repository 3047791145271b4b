use std::io::{self, BufRead, Read};

use aes::{Aes128, Aes192, Aes256};
use blowfish::Blowfish;
use cast5::Cast5;
use cfb_mode::{BufDecryptor, Decryptor as CfbDecryptor, Encryptor as CfbEncryptor};
use cipher::{AsyncStreamCipher, BlockCipher, BlockEncryptMut, BlockSizeUser, KeyInit, KeyIvInit};
use des::TdesEde3;
use num_enum::{FromPrimitive, IntoPrimitive};
use rand::{CryptoRng, Rng};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use twofish::Twofish;

use crate::errors::{Result, StreamMdcError};
use crate::util::fill_buffer;

/// Packet header plus SHA-1 of the trailing Modification Detection Code
/// packet.
const MDC_LEN: usize = 22;

/// How much ciphertext the streaming decryptors pull per refill.
const BUFFER_SIZE: usize = 1024 * 8;

/// Available symmetric key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.2>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SymmetricKeyAlgorithm {
    /// Plaintext or unencrypted data
    Plaintext = 0,
    /// Declared by the RFC, not implemented here.
    Idea = 1,
    /// TripleDES (DES-EDE, 168 bit key derived from 192)
    TripleDes = 2,
    /// CAST5 (128 bit key, as per RFC 2144)
    Cast5 = 3,
    /// Blowfish (128 bit key, 16 rounds)
    Blowfish = 4,
    Aes128 = 7,
    Aes192 = 8,
    Aes256 = 9,
    /// Twofish with 256-bit key
    Twofish = 10,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for SymmetricKeyAlgorithm {
    fn default() -> Self {
        Self::Aes256
    }
}

impl SymmetricKeyAlgorithm {
    /// The size of a single block in bytes.
    pub fn block_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::Idea => 8,
            SymmetricKeyAlgorithm::TripleDes => 8,
            SymmetricKeyAlgorithm::Cast5 => 8,
            SymmetricKeyAlgorithm::Blowfish => 8,
            SymmetricKeyAlgorithm::Aes128 => 16,
            SymmetricKeyAlgorithm::Aes192 => 16,
            SymmetricKeyAlgorithm::Aes256 => 16,
            SymmetricKeyAlgorithm::Twofish => 16,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// The size of the key in bytes.
    pub fn key_size(self) -> usize {
        match self {
            SymmetricKeyAlgorithm::Plaintext => 0,
            SymmetricKeyAlgorithm::Idea => 16,
            SymmetricKeyAlgorithm::TripleDes => 24,
            SymmetricKeyAlgorithm::Cast5 => 16,
            SymmetricKeyAlgorithm::Blowfish => 16,
            SymmetricKeyAlgorithm::Aes128 => 16,
            SymmetricKeyAlgorithm::Aes192 => 24,
            SymmetricKeyAlgorithm::Aes256 => 32,
            SymmetricKeyAlgorithm::Twofish => 32,
            SymmetricKeyAlgorithm::Other(_) => 0,
        }
    }

    /// Generates the random `blocksize + 2` byte prefix whose last two bytes
    /// repeat bytes `bs-2` and `bs-1`, the classic quick check.
    pub fn generate_prefix<R: CryptoRng + Rng>(self, rng: &mut R) -> Vec<u8> {
        let bs = self.block_size();
        if bs == 0 {
            // not a block cipher, the encrypt call will reject it
            return Vec::new();
        }
        let mut prefix = vec![0u8; bs + 2];
        rng.fill_bytes(&mut prefix[..bs]);
        prefix[bs] = prefix[bs - 2];
        prefix[bs + 1] = prefix[bs - 1];
        prefix
    }

    /// Encrypts `buf` in place with the OpenPGP CFB construction.
    ///
    /// `buf` must already start with a prefix from [`Self::generate_prefix`].
    /// With `resync` the shift register is resynchronized after the prefix
    /// (non-MDC packets); without it this is plain CFB over the whole buffer
    /// with a zero IV (SEIPD packets).
    pub fn encrypt_in_place(self, key: &[u8], buf: &mut [u8], resync: bool) -> Result<()> {
        match self {
            SymmetricKeyAlgorithm::TripleDes => cfb_encrypt::<TdesEde3>(key, buf, resync),
            SymmetricKeyAlgorithm::Cast5 => cfb_encrypt::<Cast5>(key, buf, resync),
            SymmetricKeyAlgorithm::Blowfish => cfb_encrypt::<Blowfish>(key, buf, resync),
            SymmetricKeyAlgorithm::Aes128 => cfb_encrypt::<Aes128>(key, buf, resync),
            SymmetricKeyAlgorithm::Aes192 => cfb_encrypt::<Aes192>(key, buf, resync),
            SymmetricKeyAlgorithm::Aes256 => cfb_encrypt::<Aes256>(key, buf, resync),
            SymmetricKeyAlgorithm::Twofish => cfb_encrypt::<Twofish>(key, buf, resync),
            _ => unsupported_err!("symmetric algorithm {:?}", self),
        }
    }

    /// Decrypts `buf` in place and returns the payload after the prefix.
    ///
    /// The repeated prefix bytes are deliberately NOT compared: acting on
    /// them creates a decryption oracle on the session key (the quick check
    /// oracle of Mister/Zuccherato). Integrity comes from the MDC or AEAD
    /// tag downstream; `resync` must mirror the flag used during encryption.
    pub fn decrypt_in_place<'a>(
        self,
        key: &[u8],
        buf: &'a mut [u8],
        resync: bool,
    ) -> Result<&'a [u8]> {
        let bs = self.block_size();
        ensure!(buf.len() >= bs + 2, "ciphertext shorter than the prefix");

        match self {
            SymmetricKeyAlgorithm::TripleDes => cfb_decrypt::<TdesEde3>(key, buf, resync)?,
            SymmetricKeyAlgorithm::Cast5 => cfb_decrypt::<Cast5>(key, buf, resync)?,
            SymmetricKeyAlgorithm::Blowfish => cfb_decrypt::<Blowfish>(key, buf, resync)?,
            SymmetricKeyAlgorithm::Aes128 => cfb_decrypt::<Aes128>(key, buf, resync)?,
            SymmetricKeyAlgorithm::Aes192 => cfb_decrypt::<Aes192>(key, buf, resync)?,
            SymmetricKeyAlgorithm::Aes256 => cfb_decrypt::<Aes256>(key, buf, resync)?,
            SymmetricKeyAlgorithm::Twofish => cfb_decrypt::<Twofish>(key, buf, resync)?,
            _ => unsupported_err!("symmetric algorithm {:?}", self),
        }

        Ok(&buf[bs + 2..])
    }

    /// Builds a pull-based decryptor over a ciphertext stream.
    ///
    /// With `mdc` the stream is treated as an SEIPD body: no resync, the
    /// trailing 22 bytes are withheld until the end of the stream and the
    /// SHA-1 is validated in constant time before the final read returns.
    /// Without `mdc` this is the legacy construction with resync and no
    /// integrity at all.
    pub fn stream_decryptor<R: BufRead>(
        self,
        key: &[u8],
        mdc: bool,
        source: R,
    ) -> Result<StreamDecryptor<R>> {
        match self {
            SymmetricKeyAlgorithm::TripleDes => Ok(StreamDecryptor::TripleDes(
                StreamDecryptorInner::new(key, mdc, source)?,
            )),
            SymmetricKeyAlgorithm::Cast5 => Ok(StreamDecryptor::Cast5(
                StreamDecryptorInner::new(key, mdc, source)?,
            )),
            SymmetricKeyAlgorithm::Blowfish => Ok(StreamDecryptor::Blowfish(
                StreamDecryptorInner::new(key, mdc, source)?,
            )),
            SymmetricKeyAlgorithm::Aes128 => Ok(StreamDecryptor::Aes128(
                StreamDecryptorInner::new(key, mdc, source)?,
            )),
            SymmetricKeyAlgorithm::Aes192 => Ok(StreamDecryptor::Aes192(
                StreamDecryptorInner::new(key, mdc, source)?,
            )),
            SymmetricKeyAlgorithm::Aes256 => Ok(StreamDecryptor::Aes256(
                StreamDecryptorInner::new(key, mdc, source)?,
            )),
            SymmetricKeyAlgorithm::Twofish => Ok(StreamDecryptor::Twofish(
                StreamDecryptorInner::new(key, mdc, source)?,
            )),
            _ => unsupported_err!("symmetric algorithm {:?}", self),
        }
    }

    /// Plain CFB decryption with a caller supplied IV, as used for encrypted
    /// secret key material.
    pub fn decrypt_with_iv_regular(self, key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
        match self {
            SymmetricKeyAlgorithm::TripleDes => cfb_regular::<TdesEde3>(key, iv, buf, false),
            SymmetricKeyAlgorithm::Cast5 => cfb_regular::<Cast5>(key, iv, buf, false),
            SymmetricKeyAlgorithm::Blowfish => cfb_regular::<Blowfish>(key, iv, buf, false),
            SymmetricKeyAlgorithm::Aes128 => cfb_regular::<Aes128>(key, iv, buf, false),
            SymmetricKeyAlgorithm::Aes192 => cfb_regular::<Aes192>(key, iv, buf, false),
            SymmetricKeyAlgorithm::Aes256 => cfb_regular::<Aes256>(key, iv, buf, false),
            SymmetricKeyAlgorithm::Twofish => cfb_regular::<Twofish>(key, iv, buf, false),
            _ => unsupported_err!("symmetric algorithm {:?}", self),
        }
    }

    /// Plain CFB encryption with a caller supplied IV.
    pub fn encrypt_with_iv_regular(self, key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
        match self {
            SymmetricKeyAlgorithm::TripleDes => cfb_regular::<TdesEde3>(key, iv, buf, true),
            SymmetricKeyAlgorithm::Cast5 => cfb_regular::<Cast5>(key, iv, buf, true),
            SymmetricKeyAlgorithm::Blowfish => cfb_regular::<Blowfish>(key, iv, buf, true),
            SymmetricKeyAlgorithm::Aes128 => cfb_regular::<Aes128>(key, iv, buf, true),
            SymmetricKeyAlgorithm::Aes192 => cfb_regular::<Aes192>(key, iv, buf, true),
            SymmetricKeyAlgorithm::Aes256 => cfb_regular::<Aes256>(key, iv, buf, true),
            SymmetricKeyAlgorithm::Twofish => cfb_regular::<Twofish>(key, iv, buf, true),
            _ => unsupported_err!("symmetric algorithm {:?}", self),
        }
    }
}

/// OpenPGP CFB encryption over `buf = prefix ‖ data`, zero IV.
fn cfb_encrypt<C>(key: &[u8], buf: &mut [u8], resync: bool) -> Result<()>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
{
    let bs = C::block_size();
    let iv = vec![0u8; bs];

    if resync {
        ensure!(buf.len() >= bs + 2, "missing prefix");
        let (prefix, data) = buf.split_at_mut(bs + 2);
        CfbEncryptor::<C>::new_from_slices(key, &iv)?.encrypt(prefix);
        // resync: the shift register restarts on the last bs octets of the
        // encrypted prefix
        let iv2 = prefix[2..].to_vec();
        CfbEncryptor::<C>::new_from_slices(key, &iv2)?.encrypt(data);
    } else {
        CfbEncryptor::<C>::new_from_slices(key, &iv)?.encrypt(buf);
    }

    Ok(())
}

/// OpenPGP CFB decryption over `buf = prefix ‖ data`, zero IV.
fn cfb_decrypt<C>(key: &[u8], buf: &mut [u8], resync: bool) -> Result<()>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
{
    let bs = C::block_size();
    let iv = vec![0u8; bs];

    if resync {
        ensure!(buf.len() >= bs + 2, "missing prefix");
        // the resync IV is ciphertext, grab it before decrypting in place
        let iv2 = buf[2..bs + 2].to_vec();
        let (prefix, data) = buf.split_at_mut(bs + 2);
        CfbDecryptor::<C>::new_from_slices(key, &iv)?.decrypt(prefix);
        CfbDecryptor::<C>::new_from_slices(key, &iv2)?.decrypt(data);
    } else {
        CfbDecryptor::<C>::new_from_slices(key, &iv)?.decrypt(buf);
    }

    Ok(())
}

fn cfb_regular<C>(key: &[u8], iv: &[u8], buf: &mut [u8], encrypt: bool) -> Result<()>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
{
    if encrypt {
        CfbEncryptor::<C>::new_from_slices(key, iv)?.encrypt(buf);
    } else {
        CfbDecryptor::<C>::new_from_slices(key, iv)?.decrypt(buf);
    }
    Ok(())
}

/// Pull-based OpenPGP CFB decryption over a byte stream.
///
/// One variant per cipher, so the caller dispatches once by algorithm id and
/// then drives a plain [`BufRead`].
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum StreamDecryptor<R: BufRead> {
    TripleDes(StreamDecryptorInner<TdesEde3, R>),
    Cast5(StreamDecryptorInner<Cast5, R>),
    Blowfish(StreamDecryptorInner<Blowfish, R>),
    Aes128(StreamDecryptorInner<Aes128, R>),
    Aes192(StreamDecryptorInner<Aes192, R>),
    Aes256(StreamDecryptorInner<Aes256, R>),
    Twofish(StreamDecryptorInner<Twofish, R>),
}

impl<R: BufRead> Read for StreamDecryptor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::TripleDes(i) => i.read(buf),
            Self::Cast5(i) => i.read(buf),
            Self::Blowfish(i) => i.read(buf),
            Self::Aes128(i) => i.read(buf),
            Self::Aes192(i) => i.read(buf),
            Self::Aes256(i) => i.read(buf),
            Self::Twofish(i) => i.read(buf),
        }
    }
}

impl<R: BufRead> BufRead for StreamDecryptor<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Self::TripleDes(i) => i.fill_buf(),
            Self::Cast5(i) => i.fill_buf(),
            Self::Blowfish(i) => i.fill_buf(),
            Self::Aes128(i) => i.fill_buf(),
            Self::Aes192(i) => i.fill_buf(),
            Self::Aes256(i) => i.fill_buf(),
            Self::Twofish(i) => i.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Self::TripleDes(i) => i.consume(amt),
            Self::Cast5(i) => i.consume(amt),
            Self::Blowfish(i) => i.consume(amt),
            Self::Aes128(i) => i.consume(amt),
            Self::Aes192(i) => i.consume(amt),
            Self::Aes256(i) => i.consume(amt),
            Self::Twofish(i) => i.consume(amt),
        }
    }
}

/// The cipher specific half of [`StreamDecryptor`].
///
/// The random prefix is consumed and dropped up front (again without the
/// quick check). In MDC mode the last 22 decrypted bytes are never released
/// to the reader; once the source is exhausted they are checked in constant
/// time and a mismatch surfaces as an io error carrying
/// [`StreamMdcError`].
pub struct StreamDecryptorInner<C, R>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
    R: BufRead,
{
    decryptor: BufDecryptor<C>,
    source: R,
    mdc: bool,
    hasher: Sha1,
    holdback: Vec<u8>,
    buffer: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<C, R> std::fmt::Debug for StreamDecryptorInner<C, R>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
    R: BufRead,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecryptorInner")
            .field("mdc", &self.mdc)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<C, R> StreamDecryptorInner<C, R>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
    R: BufRead,
{
    fn new(key: &[u8], mdc: bool, mut source: R) -> Result<Self> {
        let bs = C::block_size();
        let iv = vec![0u8; bs];
        let mut decryptor = BufDecryptor::<C>::new_from_slices(key, &iv)?;

        let mut prefix = vec![0u8; bs + 2];
        let read = fill_buffer(&mut source, &mut prefix, None)?;
        ensure!(read == bs + 2, "missing random prefix");

        // the resync IV is ciphertext, keep it before decrypting
        let resync_iv = prefix[2..].to_vec();
        decryptor.decrypt(&mut prefix);

        let mut hasher = Sha1::new();
        if mdc {
            hasher.update(&prefix);
        } else {
            decryptor = BufDecryptor::<C>::new_from_slices(key, &resync_iv)?;
        }

        Ok(StreamDecryptorInner {
            decryptor,
            source,
            mdc,
            hasher,
            holdback: Vec::new(),
            buffer: Vec::new(),
            pos: 0,
            done: false,
        })
    }

    fn validate_mdc(&mut self) -> io::Result<()> {
        if self.holdback.len() != MDC_LEN {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated mdc trailer",
            ));
        }

        let mut hasher = self.hasher.clone();
        hasher.update(&self.holdback[..2]);
        let expected = hasher.finalize();

        let header_ok = self.holdback[..2].ct_eq(&[0xD3, 0x14]);
        let hash_ok = self.holdback[2..].ct_eq(&expected);
        if !bool::from(header_ok & hash_ok) {
            return Err(io::Error::new(io::ErrorKind::InvalidData, StreamMdcError));
        }

        Ok(())
    }

    fn refill(&mut self) -> io::Result<()> {
        if self.pos < self.buffer.len() || self.done {
            return Ok(());
        }

        self.buffer.resize(BUFFER_SIZE, 0);
        self.pos = 0;
        let read = fill_buffer(&mut self.source, &mut self.buffer, None)?;
        self.buffer.truncate(read);

        if read == 0 {
            self.done = true;
            if self.mdc {
                self.validate_mdc()?;
            }
            return Ok(());
        }

        self.decryptor.decrypt(&mut self.buffer);

        if self.mdc {
            // withhold the trailing mdc bytes until the stream ends
            self.holdback.append(&mut self.buffer);
            if self.holdback.len() > MDC_LEN {
                let release = self.holdback.len() - MDC_LEN;
                self.hasher.update(&self.holdback[..release]);
                self.buffer.extend(self.holdback.drain(..release));
            }
        }

        Ok(())
    }

    fn fill_inner(&mut self) -> io::Result<()> {
        while self.pos >= self.buffer.len() && !self.done {
            self.refill()?;
        }
        Ok(())
    }
}

impl<C, R> Read for StreamDecryptorInner<C, R>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
    R: BufRead,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill_inner()?;
        let available = &self.buffer[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl<C, R> BufRead for StreamDecryptorInner<C, R>
where
    C: BlockCipher + BlockEncryptMut + BlockSizeUser + KeyInit,
    R: BufRead,
{
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.fill_inner()?;
        Ok(&self.buffer[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos += amt;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    macro_rules! roundtrip {
        ($name:ident, $alg:path) => {
            #[test]
            fn $name() {
                let mut rng = ChaCha8Rng::seed_from_u64(8);
                let data = vec![2u8; 256];
                let key = vec![1u8; $alg.key_size()];

                for resync in [true, false] {
                    let mut buf = $alg.generate_prefix(&mut rng);
                    buf.extend_from_slice(&data);
                    $alg.encrypt_in_place(&key, &mut buf, resync).unwrap();
                    assert_ne!(&buf[$alg.block_size() + 2..], &data[..]);

                    let plain = $alg.decrypt_in_place(&key, &mut buf, resync).unwrap();
                    assert_eq!(plain, &data[..]);
                }
            }
        };
    }

    roundtrip!(roundtrip_aes128, SymmetricKeyAlgorithm::Aes128);
    roundtrip!(roundtrip_aes192, SymmetricKeyAlgorithm::Aes192);
    roundtrip!(roundtrip_aes256, SymmetricKeyAlgorithm::Aes256);
    roundtrip!(roundtrip_tripledes, SymmetricKeyAlgorithm::TripleDes);
    roundtrip!(roundtrip_cast5, SymmetricKeyAlgorithm::Cast5);
    roundtrip!(roundtrip_blowfish, SymmetricKeyAlgorithm::Blowfish);
    roundtrip!(roundtrip_twofish, SymmetricKeyAlgorithm::Twofish);

    #[test]
    fn resync_changes_ciphertext() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let alg = SymmetricKeyAlgorithm::Aes256;
        let key = vec![7u8; alg.key_size()];
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();

        let prefix = alg.generate_prefix(&mut rng);

        let mut with_resync = prefix.clone();
        with_resync.extend_from_slice(&data);
        alg.encrypt_in_place(&key, &mut with_resync, true).unwrap();

        let mut without_resync = prefix;
        without_resync.extend_from_slice(&data);
        alg.encrypt_in_place(&key, &mut without_resync, false)
            .unwrap();

        // identical prefix, diverging body
        let bs = alg.block_size();
        assert_eq!(with_resync[..bs + 2], without_resync[..bs + 2]);
        assert_ne!(with_resync[bs + 2..], without_resync[bs + 2..]);
    }

    #[test]
    fn wrong_key_is_not_detected_by_cfb_itself() {
        // the repeated prefix bytes must not act as a key oracle; a wrong
        // key decrypts to garbage and only the MDC/AEAD layer may reject it
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let alg = SymmetricKeyAlgorithm::Aes128;
        let key = vec![3u8; alg.key_size()];

        let mut buf = alg.generate_prefix(&mut rng);
        buf.extend_from_slice(b"payload");
        alg.encrypt_in_place(&key, &mut buf, false).unwrap();

        let wrong_key = vec![4u8; alg.key_size()];
        let garbage = alg
            .decrypt_in_place(&wrong_key, &mut buf, false)
            .unwrap()
            .to_vec();
        assert_ne!(garbage, b"payload");
    }

    #[test]
    fn stream_decryptor_matches_in_place() {
        use std::io::Read;

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let alg = SymmetricKeyAlgorithm::Aes256;
        let key = vec![6u8; alg.key_size()];
        let data = vec![0x3Cu8; 3 * super::BUFFER_SIZE + 17];

        // legacy (resync) construction
        let mut buf = alg.generate_prefix(&mut rng);
        buf.extend_from_slice(&data);
        alg.encrypt_in_place(&key, &mut buf, true).unwrap();

        let mut reader = alg.stream_decryptor(&key, false, &buf[..]).unwrap();
        let mut streamed = Vec::new();
        reader.read_to_end(&mut streamed).unwrap();

        let plain = alg.decrypt_in_place(&key, &mut buf, true).unwrap();
        assert_eq!(streamed, plain);
    }

    #[test]
    fn regular_cfb_roundtrip() {
        let alg = SymmetricKeyAlgorithm::Aes256;
        let key = vec![9u8; alg.key_size()];
        let iv = vec![5u8; alg.block_size()];
        let data = b"secret key material".to_vec();

        let mut buf = data.clone();
        alg.encrypt_with_iv_regular(&key, &iv, &mut buf).unwrap();
        assert_ne!(buf, data);
        alg.decrypt_with_iv_regular(&key, &iv, &mut buf).unwrap();
        assert_eq!(buf, data);
    }
}
