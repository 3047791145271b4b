use std::io::{self, BufRead, Read};

use aead::consts::{U12, U15};
use aead::{Aead, KeyInit, Payload};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::AesGcm;
use eax::Eax;
use num_enum::{FromPrimitive, IntoPrimitive};
use ocb3::Ocb3;
use zeroize::Zeroizing;

use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::{AeadTagMismatchSnafu, Error, Result, StreamAeadTagError};
use crate::util::fill_buffer;

/// Available AEAD algorithms.
///
/// The id 100 is a private-use allocation for AES-GCM; its use is gated
/// behind [`Config::allow_experimental_gcm`](crate::Config).
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AeadAlgorithm {
    None = 0,
    Eax = 1,
    Ocb = 2,
    ExperimentalGcm = 100,

    #[num_enum(catch_all)]
    Other(u8),
}

impl Default for AeadAlgorithm {
    fn default() -> Self {
        Self::Eax
    }
}

type EaxAes128 = Eax<Aes128>;
type EaxAes192 = Eax<Aes192>;
type EaxAes256 = Eax<Aes256>;
type OcbAes128 = Ocb3<Aes128, U15>;
type OcbAes192 = Ocb3<Aes192, U15>;
type OcbAes256 = Ocb3<Aes256, U15>;
type GcmAes128 = AesGcm<Aes128, U12>;
type GcmAes192 = AesGcm<Aes192, U12>;
type GcmAes256 = AesGcm<Aes256, U12>;

impl AeadAlgorithm {
    /// Base IV length in bytes.
    pub fn iv_size(self) -> Option<usize> {
        match self {
            AeadAlgorithm::Eax => Some(16),
            AeadAlgorithm::Ocb => Some(15),
            AeadAlgorithm::ExperimentalGcm => Some(12),
            _ => None,
        }
    }

    /// Authentication tag length in bytes.
    pub fn tag_size(self) -> Option<usize> {
        match self {
            AeadAlgorithm::Eax | AeadAlgorithm::Ocb | AeadAlgorithm::ExperimentalGcm => Some(16),
            _ => None,
        }
    }

    /// Single-shot AEAD encryption of one chunk, tag appended.
    pub fn encrypt_one(
        self,
        sym: SymmetricKeyAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        msg: &[u8],
    ) -> Result<Vec<u8>> {
        self.crypt_one(sym, key, nonce, aad, msg, true)
    }

    /// Single-shot AEAD decryption of one chunk (`msg` includes the tag).
    pub fn decrypt_one(
        self,
        sym: SymmetricKeyAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        msg: &[u8],
    ) -> Result<Vec<u8>> {
        self.crypt_one(sym, key, nonce, aad, msg, false)
    }

    fn crypt_one(
        self,
        sym: SymmetricKeyAlgorithm,
        key: &[u8],
        nonce: &[u8],
        aad: &[u8],
        msg: &[u8],
        encrypt: bool,
    ) -> Result<Vec<u8>> {
        match (self, sym) {
            (AeadAlgorithm::Eax, SymmetricKeyAlgorithm::Aes128) => {
                crypt::<EaxAes128>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::Eax, SymmetricKeyAlgorithm::Aes192) => {
                crypt::<EaxAes192>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::Eax, SymmetricKeyAlgorithm::Aes256) => {
                crypt::<EaxAes256>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::Ocb, SymmetricKeyAlgorithm::Aes128) => {
                crypt::<OcbAes128>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::Ocb, SymmetricKeyAlgorithm::Aes192) => {
                crypt::<OcbAes192>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::Ocb, SymmetricKeyAlgorithm::Aes256) => {
                crypt::<OcbAes256>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::ExperimentalGcm, SymmetricKeyAlgorithm::Aes128) => {
                crypt::<GcmAes128>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::ExperimentalGcm, SymmetricKeyAlgorithm::Aes192) => {
                crypt::<GcmAes192>(key, nonce, aad, msg, encrypt)
            }
            (AeadAlgorithm::ExperimentalGcm, SymmetricKeyAlgorithm::Aes256) => {
                crypt::<GcmAes256>(key, nonce, aad, msg, encrypt)
            }
            _ => unsupported_err!("AEAD {:?} with cipher {:?}", self, sym),
        }
    }
}

fn crypt<A: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    msg: &[u8],
    encrypt: bool,
) -> Result<Vec<u8>> {
    let cipher = A::new_from_slice(key).map_err(|_| format_err!("invalid aead key length"))?;
    let nonce = aead::Nonce::<A>::from_slice(nonce);
    let payload = Payload { msg, aad };
    let res = if encrypt {
        cipher.encrypt(nonce, payload)?
    } else {
        cipher.decrypt(nonce, payload)?
    };
    Ok(res)
}

/// Expands the chunk size octet `c` into `2^(c + 6)` bytes.
///
/// Values above 56 are not representable and rejected.
pub fn chunk_size_expanded(c: u8) -> Result<u64> {
    ensure!(c <= 56, "invalid chunk size octet {}", c);
    Ok(1u64 << (u32::from(c) + 6))
}

/// Per-chunk nonce: the base IV with the big-endian chunk index folded into
/// its right-most eight octets.
pub fn chunk_nonce(iv: &[u8], index: u64) -> Vec<u8> {
    let mut nonce = iv.to_vec();
    let offset = nonce.len() - 8;
    for (i, byte) in index.to_be_bytes().iter().enumerate() {
        nonce[offset + i] ^= byte;
    }
    nonce
}

/// Associated data for a chunk: the packet prelude followed by the chunk
/// index; the final tag additionally authenticates the total plaintext size.
fn chunk_aad(info: &[u8; 5], index: u64) -> Vec<u8> {
    let mut aad = info.to_vec();
    aad.extend_from_slice(&index.to_be_bytes());
    aad
}

fn final_aad(info: &[u8; 5], index: u64, total: u64) -> Vec<u8> {
    let mut aad = chunk_aad(info, index);
    aad.extend_from_slice(&total.to_be_bytes());
    aad
}

/// Splits `plaintext` into chunks of `2^(chunk_size_byte + 6)` bytes and
/// encrypts each, appending the final tag over the total length.
#[allow(clippy::too_many_arguments)]
pub fn encrypt_chunked(
    sym: SymmetricKeyAlgorithm,
    aead: AeadAlgorithm,
    key: &[u8],
    info: &[u8; 5],
    iv: &[u8],
    chunk_size_byte: u8,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let chunk_size: usize = chunk_size_expanded(chunk_size_byte)?.try_into()?;
    let tag_size = aead
        .tag_size()
        .ok_or_else(|| format_err!("AEAD mode {:?} has no tag size", aead))?;

    let mut out = Vec::with_capacity(plaintext.len() + tag_size * (plaintext.len() / chunk_size + 2));
    let mut index = 0u64;

    for chunk in plaintext.chunks(chunk_size) {
        let nonce = chunk_nonce(iv, index);
        let aad = chunk_aad(info, index);
        out.extend_from_slice(&aead.encrypt_one(sym, key, &nonce, &aad, chunk)?);
        index += 1;
    }

    // final, empty chunk authenticating the plaintext length
    let nonce = chunk_nonce(iv, index);
    let aad = final_aad(info, index, plaintext.len() as u64);
    out.extend_from_slice(&aead.encrypt_one(sym, key, &nonce, &aad, &[])?);

    Ok(out)
}

/// Streaming chunked AEAD decryption, pulling ciphertext from a byte
/// stream.
///
/// Yields one plaintext chunk per iteration, each only after its tag
/// validated, so memory stays bounded by the chunk size regardless of the
/// total message length. The final (empty) chunk authenticates the total
/// plaintext length; any tag failure aborts the stream with
/// [`Error::AeadTagMismatch`](crate::errors::Error).
pub struct ChunkDecryptor<R: BufRead> {
    sym: SymmetricKeyAlgorithm,
    aead: AeadAlgorithm,
    key: Zeroizing<Vec<u8>>,
    info: [u8; 5],
    iv: Vec<u8>,
    chunk_size: usize,
    tag_size: usize,
    source: R,
    /// ciphertext pulled from the source but not yet decrypted
    carry: Vec<u8>,
    source_done: bool,
    index: u64,
    written: u64,
    done: bool,
}

impl<R: BufRead> ChunkDecryptor<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sym: SymmetricKeyAlgorithm,
        aead: AeadAlgorithm,
        key: &[u8],
        info: [u8; 5],
        iv: &[u8],
        chunk_size_byte: u8,
        source: R,
    ) -> Result<Self> {
        ensure_eq!(key.len(), sym.key_size(), "invalid session key length");
        let chunk_size: usize = chunk_size_expanded(chunk_size_byte)?.try_into()?;
        let tag_size = aead
            .tag_size()
            .ok_or_else(|| format_err!("AEAD mode {:?} has no tag size", aead))?;

        Ok(ChunkDecryptor {
            sym,
            aead,
            key: Zeroizing::new(key.to_vec()),
            info,
            iv: iv.to_vec(),
            chunk_size,
            tag_size,
            source,
            carry: Vec::new(),
            source_done: false,
            index: 0,
            written: 0,
            done: false,
        })
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Tops the carry buffer up to one full chunk plus a final-tag
    /// lookahead, so a short read can only mean the source is done.
    fn fill_carry(&mut self) -> Result<()> {
        let want = self.chunk_size + 2 * self.tag_size;
        while !self.source_done && self.carry.len() < want {
            let start = self.carry.len();
            self.carry.resize(want, 0);
            let read = fill_buffer(&mut self.source, &mut self.carry[start..], None)?;
            self.carry.truncate(start + read);
            if read == 0 {
                self.source_done = true;
            }
        }
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        self.fill_carry()?;

        ensure!(self.carry.len() >= self.tag_size, "missing final AEAD tag");

        if self.source_done && self.carry.len() == self.tag_size {
            // only the final tag is left
            let nonce = chunk_nonce(&self.iv, self.index);
            let aad = final_aad(&self.info, self.index, self.written);
            self.aead
                .decrypt_one(self.sym, &self.key, &nonce, &aad, &self.carry)
                .map_err(|_| AeadTagMismatchSnafu { index: self.index }.build())?;
            self.carry.clear();
            self.done = true;
            return Ok(None);
        }

        // everything but the final-tag lookahead belongs to this chunk
        let available = self.carry.len() - self.tag_size;
        let take = available.min(self.chunk_size + self.tag_size);
        ensure!(take > self.tag_size, "truncated AEAD chunk");
        let chunk: Vec<u8> = self.carry.drain(..take).collect();

        let nonce = chunk_nonce(&self.iv, self.index);
        let aad = chunk_aad(&self.info, self.index);
        let plain = self
            .aead
            .decrypt_one(self.sym, &self.key, &nonce, &aad, &chunk)
            .map_err(|_| AeadTagMismatchSnafu { index: self.index }.build())?;

        self.index += 1;
        self.written += plain.len() as u64;

        Ok(Some(plain))
    }
}

impl<R: BufRead> Iterator for ChunkDecryptor<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(plain)) => Some(Ok(plain)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Adapts a [`ChunkDecryptor`] into a [`BufRead`], so decrypted plaintext
/// can be pulled by a downstream packet parser. Tag failures are tunneled
/// as io errors carrying [`StreamAeadTagError`].
pub struct ChunkReader<R: BufRead> {
    inner: ChunkDecryptor<R>,
    current: Vec<u8>,
    pos: usize,
}

impl<R: BufRead> ChunkReader<R> {
    pub fn new(inner: ChunkDecryptor<R>) -> Self {
        ChunkReader {
            inner,
            current: Vec::new(),
            pos: 0,
        }
    }

    fn fill_inner(&mut self) -> io::Result<()> {
        while self.pos >= self.current.len() {
            match self.inner.next() {
                Some(Ok(chunk)) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                Some(Err(Error::AeadTagMismatch { index, .. })) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        StreamAeadTagError { index },
                    ));
                }
                Some(Err(err)) => {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, err.to_string()));
                }
                None => break,
            }
        }
        Ok(())
    }
}

impl<R: BufRead> Read for ChunkReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill_inner()?;
        let available = &self.current[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for ChunkReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.fill_inner()?;
        Ok(&self.current[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos += amt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: [u8; 5] = [0xD4, 0x01, 0x09, 0x01, 0x06];

    fn roundtrip(aead: AeadAlgorithm, sym: SymmetricKeyAlgorithm) {
        let key = vec![0x42u8; sym.key_size()];
        let iv = vec![0x17u8; aead.iv_size().unwrap()];
        let plaintext = b"Hello, World! This is longer than a single small chunk...";

        // chunk size octet 0 -> 64 byte chunks, 6 -> 4096 byte chunks
        for c in [0u8, 6] {
            let ct = encrypt_chunked(sym, aead, &key, &INFO, &iv, c, plaintext).unwrap();
            let dec =
                ChunkDecryptor::new(sym, aead, &key, INFO, &iv, c, &ct[..]).unwrap();
            let plain: Vec<u8> = dec
                .collect::<Result<Vec<_>>>()
                .unwrap()
                .concat();
            assert_eq!(plain, plaintext);
        }
    }

    #[test]
    fn test_eax_roundtrip() {
        roundtrip(AeadAlgorithm::Eax, SymmetricKeyAlgorithm::Aes128);
        roundtrip(AeadAlgorithm::Eax, SymmetricKeyAlgorithm::Aes256);
    }

    #[test]
    fn test_ocb_roundtrip() {
        roundtrip(AeadAlgorithm::Ocb, SymmetricKeyAlgorithm::Aes192);
        roundtrip(AeadAlgorithm::Ocb, SymmetricKeyAlgorithm::Aes256);
    }

    #[test]
    fn test_gcm_roundtrip() {
        roundtrip(
            AeadAlgorithm::ExperimentalGcm,
            SymmetricKeyAlgorithm::Aes256,
        );
    }

    #[test]
    fn test_chunk_nonce() {
        let iv = [0u8; 16];
        let nonce = chunk_nonce(&iv, 1);
        assert_eq!(nonce[..8], iv[..8]);
        assert_eq!(nonce[15], 1);

        let nonce = chunk_nonce(&iv, 0x0102);
        assert_eq!(nonce[14], 1);
        assert_eq!(nonce[15], 2);
    }

    #[test]
    fn test_different_chunk_sizes_decrypt_to_same() {
        let sym = SymmetricKeyAlgorithm::Aes256;
        let aead = AeadAlgorithm::Eax;
        let key = vec![1u8; sym.key_size()];
        let iv = vec![2u8; aead.iv_size().unwrap()];
        let plaintext = vec![0xAB; 500];

        let ct1 = encrypt_chunked(sym, aead, &key, &INFO, &iv, 0, &plaintext).unwrap();
        let ct2 = encrypt_chunked(sym, aead, &key, &INFO, &iv, 2, &plaintext).unwrap();
        assert_ne!(ct1, ct2);

        for (c, ct) in [(0u8, ct1), (2u8, ct2)] {
            let plain: Vec<u8> = ChunkDecryptor::new(sym, aead, &key, INFO, &iv, c, &ct[..])
                .unwrap()
                .collect::<Result<Vec<_>>>()
                .unwrap()
                .concat();
            assert_eq!(plain, plaintext);
        }
    }

    #[test]
    fn test_tampered_final_tag() {
        let sym = SymmetricKeyAlgorithm::Aes256;
        let aead = AeadAlgorithm::Eax;
        let key = vec![3u8; sym.key_size()];
        let iv = vec![4u8; aead.iv_size().unwrap()];
        let plaintext = vec![0x55; 200];

        // chunk size octet 0 -> 64 bytes, so 4 data chunks + final tag
        let mut ct = encrypt_chunked(sym, aead, &key, &INFO, &iv, 0, &plaintext).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 1;

        let mut dec = ChunkDecryptor::new(sym, aead, &key, INFO, &iv, 0, &ct[..]).unwrap();
        // all data chunks come out fine
        let mut emitted = 0;
        let err = loop {
            match dec.next() {
                Some(Ok(chunk)) => emitted += chunk.len(),
                Some(Err(err)) => break err,
                None => panic!("expected an integrity failure"),
            }
        };
        assert_eq!(emitted, plaintext.len());
        assert!(matches!(
            err,
            crate::errors::Error::AeadTagMismatch { .. }
        ));
    }

    #[test]
    fn test_tampered_chunk_stops_stream() {
        let sym = SymmetricKeyAlgorithm::Aes256;
        let aead = AeadAlgorithm::Ocb;
        let key = vec![5u8; sym.key_size()];
        let iv = vec![6u8; aead.iv_size().unwrap()];
        let plaintext = vec![0x66; 200];

        let mut ct = encrypt_chunked(sym, aead, &key, &INFO, &iv, 0, &plaintext).unwrap();
        // flip a byte in the second chunk
        ct[90] ^= 1;

        let mut dec = ChunkDecryptor::new(sym, aead, &key, INFO, &iv, 0, &ct[..]).unwrap();
        assert!(dec.next().unwrap().is_ok());
        assert!(dec.next().unwrap().is_err());
        assert!(dec.next().is_none());
    }
}
