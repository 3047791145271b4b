use std::io::{self, Cursor, Read};

use bytes::{Buf, Bytes};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;

use crate::errors::Result;
use crate::packet::PacketTrait;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::{CompressionAlgorithm, PacketHeaderVersion, Tag};

/// Compressed Data Packet. The body wraps exactly one nested packet list.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-5.6>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedData {
    packet_version: PacketHeaderVersion,
    compression_algorithm: CompressionAlgorithm,
    compressed_data: Bytes,
}

/// Reader over the decompressed body.
pub enum Decompressor<R> {
    Uncompressed(Cursor<R>),
    Zip(Box<DeflateDecoder<Cursor<R>>>),
    Zlib(Box<ZlibDecoder<Cursor<R>>>),
    Bzip2(Box<bzip2::read::BzDecoder<Cursor<R>>>),
}

impl<R: AsRef<[u8]>> Read for Decompressor<R> {
    fn read(&mut self, into: &mut [u8]) -> io::Result<usize> {
        match self {
            Decompressor::Uncompressed(c) => c.read(into),
            Decompressor::Zip(c) => c.read(into),
            Decompressor::Zlib(c) => c.read(into),
            Decompressor::Bzip2(c) => c.read(into),
        }
    }
}

impl CompressedData {
    /// Parses a `CompressedData` packet from the given buffer.
    pub fn from_buf<B: Buf>(packet_version: PacketHeaderVersion, mut i: B) -> Result<Self> {
        let alg = CompressionAlgorithm::from(i.read_u8()?);
        Ok(CompressedData {
            packet_version,
            compression_algorithm: alg,
            compressed_data: i.rest(),
        })
    }

    /// Compresses an already serialized packet list.
    pub fn from_compressible(
        alg: CompressionAlgorithm,
        level: u32,
        data: &[u8],
    ) -> Result<Self> {
        let compressed: Bytes = match alg {
            CompressionAlgorithm::Uncompressed => Bytes::copy_from_slice(data),
            CompressionAlgorithm::Zip => {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::new(level));
                io::Write::write_all(&mut enc, data)?;
                enc.finish()?.into()
            }
            CompressionAlgorithm::Zlib => {
                let mut enc = ZlibEncoder::new(Vec::new(), Compression::new(level));
                io::Write::write_all(&mut enc, data)?;
                enc.finish()?.into()
            }
            CompressionAlgorithm::Bzip2 => {
                let mut enc =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                io::Write::write_all(&mut enc, data)?;
                enc.finish()?.into()
            }
            CompressionAlgorithm::Other(id) => {
                unsupported_err!("compression algorithm {}", id)
            }
        };

        Ok(CompressedData {
            packet_version: Default::default(),
            compression_algorithm: alg,
            compressed_data: compressed,
        })
    }

    pub fn compression_algorithm(&self) -> CompressionAlgorithm {
        self.compression_algorithm
    }

    pub fn compressed_data(&self) -> &[u8] {
        &self.compressed_data
    }

    /// Returns a reader over the decompressed content.
    pub fn decompress(&self) -> Result<Decompressor<Bytes>> {
        let cursor = Cursor::new(self.compressed_data.clone());
        match self.compression_algorithm {
            CompressionAlgorithm::Uncompressed => Ok(Decompressor::Uncompressed(cursor)),
            CompressionAlgorithm::Zip => Ok(Decompressor::Zip(Box::new(DeflateDecoder::new(
                cursor,
            )))),
            CompressionAlgorithm::Zlib => {
                Ok(Decompressor::Zlib(Box::new(ZlibDecoder::new(cursor))))
            }
            CompressionAlgorithm::Bzip2 => Ok(Decompressor::Bzip2(Box::new(
                bzip2::read::BzDecoder::new(cursor),
            ))),
            CompressionAlgorithm::Other(id) => {
                unsupported_err!("compression algorithm {}", id)
            }
        }
    }
}

impl Serialize for CompressedData {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.compression_algorithm.into()])?;
        writer.write_all(&self.compressed_data)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        1 + self.compressed_data.len()
    }
}

impl PacketTrait for CompressedData {
    fn packet_version(&self) -> PacketHeaderVersion {
        self.packet_version
    }

    fn tag(&self) -> Tag {
        Tag::CompressedData
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(alg: CompressionAlgorithm) {
        let data = b"hello compression, hello compression, hello compression";
        let packet = CompressedData::from_compressible(alg, 6, data).unwrap();

        let mut out = Vec::new();
        packet.decompress().unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_uncompressed() {
        roundtrip(CompressionAlgorithm::Uncompressed);
    }

    #[test]
    fn test_zip() {
        roundtrip(CompressionAlgorithm::Zip);
    }

    #[test]
    fn test_zlib() {
        roundtrip(CompressionAlgorithm::Zlib);
    }

    #[test]
    fn test_bzip2() {
        roundtrip(CompressionAlgorithm::Bzip2);
    }
}
