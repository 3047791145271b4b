use std::io;

use bytes::{Buf, Bytes};

use crate::crypto::ecc_curve::{ecc_curve_from_oid, EccCurve};
use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::crypto::sym::SymmetricKeyAlgorithm;
use crate::errors::Result;
use crate::parsing::BufParsing;
use crate::ser::Serialize;
use crate::types::Mpi;

/// Algorithm specific public key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicParams {
    Rsa {
        n: Mpi,
        e: Mpi,
    },
    Dsa {
        p: Mpi,
        q: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Elgamal {
        p: Mpi,
        g: Mpi,
        y: Mpi,
    },
    Ecdsa {
        curve: EccCurve,
        p: Mpi,
    },
    EddsaLegacy {
        curve: EccCurve,
        q: Mpi,
    },
    Ecdh {
        curve: EccCurve,
        p: Mpi,
        hash: HashAlgorithm,
        alg_sym: SymmetricKeyAlgorithm,
    },
    /// Material of an algorithm we do not know; kept verbatim so the packet
    /// re-encodes bit exactly.
    Unknown {
        alg: u8,
        data: Bytes,
    },
}

fn read_curve<B: Buf>(i: &mut B) -> Result<EccCurve> {
    let oid_len = i.read_u8()?;
    ensure!(oid_len != 0 && oid_len != 0xFF, "reserved oid length");
    let oid = i.read_take(oid_len.into())?;
    ecc_curve_from_oid(&oid).ok_or_else(|| format_err!("invalid curve oid"))
}

fn write_curve<W: io::Write>(curve: &EccCurve, writer: &mut W) -> Result<()> {
    let oid = curve.oid();
    writer.write_all(&[oid.len() as u8])?;
    writer.write_all(&oid)?;
    Ok(())
}

impl PublicParams {
    pub fn try_from_buf<B: Buf>(alg: PublicKeyAlgorithm, i: &mut B) -> Result<Self> {
        match alg {
            PublicKeyAlgorithm::RsaEncryptSign
            | PublicKeyAlgorithm::RsaEncrypt
            | PublicKeyAlgorithm::RsaSign => {
                let n = Mpi::try_from_buf(&mut *i)?;
                let e = Mpi::try_from_buf(&mut *i)?;
                Ok(PublicParams::Rsa { n, e })
            }
            PublicKeyAlgorithm::Dsa => {
                let p = Mpi::try_from_buf(&mut *i)?;
                let q = Mpi::try_from_buf(&mut *i)?;
                let g = Mpi::try_from_buf(&mut *i)?;
                let y = Mpi::try_from_buf(&mut *i)?;
                Ok(PublicParams::Dsa { p, q, g, y })
            }
            PublicKeyAlgorithm::Elgamal => {
                let p = Mpi::try_from_buf(&mut *i)?;
                let g = Mpi::try_from_buf(&mut *i)?;
                let y = Mpi::try_from_buf(&mut *i)?;
                Ok(PublicParams::Elgamal { p, g, y })
            }
            PublicKeyAlgorithm::Ecdsa => {
                let curve = read_curve(i)?;
                let p = Mpi::try_from_buf(&mut *i)?;
                Ok(PublicParams::Ecdsa { curve, p })
            }
            PublicKeyAlgorithm::EddsaLegacy => {
                let curve = read_curve(i)?;
                let q = Mpi::try_from_buf(&mut *i)?;
                Ok(PublicParams::EddsaLegacy { curve, q })
            }
            PublicKeyAlgorithm::Ecdh => {
                let curve = read_curve(i)?;
                let p = Mpi::try_from_buf(&mut *i)?;
                let kdf_len = i.read_u8()?;
                ensure_eq!(kdf_len, 3, "invalid kdf parameter length");
                let reserved = i.read_u8()?;
                ensure_eq!(reserved, 1, "invalid kdf parameter version");
                let hash = HashAlgorithm::from(i.read_u8()?);
                let alg_sym = SymmetricKeyAlgorithm::from(i.read_u8()?);
                Ok(PublicParams::Ecdh {
                    curve,
                    p,
                    hash,
                    alg_sym,
                })
            }
            _ => Ok(PublicParams::Unknown {
                alg: alg.into(),
                data: i.rest(),
            }),
        }
    }
}

impl Serialize for PublicParams {
    fn to_writer<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            PublicParams::Rsa { n, e } => {
                n.to_writer(writer)?;
                e.to_writer(writer)?;
            }
            PublicParams::Dsa { p, q, g, y } => {
                p.to_writer(writer)?;
                q.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Elgamal { p, g, y } => {
                p.to_writer(writer)?;
                g.to_writer(writer)?;
                y.to_writer(writer)?;
            }
            PublicParams::Ecdsa { curve, p } => {
                write_curve(curve, writer)?;
                p.to_writer(writer)?;
            }
            PublicParams::EddsaLegacy { curve, q } => {
                write_curve(curve, writer)?;
                q.to_writer(writer)?;
            }
            PublicParams::Ecdh {
                curve,
                p,
                hash,
                alg_sym,
            } => {
                write_curve(curve, writer)?;
                p.to_writer(writer)?;
                writer.write_all(&[0x03, 0x01, (*hash).into(), (*alg_sym).into()])?;
            }
            PublicParams::Unknown { data, .. } => {
                writer.write_all(data)?;
            }
        }
        Ok(())
    }

    fn write_len(&self) -> usize {
        match self {
            PublicParams::Rsa { n, e } => n.write_len() + e.write_len(),
            PublicParams::Dsa { p, q, g, y } => {
                p.write_len() + q.write_len() + g.write_len() + y.write_len()
            }
            PublicParams::Elgamal { p, g, y } => p.write_len() + g.write_len() + y.write_len(),
            PublicParams::Ecdsa { curve, p } => 1 + curve.oid().len() + p.write_len(),
            PublicParams::EddsaLegacy { curve, q } => 1 + curve.oid().len() + q.write_len(),
            PublicParams::Ecdh { curve, p, .. } => 1 + curve.oid().len() + p.write_len() + 4,
            PublicParams::Unknown { data, .. } => data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_roundtrip() {
        let params = PublicParams::Rsa {
            n: Mpi::from_slice(&[0xCA, 0xFE, 0xBA, 0xBE]),
            e: Mpi::from_slice(&[0x01, 0x00, 0x01]),
        };
        let buf = params.to_bytes().unwrap();
        assert_eq!(buf.len(), params.write_len());

        let back =
            PublicParams::try_from_buf(PublicKeyAlgorithm::RsaEncryptSign, &mut &buf[..]).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_ecdh_roundtrip() {
        let params = PublicParams::Ecdh {
            curve: EccCurve::Curve25519,
            p: Mpi::from_slice(&[0x40; 33]),
            hash: HashAlgorithm::Sha256,
            alg_sym: SymmetricKeyAlgorithm::Aes128,
        };
        let buf = params.to_bytes().unwrap();
        assert_eq!(buf.len(), params.write_len());

        let back = PublicParams::try_from_buf(PublicKeyAlgorithm::Ecdh, &mut &buf[..]).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_unknown_algorithm_preserved() {
        let raw = b"\x01\x02\x03\x04opaque";
        let params =
            PublicParams::try_from_buf(PublicKeyAlgorithm::Other(99), &mut &raw[..]).unwrap();
        assert_eq!(params.to_bytes().unwrap(), raw);
    }
}
