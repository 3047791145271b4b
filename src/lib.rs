//! # opgp
//!
//! A packet-level OpenPGP engine: parsing, serialization and cryptographic
//! processing of RFC 4880 messages and keys, including the AEAD extensions
//! from the crypto-refresh drafts.
//!
//! The crate is layered bottom up:
//!
//! - [`types`]: wire primitives (MPIs, S2K specifiers, tags, key material)
//! - [`crypto`]: hashes, symmetric ciphers and OpenPGP CFB, AEAD modes,
//!   public key operations
//! - [`packet`]: the per-tag packet codec and the streaming packet parser
//! - [`composed`]: transferable keys and messages assembled from packet
//!   sequences
//!
//! ASCII armor is deliberately out of scope; all inputs and outputs are the
//! binary packet format.

#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::style,
    clippy::perf,
    clippy::complexity,
    clippy::correctness,
    clippy::unwrap_used,
    rust_2018_idioms
)]
#![allow(clippy::missing_const_for_fn, clippy::use_self, clippy::type_complexity)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
pub mod errors;

pub mod composed;
pub mod config;
pub mod crypto;
pub mod packet;
pub mod parsing;
pub mod ser;
pub mod types;
pub mod util;

pub use self::composed::key::{SignedPublicKey, SignedSecretKey};
pub use self::composed::message::Message;
pub use self::config::Config;
pub use self::packet::{Packet, PacketParser};

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default maximum size that gets buffered for a single packet body.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024 * 1024;
