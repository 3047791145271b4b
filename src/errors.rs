use std::num::TryFromIntError;

use snafu::{Backtrace, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error types.
///
/// Variants group into the categories callers care about: malformed input,
/// unsupported algorithms, policy rejections, integrity failures,
/// authentication failures, composition-rule violations, and failures of the
/// underlying crypto primitives. Integrity failures are never downgraded or
/// swallowed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("invalid input"))]
    InvalidInput { backtrace: Option<Backtrace> },
    #[snafu(display("packet is incomplete: needed {needed} more bytes"))]
    PacketIncomplete {
        needed: usize,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("packet contained more data than was parsable (trailing bytes {size})"))]
    PacketTooLarge { size: u64 },
    #[snafu(display("no matching packet found"))]
    NoMatchingPacket { backtrace: Option<Backtrace> },
    #[snafu(display("invalid packet content {source:?}"))]
    InvalidPacketContent { source: Box<Error> },
    #[snafu(display("unknown critical packet type {tag}"))]
    UnknownCriticalPacket { tag: u8 },
    #[snafu(display("invalid checksum"))]
    InvalidChecksum { backtrace: Option<Backtrace> },

    /// Recognized, but not implemented.
    #[snafu(display("not yet implemented: {message}"))]
    Unimplemented { message: String },
    /// Packet versions and parameters we don't support, but can safely reject.
    #[snafu(display("unsupported: {message}"))]
    Unsupported {
        message: String,
        backtrace: Option<Backtrace>,
    },

    /// Rejected by the active [`Config`](crate::Config).
    #[snafu(display("rejected by policy: {message}"))]
    Policy {
        message: String,
        backtrace: Option<Backtrace>,
    },

    #[snafu(display("modification detection code mismatch"))]
    MdcMismatch { backtrace: Option<Backtrace> },
    #[snafu(display("AEAD chunk {index} failed authentication"))]
    AeadTagMismatch {
        index: u64,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("signature did not verify: {message}"))]
    BadSignature {
        message: String,
        backtrace: Option<Backtrace>,
    },

    #[snafu(display("no secret key or passphrase could decrypt a session key"))]
    MissingSessionKey { backtrace: Option<Backtrace> },
    #[snafu(display("missing key"))]
    MissingKey { backtrace: Option<Backtrace> },

    /// The packet list violates the grammar for keys or messages.
    #[snafu(display("packet composition violated: {message}"))]
    Composition {
        message: String,
        backtrace: Option<Backtrace>,
    },

    #[snafu(display("{message}"))]
    Message {
        message: String,
        backtrace: Option<Backtrace>,
    },

    #[snafu(display("IO error: {source}"), context(false))]
    IO {
        source: std::io::Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    RsaError {
        source: rsa::errors::Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    EllipticCurve {
        source: elliptic_curve::Error,
        backtrace: Option<Backtrace>,
    },
    /// Errors from the `signature` trait crate, shared by the ECDSA and
    /// EdDSA backends.
    #[snafu(transparent)]
    SignatureError { source: signature::Error },
    #[snafu(display("AES key wrap failed"))]
    AesKw { source: aes_kw::Error },
    #[snafu(display("AEAD primitive failure"))]
    AeadPrimitive,
    #[snafu(display("cfb: invalid key or iv length"))]
    CfbInvalidKeyIvLength,
    #[snafu(transparent)]
    Utf8Error {
        source: std::str::Utf8Error,
        backtrace: Option<Backtrace>,
    },
    #[snafu(transparent)]
    TryFromInt {
        source: TryFromIntError,
        backtrace: Option<Backtrace>,
    },
}

/// Marker for MDC failures raised inside [`std::io::Error`] by the streaming
/// decryptors, so the typed error survives the io boundary.
#[derive(Debug)]
pub struct StreamMdcError;

impl std::fmt::Display for StreamMdcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "modification detection code mismatch")
    }
}

impl std::error::Error for StreamMdcError {}

/// Marker for AEAD chunk failures raised inside [`std::io::Error`] by the
/// streaming decryptors.
#[derive(Debug)]
pub struct StreamAeadTagError {
    pub index: u64,
}

impl std::fmt::Display for StreamAeadTagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AEAD chunk {} failed authentication", self.index)
    }
}

impl std::error::Error for StreamAeadTagError {}

impl Error {
    /// Recovers integrity failures tunneled through an io stream back into
    /// their typed variants; anything else stays an io error.
    pub fn from_stream_io(err: std::io::Error) -> Error {
        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<StreamMdcError>())
        {
            return MdcMismatchSnafu.build();
        }
        let aead_index = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<StreamAeadTagError>())
            .map(|tag| tag.index);
        if let Some(index) = aead_index {
            return AeadTagMismatchSnafu { index }.build();
        }
        err.into()
    }
}

impl From<aes_kw::Error> for Error {
    fn from(source: aes_kw::Error) -> Self {
        Error::AesKw { source }
    }
}

impl From<aead::Error> for Error {
    fn from(_: aead::Error) -> Self {
        Error::AeadPrimitive
    }
}

impl From<cipher::InvalidLength> for Error {
    fn from(_: cipher::InvalidLength) -> Self {
        Error::CfbInvalidKeyIvLength
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Message {
            message,
            backtrace: Some(snafu::GenerateImplicitData::generate()),
        }
    }
}

#[macro_export]
macro_rules! unimplemented_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unimplemented { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unimplemented { message: format!($fmt, $($arg)+)})
    };
}

#[macro_export]
macro_rules! unsupported_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unsupported {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unsupported {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
}

#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::Error::Message {
            message: $e.to_string(),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Message {
            message: format!($fmt, $($arg)+),
            backtrace: ::snafu::GenerateImplicitData::generate(),
        })
    };
}

#[macro_export]
macro_rules! format_err {
    ($e:expr) => {
        $crate::errors::Error::Message {
            message: $e.to_string(),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Message {
            message: format!($fmt, $($arg)+),
            backtrace: Some(::snafu::GenerateImplicitData::generate()),
        }
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)+) => {
        if !($cond) {
            bail!($fmt, $($arg)+);
        }
    };
}

#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!("expected {:?} == {:?}", left_val, right_val);
                }
            }
        }
    }};
    ($left:expr, $right:expr, $fmt:expr $(, $arg:tt)*) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(concat!($fmt, " ({:?} != {:?})") $(, $arg)*, left_val, right_val);
                }
            }
        }
    }};
}
