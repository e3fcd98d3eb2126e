//! Protocol-level error types.

use thiserror::Error;

/// Errors produced while decoding or validating datagrams.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("datagram truncated: needed {needed} bytes, had {remaining}")]
    Truncated { needed: usize, remaining: usize },

    #[error("datagram too short for a {kind} packet: {len} bytes")]
    TooShort { kind: &'static str, len: usize },

    #[error("checksum mismatch")]
    BadChecksum,

    #[error("unknown packet family: {0:#06x}")]
    UnknownFamily(u16),

    #[error("unknown codec id: {0}")]
    UnknownCodec(u8),

    #[error("codec {0} is reserved and cannot carry audio")]
    ReservedCodec(u8),

    #[error("unexpected datagram length: {len} bytes, expected {expected}")]
    BadLength { len: usize, expected: usize },

    #[error("string field is not terminated")]
    UnterminatedString,
}

impl ProtocolError {
    /// Static label for metrics and log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Truncated { .. } => "truncated",
            Self::TooShort { .. } => "too_short",
            Self::BadChecksum => "bad_checksum",
            Self::UnknownFamily(_) => "unknown_family",
            Self::UnknownCodec(_) => "unknown_codec",
            Self::ReservedCodec(_) => "reserved_codec",
            Self::BadLength { .. } => "bad_length",
            Self::UnterminatedString => "unterminated_string",
        }
    }
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
