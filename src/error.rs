//! Daemon error types.

use thiserror::Error;

/// Errors surfaced by control and connection handlers.
///
/// Most protocol failures are dropped silently by design (misbehaving
/// clients must not be able to elicit responses); these variants exist so
/// the dispatcher can log a reason before dropping.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("datagram rejected: {0}")]
    Protocol(#[from] parley_proto::ProtocolError),

    #[error("unknown operation code {direction}/{code:#04x}")]
    UnknownOpcode { direction: u8, code: u8 },

    #[error("request shorter than the operation minimum: {len} < {min}")]
    RequestTooShort { len: usize, min: usize },

    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),
}

impl HandlerError {
    /// Static label for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.error_code(),
            Self::UnknownOpcode { .. } => "unknown_opcode",
            Self::RequestTooShort { .. } => "request_too_short",
            Self::Db(_) => "db_error",
        }
    }
}

/// Result type for handler code.
pub type HandlerResult = Result<(), HandlerError>;
