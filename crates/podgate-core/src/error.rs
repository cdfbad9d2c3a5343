use thiserror::Error;

/// Stable error taxonomy exposed on the wire. Every [`GateError`] maps onto
/// exactly one kind; result codes and HTTP statuses are derived from it and
/// must never change between releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Never retried.
    Invalid,
    /// Requested entity does not exist. Caller decides.
    NotFound,
    /// Missing signature, permission, or ownership. Never retried.
    Unauthorized,
    /// Unique-index collision. Never retried.
    Duplicate,
    /// Storage fault. Retry at caller.
    Database,
    /// Programmer bug. Fatal; logged loudly.
    Human,
}

impl ErrorKind {
    /// Result code carried by check_tx/deliver_tx. Zero is success.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::Invalid => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Unauthorized => 403,
            ErrorKind::Duplicate => 409,
            ErrorKind::Database => 500,
            ErrorKind::Human => 500,
        }
    }

    /// HTTP status for read-side surfaces (admission webhook, queries).
    pub fn http_status(self) -> u16 {
        self.code() as u16
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    // ── Transaction errors ───────────────────────────────────────────────────
    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("transaction carries no signatures")]
    NoSignatures,

    #[error("unknown message route: {0}")]
    UnknownRoute(String),

    #[error("{0}")]
    Invalid(String),

    // ── Authorization ────────────────────────────────────────────────────────
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    // ── Store / bucket errors ────────────────────────────────────────────────
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    // ── Programmer bugs ──────────────────────────────────────────────────────
    #[error("internal error: {0}")]
    Human(String),
}

impl GateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GateError::InvalidNonce { .. }
            | GateError::InvalidSignature
            | GateError::NoSignatures
            | GateError::UnknownRoute(_)
            | GateError::Invalid(_)
            | GateError::Serialization(_) => ErrorKind::Invalid,
            GateError::Unauthorized(_) => ErrorKind::Unauthorized,
            GateError::NotFound(_) => ErrorKind::NotFound,
            GateError::Duplicate(_) => ErrorKind::Duplicate,
            GateError::Storage(_) => ErrorKind::Database,
            GateError::Human(_) => ErrorKind::Human,
        }
    }

    /// Wire result code for this error.
    pub fn code(&self) -> u32 {
        self.kind().code()
    }
}
