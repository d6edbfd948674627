use thiserror::Error;

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("length mismatch: expected {expected} scalars, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("incomplete scalar sequence: needed {needed}, {remaining} remaining")]
    IncompleteSequence { needed: usize, remaining: usize },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0}")]
    SpongeMisuse(&'static str),

    #[error("balance for mint {mint} would overflow the scalar field")]
    BalanceOverflow { mint: String },

    #[error("insufficient balance for mint {mint}")]
    InsufficientBalance { mint: String },

    #[error("root signing key is not available on this keychain")]
    RootKeyUnavailable,

    #[error("signing failed: {0}")]
    Signing(String),
}
