use crate::kv::KvError;
use thiserror::Error;

/// Errors surfaced by the credential and token stores.
///
/// Validation never produces one of these: every validation failure
/// collapses to `false` so callers cannot tell an unknown identity from a
/// stale or forged token.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] KvError),

    /// Deliberately identical for unknown identities and wrong passwords.
    #[error("Invalid identity or password")]
    InvalidCredentials,

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Issue time does not fit in a 64-bit nanosecond timestamp")]
    TimestampOutOfRange,
}

pub type Result<T> = std::result::Result<T, Error>;
