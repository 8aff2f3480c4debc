//! Password-gated token issuance.
//!
//! Provides:
//! - Credential records (identity → SHA-256 password digest)
//! - Token issue / validate / revoke with one live token per identity
//! - Lazy expiry on validation plus an explicit sweep (`purge_expired`)
//!
//! ## Design Decisions
//! - Tokens are keyed by identity, so issuing a new token silently
//!   invalidates the previous one. Multi-session support would need the
//!   token bucket keyed by a session id instead.
//! - Validation answers `bool` only. Unknown identity, superseded token and
//!   expiry are indistinguishable to the caller.
//! - No background task removes expired tokens; run `purge_expired` from
//!   whatever scheduler the embedding application already has.

pub mod credentials;
pub mod store;

pub use credentials::{hash_password, Credentials, PASSWORD_BUCKET};
pub use store::{is_expired, TokenStore, TOKEN_BUCKET};
