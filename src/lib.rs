//! Opaque bearer tokens for password-authenticated identities.
//!
//! ```no_run
//! use authtoken::{Config, TokenStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = TokenStore::open(&Config::default())?;
//! store.add_user("test", "password")?;
//! let token = store.issue_token("test", "password")?;
//! assert!(store.validate_token(&token));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod kv;
pub mod token;

pub use auth::{Credentials, TokenStore};
pub use config::{BackendKind, Config};
pub use error::{Error, Result};
pub use token::Token;
