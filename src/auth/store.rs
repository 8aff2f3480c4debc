//! Token store: one live bearer token per identity, expired lazily.
//!
//! Buckets:
//! - `user_auth`: identity → SHA-256(password)
//! - `token`: identity → 48-byte payload
//!
//! A token slot moves between two states. `issue` moves it to Issued
//! (replacing any earlier payload). `revoke`, a validation that finds it
//! stale, or a purge moves it back to Absent. Each move is one store
//! transaction; nothing makes separate calls atomic with each other, so an
//! `issue` racing a `validate` for the same identity may be observed
//! either way round.

use super::credentials::{constant_time_eq, Credentials, PASSWORD_BUCKET};
use crate::config::{BackendKind, Config};
use crate::error::{Error, Result};
use crate::kv::{Backend, KvStore, MemoryKv, SqliteKv};
use crate::token::codec;
use crate::token::entropy::{self, EntropySource};
use crate::token::Token;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::time::Duration;

/// Bucket holding the current payload per identity.
pub const TOKEN_BUCKET: &str = "token";

pub struct TokenStore<K: KvStore = Backend> {
    kv: K,
    ttl: Duration,
    entropy: Mutex<Box<dyn EntropySource>>,
}

impl TokenStore<Backend> {
    /// Open (or create) the store described by `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let backend = match config.backend {
            BackendKind::Sqlite => Backend::Sqlite(SqliteKv::open(&config.db_path())?),
            BackendKind::Memory => Backend::Memory(MemoryKv::new()),
        };
        tracing::info!(
            backend = backend.name(),
            path = %config.db_path().display(),
            ttl_secs = config.ttl_secs,
            "Opening token store"
        );
        Self::new(backend, config.ttl())
    }
}

impl<K: KvStore> TokenStore<K> {
    /// Wrap `kv`, creating both buckets. Entropy is seeded once from the OS.
    pub fn new(kv: K, ttl: Duration) -> Result<Self> {
        Self::with_entropy(kv, ttl, entropy::from_os_seed())
    }

    /// Like [`TokenStore::new`] with a caller-supplied entropy source.
    pub fn with_entropy(kv: K, ttl: Duration, entropy: Box<dyn EntropySource>) -> Result<Self> {
        kv.create_bucket(PASSWORD_BUCKET)?;
        kv.create_bucket(TOKEN_BUCKET)?;
        Ok(Self {
            kv,
            ttl,
            entropy: Mutex::new(entropy),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Password records backing this store.
    pub fn credentials(&self) -> Credentials<'_, K> {
        Credentials::new(&self.kv)
    }

    // ── User Management ─────────────────────────────────────────────

    pub fn add_user(&self, identity: &str, password: &str) -> Result<()> {
        self.credentials().add_user(identity, password)
    }

    pub fn delete_user(&self, identity: &str) -> Result<()> {
        self.credentials().delete_user(identity)
    }

    // ── Token Lifecycle ─────────────────────────────────────────────

    /// Issue a token stamped with the current time.
    pub fn issue_token(&self, identity: &str, password: &str) -> Result<Token> {
        self.issue_token_at(identity, password, Utc::now())
    }

    /// Check the password, then store and return a fresh token issued at
    /// `now`. Any earlier token for `identity` stops validating.
    pub fn issue_token_at(
        &self,
        identity: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Token> {
        if !self.credentials().check_password(identity, password) {
            tracing::debug!(identity = %identity, "Token refused: bad credentials");
            return Err(Error::InvalidCredentials);
        }

        let payload = {
            let mut rng = self.entropy.lock();
            codec::encode(now, &mut *rng)?
        };
        self.kv
            .update(|txn| txn.put(TOKEN_BUCKET, identity, &payload))?;

        tracing::info!(identity = %identity, issued_at = %now, "Token issued");
        Ok(Token::new(identity, payload))
    }

    /// Validate against the current time and the configured TTL.
    pub fn validate_token(&self, token: &Token) -> bool {
        self.validate_token_at(token, Utc::now(), self.ttl)
    }

    /// `true` only if `token` is the stored token for its identity and
    /// `issued_at + ttl` is still after `now`.
    ///
    /// A stale token is deleted on the spot. Every failure collapses to
    /// `false`: callers cannot tell an unknown identity from a superseded,
    /// forged or expired token.
    pub fn validate_token_at(&self, token: &Token, now: DateTime<Utc>, ttl: Duration) -> bool {
        // Lookup, comparison and the expiry delete share one transaction so a
        // concurrent issue can never be deleted by a stale token's check.
        let outcome = self.kv.update(|txn| {
            let Some(stored) = txn.get(TOKEN_BUCKET, &token.identity)? else {
                return Ok(false);
            };
            if !constant_time_eq(&stored, &token.payload) {
                return Ok(false);
            }

            let issued_at = match codec::decode_time(&token.payload) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(identity = %token.identity, error = %e, "Stored token is malformed");
                    return Ok(false);
                }
            };

            if is_expired(issued_at, now, ttl) {
                txn.delete(TOKEN_BUCKET, &token.identity)?;
                tracing::debug!(identity = %token.identity, "Expired token dropped");
                return Ok(false);
            }
            Ok(true)
        });

        outcome.unwrap_or_else(|e| {
            tracing::warn!(identity = %token.identity, error = %e, "Token validation failed");
            false
        })
    }

    /// Remove any token for `identity`. Revoking nothing succeeds.
    pub fn revoke_token(&self, identity: &str) -> Result<()> {
        let removed = self
            .kv
            .update(|txn| txn.delete(TOKEN_BUCKET, identity))?;
        tracing::info!(identity = %identity, removed, "Token revoked");
        Ok(())
    }

    /// Sweep with the current time and the configured TTL.
    pub fn purge_expired(&self) -> Result<usize> {
        self.purge_expired_at(Utc::now(), self.ttl)
    }

    /// Delete every stored token that is expired at `now` (or unreadable).
    /// Returns how many were removed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> Result<usize> {
        let removed = self.kv.update(|txn| {
            let mut removed = 0;
            for (identity, payload) in txn.entries(TOKEN_BUCKET)? {
                let stale = match codec::decode_time(&payload) {
                    Ok(issued_at) => is_expired(issued_at, now, ttl),
                    Err(_) => true,
                };
                if stale && txn.delete(TOKEN_BUCKET, &identity)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })?;
        tracing::info!(removed, "Purged expired tokens");
        Ok(removed)
    }
}

/// Expiry predicate shared by validation and the sweep: a token issued at
/// `issued_at` is dead once `issued_at + ttl <= now`. A deadline past the
/// representable range never arrives.
pub fn is_expired(issued_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let deadline = TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| issued_at.checked_add_signed(ttl));
    match deadline {
        Some(deadline) => deadline <= now,
        None => false,
    }
}
