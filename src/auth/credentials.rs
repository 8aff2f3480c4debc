//! Password records: identity → SHA-256(password).

use crate::error::Result;
use crate::kv::KvStore;
use sha2::{Digest, Sha256};

/// Bucket holding password digests.
pub const PASSWORD_BUCKET: &str = "user_auth";

/// Length of a stored password digest.
pub const PASSWORD_HASH_BYTES: usize = 32;

/// Credential view over a store's `user_auth` bucket.
///
/// Borrowed from [`TokenStore::credentials`](super::TokenStore::credentials);
/// the token store stays the only owner of the underlying data.
pub struct Credentials<'a, K: KvStore> {
    kv: &'a K,
}

impl<'a, K: KvStore> Credentials<'a, K> {
    pub(crate) fn new(kv: &'a K) -> Self {
        Self { kv }
    }

    /// Create or overwrite the password record for `identity`.
    pub fn add_user(&self, identity: &str, password: &str) -> Result<()> {
        let hash = hash_password(password);
        self.kv
            .update(|txn| txn.put(PASSWORD_BUCKET, identity, &hash))?;
        tracing::info!(identity = %identity, "User stored");
        Ok(())
    }

    /// Remove the password record. Removing an unknown identity succeeds.
    pub fn delete_user(&self, identity: &str) -> Result<()> {
        let removed = self
            .kv
            .update(|txn| txn.delete(PASSWORD_BUCKET, identity))?;
        tracing::info!(identity = %identity, removed, "User deleted");
        Ok(())
    }

    /// Whether `password` matches the stored record.
    ///
    /// Unknown identities and read failures both yield `false`. An unknown
    /// identity is still compared against a dummy digest so both paths do
    /// the same work.
    pub fn check_password(&self, identity: &str, password: &str) -> bool {
        let attempt = hash_password(password);
        let stored = match self.kv.view(|txn| txn.get(PASSWORD_BUCKET, identity)) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "Password lookup failed");
                None
            }
        };

        match stored {
            Some(stored) => constant_time_eq(&stored, &attempt),
            None => {
                std::hint::black_box(constant_time_eq(
                    std::hint::black_box(&[0u8; PASSWORD_HASH_BYTES]),
                    &attempt,
                ));
                false
            }
        }
    }
}

/// SHA-256 of the password's UTF-8 bytes.
pub fn hash_password(password: &str) -> [u8; PASSWORD_HASH_BYTES] {
    let mut out = [0u8; PASSWORD_HASH_BYTES];
    out.copy_from_slice(&Sha256::digest(password.as_bytes()));
    out
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
