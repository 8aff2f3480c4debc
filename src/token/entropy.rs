//! Pseudo-random letter generation for token digests.
//!
//! The generator is an injected capability rather than process state: a
//! store owns one source, seeded once, and tests hand in a fixed seed.
//! None of this is meant to be cryptographically strong; the letters only
//! make two tokens issued in the same nanosecond differ.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};

/// Letters that random token material is drawn from.
pub const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// SHA-256 output length.
pub const DIGEST_BYTES: usize = 32;

/// Any RNG that can be moved between threads.
pub trait EntropySource: RngCore + Send {}

impl<T: RngCore + Send> EntropySource for T {}

/// Seed a `StdRng` once from the operating system.
pub fn from_os_seed() -> Box<dyn EntropySource> {
    Box::new(StdRng::from_entropy())
}

/// Deterministic source for tests and reproducible fixtures.
pub fn from_seed(seed: u64) -> Box<dyn EntropySource> {
    Box::new(StdRng::seed_from_u64(seed))
}

/// `size` letters, each picked uniformly from the whole alphabet.
pub fn random_letters<R: RngCore + ?Sized>(rng: &mut R, size: usize) -> Vec<u8> {
    (0..size)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())])
        .collect()
}

/// SHA-256 over `size` random letters. Always 32 bytes, whatever `size` is.
pub fn random_digest<R: RngCore + ?Sized>(rng: &mut R, size: usize) -> [u8; DIGEST_BYTES] {
    let letters = random_letters(rng, size);
    let mut out = [0u8; DIGEST_BYTES];
    out.copy_from_slice(&Sha256::digest(&letters));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_have_requested_length() {
        let mut rng = from_seed(7);
        assert_eq!(random_letters(&mut rng, 16).len(), 16);
        assert!(random_letters(&mut rng, 0).is_empty());
    }

    #[test]
    fn letters_come_from_alphabet() {
        let mut rng = from_seed(7);
        let letters = random_letters(&mut rng, 4096);
        assert!(letters.iter().all(|b| b.is_ascii_alphabetic()));
    }

    #[test]
    fn short_requests_still_reach_the_whole_alphabet() {
        // A length-bounded index would only ever yield 'a' and 'b' here.
        let mut rng = from_seed(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..2000 {
            seen.extend(random_letters(&mut rng, 2));
        }
        assert_eq!(seen.len(), LETTERS.len());
    }

    #[test]
    fn digest_is_always_32_bytes() {
        let mut rng = from_seed(3);
        for size in [0, 1, 8, 16, 1000] {
            assert_eq!(random_digest(&mut rng, size).len(), DIGEST_BYTES);
        }
    }

    #[test]
    fn same_seed_same_digest() {
        let a = random_digest(&mut from_seed(42), 8);
        let b = random_digest(&mut from_seed(42), 8);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = random_digest(&mut from_seed(1), 8);
        let b = random_digest(&mut from_seed(2), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn consecutive_draws_differ() {
        let mut rng = from_os_seed();
        assert_ne!(random_digest(&mut rng, 8), random_digest(&mut rng, 8));
    }
}
