//! Byte layout of a token payload.
//!
//! ```text
//! 0               16                                  48
//! +---------------+-----------------------------------+
//! | issue time    | SHA-256(8 random letters)         |
//! | varint, 0-pad |                                   |
//! +---------------+-----------------------------------+
//! ```
//!
//! The issue time is nanoseconds since the Unix epoch as an `i64`, zig-zag
//! mapped to `u64` and written as little-endian base-128 groups. At most ten
//! bytes are used; the rest of the 16-byte field stays zero.

use super::entropy::{random_digest, DIGEST_BYTES};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rand::RngCore;

/// Width of the timestamp field.
pub const TIME_FIELD_BYTES: usize = 16;

/// Total payload length.
pub const PAYLOAD_BYTES: usize = TIME_FIELD_BYTES + DIGEST_BYTES;

/// Number of random letters hashed into each payload.
pub const ENTROPY_LETTERS: usize = 8;

/// Longest varint a `u64` can produce.
const MAX_VARINT_LEN64: usize = 10;

/// Lay out `issued_at` and fresh entropy as a 48-byte payload.
pub fn encode<R: RngCore + ?Sized>(issued_at: DateTime<Utc>, rng: &mut R) -> Result<Vec<u8>> {
    let nanos = issued_at
        .timestamp_nanos_opt()
        .ok_or(Error::TimestampOutOfRange)?;

    let mut payload = vec![0u8; PAYLOAD_BYTES];
    put_varint(&mut payload[..TIME_FIELD_BYTES], nanos);
    payload[TIME_FIELD_BYTES..].copy_from_slice(&random_digest(rng, ENTROPY_LETTERS));
    Ok(payload)
}

/// Recover the issue time embedded in a payload.
pub fn decode_time(payload: &[u8]) -> Result<DateTime<Utc>> {
    if payload.len() != PAYLOAD_BYTES {
        return Err(Error::MalformedToken(format!(
            "expected {PAYLOAD_BYTES} bytes, got {}",
            payload.len()
        )));
    }
    let nanos = read_varint(&payload[..TIME_FIELD_BYTES]).ok_or_else(|| {
        Error::MalformedToken("issue time is not a valid varint".to_string())
    })?;
    Ok(DateTime::from_timestamp_nanos(nanos))
}

/// Zig-zag `x` and write it as a varint. Returns the bytes used.
fn put_varint(buf: &mut [u8], x: i64) -> usize {
    let mut ux = (x as u64) << 1;
    if x < 0 {
        ux = !ux;
    }
    put_uvarint(buf, ux)
}

fn put_uvarint(buf: &mut [u8], mut x: u64) -> usize {
    let mut i = 0;
    while x >= 0x80 {
        buf[i] = (x as u8) | 0x80;
        x >>= 7;
        i += 1;
    }
    buf[i] = x as u8;
    i + 1
}

/// `None` on a truncated varint or one that overflows 64 bits.
fn read_uvarint(buf: &[u8]) -> Option<u64> {
    let mut x = 0u64;
    let mut shift = 0u32;
    for (i, &b) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN64 {
            return None;
        }
        if b < 0x80 {
            if i == MAX_VARINT_LEN64 - 1 && b > 1 {
                return None;
            }
            return Some(x | u64::from(b) << shift);
        }
        x |= u64::from(b & 0x7f) << shift;
        shift += 7;
    }
    None
}

fn read_varint(buf: &[u8]) -> Option<i64> {
    let ux = read_uvarint(buf)?;
    let mut x = (ux >> 1) as i64;
    if ux & 1 != 0 {
        x = !x;
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::entropy::from_seed;
    use chrono::TimeZone;

    fn at(nanos: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(nanos)
    }

    // Ends of the i64 nanosecond range that chrono maps back losslessly.
    const EARLIEST: i64 = i64::MIN / 1_000_000_000 * 1_000_000_000;
    const LATEST: i64 = i64::MAX;

    #[test]
    fn payload_is_48_bytes() {
        let mut rng = from_seed(1);
        for t in [at(0), Utc::now(), at(EARLIEST), at(LATEST)] {
            assert_eq!(encode(t, &mut rng).unwrap().len(), PAYLOAD_BYTES);
        }
    }

    #[test]
    fn decode_recovers_issue_time() {
        let mut rng = from_seed(1);
        let samples = [
            at(0),
            at(1),
            at(-1),
            at(EARLIEST),
            at(LATEST),
            at(1_700_000_000_123_456_789),
            Utc.with_ymd_and_hms(1969, 7, 20, 20, 17, 40).unwrap(),
            Utc::now(),
        ];
        for t in samples {
            let payload = encode(t, &mut rng).unwrap();
            assert_eq!(decode_time(&payload).unwrap(), t, "round trip for {t}");
        }
    }

    #[test]
    fn same_instant_different_entropy() {
        let t = Utc::now();
        let mut rng = from_seed(5);
        let a = encode(t, &mut rng).unwrap();
        let b = encode(t, &mut rng).unwrap();
        assert_eq!(a[..TIME_FIELD_BYTES], b[..TIME_FIELD_BYTES]);
        assert_ne!(a[TIME_FIELD_BYTES..], b[TIME_FIELD_BYTES..]);
    }

    #[test]
    fn timestamp_field_is_zero_padded() {
        let payload = encode(at(1), &mut from_seed(1)).unwrap();
        // zig-zag(1) == 2, a single varint byte
        assert_eq!(payload[0], 2);
        assert!(payload[1..TIME_FIELD_BYTES].iter().all(|&b| b == 0));
    }

    #[test]
    fn negative_values_zigzag() {
        let mut buf = [0u8; TIME_FIELD_BYTES];
        assert_eq!(put_varint(&mut buf, -1), 1);
        assert_eq!(buf[0], 1);
        assert_eq!(read_varint(&buf), Some(-1));
    }

    #[test]
    fn extremes_use_ten_bytes() {
        let mut buf = [0u8; TIME_FIELD_BYTES];
        assert_eq!(put_varint(&mut buf, i64::MIN), MAX_VARINT_LEN64);
        assert_eq!(read_varint(&buf), Some(i64::MIN));
    }

    #[test]
    fn wrong_length_is_malformed() {
        for len in [0, 16, 47, 49] {
            let err = decode_time(&vec![0u8; len]).unwrap_err();
            assert!(matches!(err, Error::MalformedToken(_)), "len {len}");
        }
    }

    #[test]
    fn unterminated_varint_is_malformed() {
        let mut payload = vec![0u8; PAYLOAD_BYTES];
        payload[..TIME_FIELD_BYTES].fill(0x80);
        assert!(matches!(
            decode_time(&payload),
            Err(Error::MalformedToken(_))
        ));
    }

    #[test]
    fn overflowing_varint_is_malformed() {
        let mut payload = vec![0u8; PAYLOAD_BYTES];
        payload[..MAX_VARINT_LEN64 - 1].fill(0xff);
        payload[MAX_VARINT_LEN64 - 1] = 0x02;
        assert!(matches!(
            decode_time(&payload),
            Err(Error::MalformedToken(_))
        ));
    }

    #[test]
    fn out_of_range_instant_is_rejected() {
        let far = Utc.with_ymd_and_hms(3000, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            encode(far, &mut from_seed(1)),
            Err(Error::TimestampOutOfRange)
        ));
    }
}
