//! Opaque bearer tokens.
//!
//! A [`Token`] pairs the identity it was issued to with a 48-byte payload
//! (see [`codec`] for the layout). Tokens travel as text in the form
//! `identity:hex-payload`.

pub mod codec;
pub mod entropy;

pub use codec::{decode_time, encode, PAYLOAD_BYTES};
pub use entropy::{EntropySource, LETTERS};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub identity: String,
    pub payload: Vec<u8>,
}

impl Token {
    pub fn new(identity: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            identity: identity.into(),
            payload,
        }
    }

    /// Instant the token was issued, as embedded in the payload.
    pub fn issued_at(&self) -> Result<DateTime<Utc>> {
        decode_time(&self.payload)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Rebuild a token from an identity and a hex payload.
    ///
    /// Only the hex itself is checked here; a payload of the wrong length is
    /// still accepted and simply never validates.
    pub fn from_hex(identity: impl Into<String>, payload_hex: &str) -> Result<Self> {
        let payload = hex::decode(payload_hex.trim())
            .map_err(|e| Error::MalformedToken(format!("payload is not hex: {e}")))?;
        Ok(Self::new(identity, payload))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity, self.to_hex())
    }
}

impl FromStr for Token {
    type Err = Error;

    /// Splits on the last `:` so identities may themselves contain colons.
    fn from_str(s: &str) -> Result<Self> {
        let (identity, payload_hex) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::MalformedToken("expected 'identity:hex'".to_string()))?;
        if identity.is_empty() {
            return Err(Error::MalformedToken("identity is empty".to_string()));
        }
        Self::from_hex(identity, payload_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Token {
        let issued = DateTime::from_timestamp_nanos(1_700_000_000_000_000_042);
        let payload = encode(issued, &mut entropy::from_seed(9)).unwrap();
        Token::new("alice", payload)
    }

    #[test]
    fn issued_at_reads_payload() {
        let token = sample();
        assert_eq!(
            token.issued_at().unwrap().timestamp_nanos_opt(),
            Some(1_700_000_000_000_000_042)
        );
    }

    #[test]
    fn text_form_round_trips() {
        let token = sample();
        let text = token.to_string();
        assert!(text.starts_with("alice:"));
        assert_eq!(text.len(), "alice:".len() + PAYLOAD_BYTES * 2);
        assert_eq!(text.parse::<Token>().unwrap(), token);
    }

    #[test]
    fn identity_may_contain_colons() {
        let mut token = sample();
        token.identity = "urn:user:7".into();
        let parsed: Token = token.to_string().parse().unwrap();
        assert_eq!(parsed.identity, "urn:user:7");
    }

    #[test]
    fn bad_text_is_malformed() {
        for bad in ["no-separator", ":abcd", "alice:not-hex"] {
            assert!(
                matches!(bad.parse::<Token>(), Err(Error::MalformedToken(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn short_payload_has_no_issue_time() {
        let token = Token::from_hex("alice", "abcd").unwrap();
        assert!(matches!(token.issued_at(), Err(Error::MalformedToken(_))));
    }
}
