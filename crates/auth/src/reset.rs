//! Password reset tokens.
//!
//! The raw token is mailed to the user; only its SHA-256 digest and an
//! expiry (epoch milliseconds) are stored on the account.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct ResetToken {
    raw: String,
    digest: String,
    expires_at: DateTime<Utc>,
}

impl ResetToken {
    /// 20 random bytes, hex encoded.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        let raw: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self {
            digest: digest_token(&raw),
            raw,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }
}

/// SHA-256 of the raw token, lowercase hex.
pub fn digest_token(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_shape_and_digest() {
        let now = Utc::now();
        let token = ResetToken::generate(now);
        assert_eq!(token.raw().len(), 40);
        assert_eq!(token.digest().len(), 64);
        assert_eq!(token.digest(), digest_token(token.raw()));
        assert_eq!(token.expires_at() - now, Duration::minutes(10));
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            digest_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
