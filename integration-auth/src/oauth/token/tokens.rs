//! OAuth token types.

use chrono::Utc;
use secrecy::SecretString;

/// A token is treated as expired this many seconds before its nominal expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Returns true once `now` is within the safety margin of `obtained_at + expires_in`.
///
/// All values are epoch seconds.
pub fn is_expiring(obtained_at: i64, expires_in: i64, now: i64) -> bool {
    now >= obtained_at + expires_in - EXPIRY_MARGIN_SECS
}

/// OAuth tokens with metadata.
#[derive(Debug, Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: Option<SecretString>,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// When the token was issued, in epoch seconds.
    pub obtained_at: i64,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
}

impl Tokens {
    /// Check if the access token is expired or about to expire.
    pub fn is_expiring(&self) -> bool {
        is_expiring(self.obtained_at, self.expires_in, Utc::now().timestamp())
    }
}

/// Result of a token refresh operation.
#[derive(Debug, Clone)]
pub struct RefreshResult {
    /// The new tokens.
    pub tokens: Tokens,
    /// True if the provider issued a new refresh token.
    pub refresh_token_rotated: bool,
}

impl RefreshResult {
    /// Create a refresh result with no rotation.
    pub fn no_rotation(tokens: Tokens) -> Self {
        Self {
            tokens,
            refresh_token_rotated: false,
        }
    }

    /// Create a refresh result with rotation.
    pub fn with_rotation(tokens: Tokens) -> Self {
        Self {
            tokens,
            refresh_token_rotated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(obtained_at: i64, expires_in: i64) -> Tokens {
        Tokens {
            access_token: SecretString::new("test".to_string()),
            refresh_token: None,
            expires_in,
            obtained_at,
            token_type: "Bearer".to_string(),
            scopes: vec![],
        }
    }

    #[test]
    fn test_token_with_more_than_a_minute_left_is_valid() {
        assert!(!is_expiring(1_000, 3_600, 1_000 + 3_600 - 61));
    }

    #[test]
    fn test_token_inside_margin_is_expiring() {
        assert!(is_expiring(1_000, 3_600, 1_000 + 3_600 - 60));
        assert!(is_expiring(1_000, 3_600, 1_000 + 3_600 + 10));
    }

    #[test]
    fn test_fresh_tokens_are_not_expiring() {
        assert!(!tokens(Utc::now().timestamp(), 3_600).is_expiring());
        assert!(tokens(Utc::now().timestamp() - 3_600, 3_600).is_expiring());
    }
}
