// IAM token types and expiry checks

use serde::Deserialize;

/// Default IAM token endpoint
pub const DEFAULT_IAM_URL: &str = "https://iam.ng.bluemix.net/identity/token";

/// Fraction of the declared TTL after which a token is renewed ahead of its
/// hard expiration
const FRACTION_OF_TTL: f64 = 0.8;

/// Window after the access-token expiration during which the stored refresh
/// token is still trusted for renewal; past it, renewal falls back to a full
/// API-key exchange
const REFRESH_TOKEN_GRACE_SECS: i64 = 7 * 24 * 3600;

/// Token data as returned by the IAM identity endpoint, hence the snake_case
/// field names. All five fields are required: a response missing any of them
/// fails deserialization and is never cached.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenInfo {
    /// The bearer token presented to service endpoints
    pub access_token: String,
    /// Opaque token used to renew the access token without the API key
    pub refresh_token: String,
    /// Usually "Bearer", informational
    pub token_type: String,
    /// Server-declared lifetime of the access token in seconds
    pub expires_in: i64,
    /// Absolute Unix timestamp (seconds) at which the server expires the token
    pub expiration: i64,
}

impl TokenInfo {
    /// Check whether the access token should be renewed.
    ///
    /// Uses a buffer to prevent the edge case of the token expiring before
    /// the request could be made: the token counts as expired once 80% of its
    /// TTL has elapsed relative to the server's stated expiration instant.
    pub fn is_expired(&self, now: i64) -> bool {
        if self.expires_in == 0 || self.expiration == 0 {
            return true;
        }
        let refresh_time =
            self.expiration as f64 - self.expires_in as f64 * (1.0 - FRACTION_OF_TTL);
        refresh_time < now as f64
    }

    /// Fail-safe for the refresh token itself aging out: true once the stored
    /// expiration lies more than seven days in the past. The manager then
    /// abandons the refresh grant and performs a full API-key exchange.
    pub fn is_refresh_token_expired(&self, now: i64) -> bool {
        if self.expiration == 0 {
            return true;
        }
        self.expiration.saturating_add(REFRESH_TOKEN_GRACE_SECS) < now
    }
}
