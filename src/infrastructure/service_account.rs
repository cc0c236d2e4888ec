//! Google service-account authentication
//!
//! Exchanges a signed RS256 assertion for an OAuth2 access token
//! (JWT bearer grant) and caches it until shortly before it expires.

use crate::domain::repositories::ledger::{LedgerError, LedgerResult};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

/// Read/write access to spreadsheets
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before their reported expiry
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum ServiceAccountError {
    #[error("unable to read credentials file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid service account JSON: {0}")]
    Parse(String),

    #[error("invalid service account private key: {0}")]
    InvalidKey(String),
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// The parts of a service-account JSON key the token exchange needs
pub struct ServiceAccountKey {
    pub client_email: String,
    pub token_uri: String,
    private_key: Zeroizing<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<REDACTED>")
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, ServiceAccountError> {
        let raw: RawServiceAccountKey =
            serde_json::from_str(json).map_err(|e| ServiceAccountError::Parse(e.to_string()))?;

        if raw.client_email.trim().is_empty() {
            return Err(ServiceAccountError::Parse(
                "client_email is empty".to_string(),
            ));
        }

        let private_key = Zeroizing::new(raw.private_key);
        // Reject unusable keys up front so callers can fall back to another credential
        EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| ServiceAccountError::InvalidKey(e.to_string()))?;

        Ok(Self {
            client_email: raw.client_email,
            token_uri: raw
                .token_uri
                .filter(|uri| !uri.is_empty())
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            private_key,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ServiceAccountError> {
        let path = path.as_ref();
        let json = Zeroizing::new(std::fs::read_to_string(path).map_err(|e| {
            ServiceAccountError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?);
        Self::from_json(&json)
    }

    /// Use a different token endpoint (local test servers)
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    access_token: Zeroizing<String>,
    refresh_at: DateTime<Utc>,
}

/// Access-token source for service-account credentials
pub struct ServiceAccountAuthenticator {
    client: Client,
    key: ServiceAccountKey,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuthenticator {
    pub fn new(client: Client, key: ServiceAccountKey) -> Self {
        Self {
            client,
            key,
            scope: SPREADSHEETS_SCOPE.to_string(),
            cache: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> LedgerResult<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| LedgerError::Auth(format!("Failed to load private key: {}", e)))?;

        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| LedgerError::Auth(format!("Failed to sign assertion: {}", e)))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> LedgerResult<CachedToken> {
        let assertion = self.sign_assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| LedgerError::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Auth(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Auth(format!("Invalid token response: {}", e)))?;

        let lifetime = (token.expires_in - REFRESH_MARGIN_SECS).max(0);
        Ok(CachedToken {
            access_token: Zeroizing::new(token.access_token),
            refresh_at: now + Duration::seconds(lifetime),
        })
    }

    /// A valid bearer token, fetching a new one when the cached token is stale
    pub async fn access_token(&self) -> LedgerResult<String> {
        let now = Utc::now();
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if now < cached.refresh_at {
                return Ok(cached.access_token.to_string());
            }
        }

        debug!(
            "Requesting access token for {} from {}",
            self.key.client_email, self.key.token_uri
        );
        let fresh = self.exchange(now).await?;
        let token = fresh.access_token.to_string();
        *cache = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pub.pem");

    fn key_json(private_key: &str) -> String {
        serde_json::json!({
            "type": "service_account",
            "client_email": "tracker@example.iam.gserviceaccount.com",
            "private_key": private_key,
            "token_uri": "https://oauth2.example.test/token",
        })
        .to_string()
    }

    #[test]
    fn test_parse_service_account_key() {
        let key = ServiceAccountKey::from_json(&key_json(TEST_KEY)).unwrap();
        assert_eq!(key.client_email, "tracker@example.iam.gserviceaccount.com");
        assert_eq!(key.token_uri, "https://oauth2.example.test/token");
    }

    #[test]
    fn test_missing_token_uri_uses_google_default() {
        let json = serde_json::json!({
            "client_email": "tracker@example.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
        })
        .to_string();
        let key = ServiceAccountKey::from_json(&json).unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_invalid_private_key_is_rejected() {
        let result = ServiceAccountKey::from_json(&key_json("not a pem"));
        assert!(matches!(result, Err(ServiceAccountError::InvalidKey(_))));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let result = ServiceAccountKey::from_json("{\"client_email\": 42}");
        assert!(matches!(result, Err(ServiceAccountError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ServiceAccountKey::from_file("/nonexistent/service-account.json");
        assert!(matches!(result, Err(ServiceAccountError::Io { .. })));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let key = ServiceAccountKey::from_json(&key_json(TEST_KEY)).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains("PRIVATE KEY"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn test_assertion_claims() {
        let key = ServiceAccountKey::from_json(&key_json(TEST_KEY)).unwrap();
        let auth = ServiceAccountAuthenticator::new(Client::new(), key);
        let now = Utc::now();
        let assertion = auth.sign_assertion(now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.example.test/token"]);
        let public_key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        let decoded = decode::<AssertionClaims>(&assertion, &public_key, &validation).unwrap();

        assert_eq!(decoded.header.alg, Algorithm::RS256);
        assert_eq!(decoded.claims.iss, "tracker@example.iam.gserviceaccount.com");
        assert_eq!(decoded.claims.scope, SPREADSHEETS_SCOPE);
        assert_eq!(decoded.claims.iat, now.timestamp());
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
    }
}
