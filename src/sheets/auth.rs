//! Service-account token exchange for the spreadsheet backend.
//!
//! RS256 JWT grant: sign a short-lived assertion with the account's PEM
//! key, swap it for a bearer token at the token endpoint, and cache the
//! token until shortly before expiry.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Result, ScribeError};

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Refresh this many seconds before the reported expiry.
const EXPIRY_SLACK_SECS: i64 = 60;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Caching access-token provider for one service account.
pub struct TokenProvider {
    client_email: String,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Build a provider from the service-account identity. Fails eagerly
    /// on an unparseable key; that is a configuration problem, not a
    /// runtime one.
    pub fn new(client_email: &str, private_key_pem: &str) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| ScribeError::Configuration(format!("invalid service-account key: {e}")))?;
        Ok(TokenProvider {
            client_email: client_email.to_string(),
            encoding_key,
            http: reqwest::Client::new(),
            token_uri: TOKEN_URI.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// A valid bearer token, from cache when fresh.
    pub async fn token(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let mut cached = self.cached.lock().await;
        if let Some(t) = cached.as_ref() {
            if t.expires_at - EXPIRY_SLACK_SECS > now {
                return Ok(t.token.clone());
            }
        }

        let claims = Claims {
            iss: &self.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| ScribeError::Configuration(format!("failed to sign token grant: {e}")))?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ScribeError::RemoteWrite(format!("token endpoint unreachable: {e}")))?;
        if !response.status().is_success() {
            return Err(ScribeError::RemoteWrite(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ScribeError::RemoteWrite(format!("malformed token response: {e}")))?;

        let token = body.access_token.clone();
        *cached = Some(CachedToken {
            token: body.access_token,
            expires_at: now + body.expires_in,
        });
        Ok(token)
    }
}
