///! Google service-account authentication
///!
///! Signs a JWT with the service account's RSA key and trades it for an
///! OAuth access token, cached until shortly before it expires.
use anyhow::{Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::error::CacheError;

/// Environment variable holding the whole service-account JSON
pub const SERVICE_JSON_ENV: &str = "GOOGLE_SERVICE_JSON";

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Fields used from a service-account key file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse service account JSON")
    }

    /// `GOOGLE_SERVICE_JSON` if set, otherwise the key file
    pub fn from_env_or_file(path: Option<&Path>) -> Result<Self> {
        if let Ok(json) = std::env::var(SERVICE_JSON_ENV) {
            tracing::debug!("Using service account from {}", SERVICE_JSON_ENV);
            return Self::from_json(&json);
        }
        let path = path.context(format!(
            "No service account: set {} or sheets.credentials_path",
            SERVICE_JSON_ENV
        ))?;
        let json = std::fs::read_to_string(path)
            .context(format!("Failed to read service account file: {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    TOKEN_LIFETIME_SECS as u64
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Self {
        Self {
            key,
            client,
            token: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Bearer token, refreshed when missing or about to expire
    pub async fn access_token(&self) -> Result<String, CacheError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() + REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Requesting access token for {}", self.key.client_email);
        let fresh = self.fetch_token().await?;
        let value = fresh.access_token.clone();
        *cached = Some(CachedToken {
            value: fresh.access_token,
            expires_at: Instant::now() + Duration::from_secs(fresh.expires_in),
        });

        Ok(value)
    }

    async fn fetch_token(&self) -> Result<TokenResponse, CacheError> {
        let assertion = sign_assertion(&self.key, chrono::Utc::now().timestamp())?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CacheError::Auth(format!("token endpoint HTTP {}: {}", status, body)));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| CacheError::Auth(format!("invalid token response: {}", e)))
    }
}

/// RS256-signed grant assertion valid for one hour from `now`
fn sign_assertion(key: &ServiceAccountKey, now: i64) -> Result<String, CacheError> {
    let claims = Claims {
        iss: &key.client_email,
        scope: SHEETS_SCOPE,
        aud: &key.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| CacheError::Auth(format!("invalid private key: {}", e)))?;

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| CacheError::Auth(format!("failed to sign assertion: {}", e)))
}
