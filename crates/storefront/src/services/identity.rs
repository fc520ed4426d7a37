//! Hosted identity service client.
//!
//! Sign-in happens in the browser against the identity service; the
//! storefront only verifies the resulting access token by asking the service
//! who it belongs to.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use neonmart_core::UserId;

use crate::config::IdentityConfig;

/// Errors from the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The access token is missing, expired, or revoked.
    #[error("invalid access token")]
    InvalidToken,

    /// The service returned an unexpected status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client configuration or response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

/// The user an access token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Client for the hosted identity service.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    user_endpoint: String,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns error if the anon key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| IdentityError::Parse(format!("invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                user_endpoint: user_endpoint(&config.url),
            }),
        })
    }

    /// Resolve an access token to its user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidToken` if the service rejects the token.
    /// Returns other variants for transport or response failures.
    #[instrument(skip(self, access_token))]
    pub async fn get_user(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .inner
            .client
            .get(&self.inner.user_endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(IdentityError::InvalidToken);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }
}

fn user_endpoint(base: &url::Url) -> String {
    format!("{}/auth/v1/user", base.as_str().trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_endpoint_ignores_trailing_slash() {
        let with = url::Url::parse("https://auth.example.com/").unwrap();
        let nested = url::Url::parse("https://example.com/identity").unwrap();

        assert_eq!(user_endpoint(&with), "https://auth.example.com/auth/v1/user");
        assert_eq!(
            user_endpoint(&nested),
            "https://example.com/identity/auth/v1/user"
        );
    }

    #[test]
    fn test_identity_user_tolerates_extra_fields() {
        let json = r#"{
            "id": "6f1c1f0e-3f7a-4c5e-9c43-2a2a4b9d8e01",
            "email": "shopper@example.com",
            "aud": "authenticated",
            "app_metadata": {}
        }"#;

        let user: IdentityUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.email.as_deref(), Some("shopper@example.com"));
        assert_eq!(
            user.id.to_string(),
            "6f1c1f0e-3f7a-4c5e-9c43-2a2a4b9d8e01"
        );
    }
}
