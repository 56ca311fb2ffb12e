use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity provider unreachable: {0}")]
    Unavailable(String),
    #[error("Identity token is invalid or expired")]
    InvalidToken,
    #[error("Unexpected identity provider response: {0}")]
    Malformed(String),
}

/// The verified identity the provider vouches for
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange a client-obtained identity token for a verified identity
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;
}

/// HTTP implementation of the identity provider
pub struct HttpIdentity {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentity {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentity {
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let url = format!("{}/v1/tokens/verify", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    IdentityError::Unavailable(e.to_string())
                } else {
                    IdentityError::Malformed(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IdentityError::InvalidToken);
        }
        if !status.is_success() {
            return Err(IdentityError::Malformed(format!("status {}", status)));
        }

        response
            .json::<VerifiedIdentity>()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))
    }
}
