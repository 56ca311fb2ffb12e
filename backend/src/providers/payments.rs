use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection-class failures are retried this many times; provider
/// rejections are surfaced immediately
const MAX_CONNECT_RETRIES: u32 = 2;

#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("Payments provider unreachable: {0}")]
    Unavailable(String),
    #[error("Payments provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected payments provider response: {0}")]
    Malformed(String),
}

impl PaymentsError {
    /// Only connection-class failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentsError::Unavailable(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub mode: CheckoutMode,
    pub amount_cents: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentsProvider: Send + Sync {
    /// Create a customer record keyed by email, returning the provider's id
    async fn create_customer(&self, email: &str, name: &str) -> Result<String, PaymentsError>;

    /// Open a checkout session and return its redirect URL
    async fn create_checkout(&self, request: &CheckoutRequest)
        -> Result<CheckoutSession, PaymentsError>;

    async fn list_subscriptions(&self, customer_id: &str)
        -> Result<Vec<Subscription>, PaymentsError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentsError>;
}

/// Run a payments call with bounded retry: connection-class errors only,
/// linear backoff (1s * attempt), everything else surfaces immediately
pub(crate) async fn with_connect_retry<T, F, Fut>(mut call: F) -> Result<T, PaymentsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PaymentsError>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Err(e) if e.is_retryable() && attempt < MAX_CONNECT_RETRIES => {
                attempt += 1;
                log::warn!("Payments call failed ({}), retry {} of {}", e, attempt, MAX_CONNECT_RETRIES);
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
            }
            other => return other,
        }
    }
}

/// HTTP implementation of the payments provider
pub struct HttpPayments {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CreateCustomerResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ListSubscriptionsResponse {
    data: Vec<Subscription>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
}

impl HttpPayments {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self { client, base_url, api_key }
    }

    fn classify(err: reqwest::Error) -> PaymentsError {
        if err.is_connect() || err.is_timeout() {
            PaymentsError::Unavailable(err.to_string())
        } else {
            PaymentsError::Malformed(err.to_string())
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PaymentsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ProviderErrorBody>().await {
            Ok(body) => body.message.unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        Err(PaymentsError::Rejected { status: status.as_u16(), message })
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PaymentsError> {
        let url = format!("{}{}", self.base_url, path);
        with_connect_retry(|| async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await
                .map_err(Self::classify)?;
            Self::check(response)
                .await?
                .json::<T>()
                .await
                .map_err(|e| PaymentsError::Malformed(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl PaymentsProvider for HttpPayments {
    async fn create_customer(&self, email: &str, name: &str) -> Result<String, PaymentsError> {
        let body = serde_json::json!({ "email": email, "name": name });
        let created: CreateCustomerResponse = self.post_json("/v1/customers", &body).await?;
        Ok(created.id)
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentsError> {
        self.post_json("/v1/checkout/sessions", request).await
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<Subscription>, PaymentsError> {
        let url = format!("{}/v1/subscriptions?customer={}", self.base_url, customer_id);
        let listed: ListSubscriptionsResponse = with_connect_retry(|| async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(Self::classify)?;
            Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| PaymentsError::Malformed(e.to_string()))
        })
        .await?;
        Ok(listed.data)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentsError> {
        let url = format!("{}/v1/subscriptions/{}", self.base_url, subscription_id);
        with_connect_retry(|| async {
            let response = self
                .client
                .delete(&url)
                .bearer_auth(&self.api_key)
                .send()
                .await
                .map_err(Self::classify)?;
            Self::check(response).await.map(|_| ())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_recovers_from_connection_errors() {
        let calls = AtomicU32::new(0);

        let result = with_connect_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(PaymentsError::Unavailable("connection refused".to_string()))
                } else {
                    Ok("session")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "session");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_two_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_connect_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(PaymentsError::Unavailable("connection refused".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(PaymentsError::Unavailable(_))));
        // 1 initial call + 2 retries
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejections_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_connect_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(PaymentsError::Rejected {
                    status: 400,
                    message: "email already in use".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(PaymentsError::Rejected { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PaymentsError::Unavailable("x".to_string()).is_retryable());
        assert!(!PaymentsError::Rejected { status: 502, message: "x".to_string() }.is_retryable());
        assert!(!PaymentsError::Malformed("x".to_string()).is_retryable());
    }
}
