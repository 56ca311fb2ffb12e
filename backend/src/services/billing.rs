use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::Config;
use crate::models::UserRow;
use crate::providers::{CheckoutMode, CheckoutRequest, CheckoutSession, PaymentsError, PaymentsProvider};

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Payments provider error: {0}")]
    Payments(#[from] PaymentsError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl BillingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BillingError::Payments(e) if e.is_retryable())
    }
}

/// Return the user's payment customer id, creating the provider-side
/// customer record lazily on first use
pub async fn ensure_customer(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    user: &UserRow,
) -> Result<String, BillingError> {
    if let Some(ref customer_id) = user.payment_customer_id {
        return Ok(customer_id.clone());
    }

    let customer_id = payments.create_customer(&user.email, &user.full_name).await?;

    sqlx::query("UPDATE users SET payment_customer_id = ?, updated_at = ? WHERE id = ?")
        .bind(&customer_id)
        .bind(Utc::now())
        .bind(&user.id)
        .execute(pool)
        .await?;

    Ok(customer_id)
}

/// Open a checkout session for a fixed amount, tagging it with a purpose so
/// the webhook consumer can route the completion
pub async fn open_checkout(
    payments: &dyn PaymentsProvider,
    config: &Config,
    customer_id: &str,
    mode: CheckoutMode,
    amount_cents: i64,
    purpose: &str,
    metadata: HashMap<String, String>,
) -> Result<CheckoutSession, BillingError> {
    let mut metadata = metadata;
    metadata.insert("purpose".to_string(), purpose.to_string());

    let request = CheckoutRequest {
        customer_id: customer_id.to_string(),
        mode,
        amount_cents,
        currency: config.currency.clone(),
        success_url: config.checkout_success_url.clone(),
        cancel_url: config.checkout_cancel_url.clone(),
        metadata,
    };

    let session = payments.create_checkout(&request).await?;
    log::debug!("Opened checkout session {} for {}", session.id, purpose);
    Ok(session)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::providers::Subscription;

    /// Recording payments mock used across service tests
    pub struct MockPayments {
        pub customers_created: Mutex<u32>,
        pub checkouts: Mutex<Vec<CheckoutRequest>>,
        pub cancelled: Mutex<Vec<String>>,
        pub subscriptions: Vec<Subscription>,
        pub fail_with: Option<fn() -> PaymentsError>,
    }

    impl Default for MockPayments {
        fn default() -> Self {
            Self {
                customers_created: Mutex::new(0),
                checkouts: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
                subscriptions: Vec::new(),
                fail_with: None,
            }
        }
    }

    #[async_trait]
    impl PaymentsProvider for MockPayments {
        async fn create_customer(&self, _email: &str, _name: &str) -> Result<String, PaymentsError> {
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            let mut count = self.customers_created.lock().unwrap();
            *count += 1;
            Ok(format!("cus_{}", count))
        }

        async fn create_checkout(
            &self,
            request: &CheckoutRequest,
        ) -> Result<CheckoutSession, PaymentsError> {
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            self.checkouts.lock().unwrap().push(request.clone());
            Ok(CheckoutSession {
                id: "cs_test".to_string(),
                url: "https://checkout.example/cs_test".to_string(),
            })
        }

        async fn list_subscriptions(
            &self,
            _customer_id: &str,
        ) -> Result<Vec<Subscription>, PaymentsError> {
            Ok(self.subscriptions.clone())
        }

        async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), PaymentsError> {
            self.cancelled.lock().unwrap().push(subscription_id.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MockPayments;
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE users (
                id TEXT PRIMARY KEY NOT NULL,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                identity_subject TEXT,
                role TEXT NOT NULL DEFAULT 'member',
                membership_status TEXT NOT NULL DEFAULT 'inactive',
                membership_plan TEXT,
                payment_customer_id TEXT,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    fn user_row(customer_id: Option<&str>) -> UserRow {
        let now = Utc::now();
        UserRow {
            id: Uuid::new_v4().to_string(),
            email: "member@example.com".to_string(),
            full_name: "Member".to_string(),
            identity_subject: None,
            role: "member".to_string(),
            membership_status: "inactive".to_string(),
            membership_plan: None,
            payment_customer_id: customer_id.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_ensure_customer_is_lazy() {
        let pool = setup_test_db().await;
        let payments = MockPayments::default();
        let user = user_row(None);

        sqlx::query(
            "INSERT INTO users (id, email, full_name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&pool)
        .await
        .unwrap();

        let customer_id = ensure_customer(&pool, &payments, &user).await.unwrap();
        assert_eq!(customer_id, "cus_1");

        let stored: Option<String> =
            sqlx::query_scalar("SELECT payment_customer_id FROM users WHERE id = ?")
                .bind(&user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn test_ensure_customer_reuses_existing_id() {
        let pool = setup_test_db().await;
        let payments = MockPayments::default();
        let user = user_row(Some("cus_existing"));

        let customer_id = ensure_customer(&pool, &payments, &user).await.unwrap();

        assert_eq!(customer_id, "cus_existing");
        assert_eq!(*payments.customers_created.lock().unwrap(), 0);
    }
}
