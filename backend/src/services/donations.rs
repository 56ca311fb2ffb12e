use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{DonationRow, UserRow};
use crate::providers::{CheckoutMode, CheckoutSession, PaymentsProvider};
use crate::services::billing::{self, BillingError};
use shared::Donation;

/// Smallest donation the payment provider will process
const MIN_DONATION_CENTS: i64 = 100;

#[derive(Debug, Error)]
pub enum DonationError {
    #[error("Donation amount must be at least {MIN_DONATION_CENTS} cents")]
    AmountTooSmall,
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl DonationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DonationError::Billing(e) if e.is_retryable())
    }
}

/// Record a pending donation and open a checkout session for it. The
/// donation only counts once the payment webhook confirms it.
pub async fn create_donation(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    config: &Config,
    user: &UserRow,
    amount_cents: i64,
    message: Option<&str>,
) -> Result<(Donation, CheckoutSession), DonationError> {
    if amount_cents < MIN_DONATION_CENTS {
        return Err(DonationError::AmountTooSmall);
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO donations (id, user_id, amount_cents, message, status, created_at) VALUES (?, ?, ?, ?, 'pending', ?)",
    )
    .bind(id.to_string())
    .bind(&user.id)
    .bind(amount_cents)
    .bind(message)
    .bind(now)
    .execute(pool)
    .await?;

    let customer_id = billing::ensure_customer(pool, payments, user).await?;
    let mut metadata = HashMap::new();
    metadata.insert("donation_id".to_string(), id.to_string());
    metadata.insert("user_id".to_string(), user.id.clone());

    let session = billing::open_checkout(
        payments,
        config,
        &customer_id,
        CheckoutMode::Payment,
        amount_cents,
        "donation",
        metadata,
    )
    .await?;

    let donation = Donation {
        id,
        user_id: Uuid::parse_str(&user.id).unwrap_or_default(),
        amount_cents,
        message: message.map(str::to_string),
        status: shared::DonationStatus::Pending,
        created_at: now,
        completed_at: None,
    };

    Ok((donation, session))
}

/// Webhook confirmation. Idempotent, a donation completes at most once.
pub async fn complete_donation(pool: &SqlitePool, donation_id: &Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE donations SET status = 'completed', completed_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(Utc::now())
    .bind(donation_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_for_user(pool: &SqlitePool, user_id: &Uuid) -> Result<Vec<Donation>, sqlx::Error> {
    let rows: Vec<DonationRow> =
        sqlx::query_as("SELECT * FROM donations WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::billing::test_support::MockPayments;
    use crate::services::welfare::test_support::{insert_user, operational_config, setup_welfare_db};

    async fn setup_db() -> SqlitePool {
        let pool = setup_welfare_db().await;
        sqlx::query(
            r#"
            CREATE TABLE donations (
                id TEXT PRIMARY KEY NOT NULL,
                user_id TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                message TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at DATETIME NOT NULL,
                completed_at DATETIME
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_donation_opens_checkout() {
        let pool = setup_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let (donation, session) =
            create_donation(&pool, &payments, &config, &user, 2_500, Some("In memory of"))
                .await
                .unwrap();

        assert_eq!(donation.status, shared::DonationStatus::Pending);
        assert_eq!(donation.amount_cents, 2_500);
        assert!(!session.url.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_amount_below_minimum() {
        let pool = setup_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let result = create_donation(&pool, &payments, &config, &user, 99, None).await;
        assert!(matches!(result, Err(DonationError::AmountTooSmall)));
    }

    #[tokio::test]
    async fn test_complete_donation_is_idempotent() {
        let pool = setup_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let (donation, _) =
            create_donation(&pool, &payments, &config, &user, 500, None).await.unwrap();

        assert!(complete_donation(&pool, &donation.id).await.unwrap());
        assert!(!complete_donation(&pool, &donation.id).await.unwrap());

        let user_id = Uuid::parse_str(&user.id).unwrap();
        let donations = list_for_user(&pool, &user_id).await.unwrap();
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].status, shared::DonationStatus::Completed);
        assert!(donations[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_user() {
        let pool = setup_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        create_donation(&pool, &payments, &config, &user, 500, None).await.unwrap();

        let donations = list_for_user(&pool, &Uuid::new_v4()).await.unwrap();
        assert!(donations.is_empty());
    }
}
