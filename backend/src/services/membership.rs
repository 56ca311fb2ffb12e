use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::UserRow;
use crate::providers::{CheckoutMode, CheckoutSession, PaymentsProvider};
use crate::services::billing::{self, BillingError};
use shared::MembershipPlan;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Membership is already active")]
    AlreadyActive,
    #[error("No active membership to cancel")]
    NotSubscribed,
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl MembershipError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, MembershipError::Billing(e) if e.is_retryable())
    }
}

fn plan_price_cents(config: &Config, plan: MembershipPlan) -> i64 {
    match plan {
        MembershipPlan::Monthly => config.membership_monthly_price_cents,
        MembershipPlan::Annual => config.membership_annual_price_cents,
    }
}

/// Open a subscription checkout for the selected plan. The membership
/// stays inactive until the payment webhook confirms the subscription.
pub async fn subscribe(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    config: &Config,
    user: &UserRow,
    plan: MembershipPlan,
) -> Result<CheckoutSession, MembershipError> {
    if user.membership_status == "active" {
        return Err(MembershipError::AlreadyActive);
    }

    let customer_id = billing::ensure_customer(pool, payments, user).await?;
    let mut metadata = HashMap::new();
    metadata.insert("user_id".to_string(), user.id.clone());
    metadata.insert("plan".to_string(), plan.as_str().to_string());

    let session = billing::open_checkout(
        payments,
        config,
        &customer_id,
        CheckoutMode::Subscription,
        plan_price_cents(config, plan),
        "membership",
        metadata,
    )
    .await?;

    Ok(session)
}

/// Cancel the subscriptions the provider still reports active for this
/// member, then deactivate locally.
pub async fn cancel(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    user: &UserRow,
) -> Result<(), MembershipError> {
    if user.membership_status != "active" {
        return Err(MembershipError::NotSubscribed);
    }
    let Some(ref customer_id) = user.payment_customer_id else {
        return Err(MembershipError::NotSubscribed);
    };

    let subscriptions = payments.list_subscriptions(customer_id).await.map_err(BillingError::from)?;
    for subscription in subscriptions.iter().filter(|s| s.status != "canceled") {
        payments.cancel_subscription(&subscription.id).await.map_err(BillingError::from)?;
    }

    sqlx::query(
        "UPDATE users SET membership_status = 'inactive', membership_plan = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(&user.id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Webhook confirmation of a paid subscription
pub async fn activate_membership(
    pool: &SqlitePool,
    user_id: &Uuid,
    plan: MembershipPlan,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET membership_status = 'active', membership_plan = ?, updated_at = ? WHERE id = ?",
    )
    .bind(plan.as_str())
    .bind(Utc::now())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Webhook notification that the provider ended a subscription
pub async fn deactivate_by_customer(
    pool: &SqlitePool,
    customer_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET membership_status = 'inactive', membership_plan = NULL, updated_at = ? WHERE payment_customer_id = ?",
    )
    .bind(Utc::now())
    .bind(customer_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::get_user_row;
    use crate::services::billing::test_support::MockPayments;
    use crate::services::welfare::test_support::{insert_user, operational_config, setup_welfare_db};

    #[tokio::test]
    async fn test_subscribe_opens_subscription_checkout() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let session = subscribe(&pool, &payments, &config, &user, MembershipPlan::Monthly)
            .await
            .unwrap();
        assert!(!session.url.is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_rejected_when_already_active() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let user_id = Uuid::parse_str(&user.id).unwrap();
        activate_membership(&pool, &user_id, MembershipPlan::Annual).await.unwrap();
        let user = get_user_row(&pool, &user_id).await.unwrap().unwrap();

        let result = subscribe(&pool, &payments, &config, &user, MembershipPlan::Monthly).await;
        assert!(matches!(result, Err(MembershipError::AlreadyActive)));
    }

    #[tokio::test]
    async fn test_activation_and_cancel_round() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments {
            subscriptions: vec![
                crate::providers::Subscription {
                    id: "sub_live".to_string(),
                    status: "active".to_string(),
                },
                crate::providers::Subscription {
                    id: "sub_old".to_string(),
                    status: "canceled".to_string(),
                },
            ],
            ..MockPayments::default()
        };
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        // Subscribing lazily creates the provider customer
        subscribe(&pool, &payments, &config, &user, MembershipPlan::Monthly).await.unwrap();
        activate_membership(&pool, &user_id, MembershipPlan::Monthly).await.unwrap();

        let user = get_user_row(&pool, &user_id).await.unwrap().unwrap();
        assert_eq!(user.membership_status, "active");
        assert_eq!(user.membership_plan.as_deref(), Some("monthly"));

        cancel(&pool, &payments, &user).await.unwrap();

        // Only the live subscription is cancelled at the provider
        assert_eq!(*payments.cancelled.lock().unwrap(), vec!["sub_live".to_string()]);

        let user = get_user_row(&pool, &user_id).await.unwrap().unwrap();
        assert_eq!(user.membership_status, "inactive");
        assert!(user.membership_plan.is_none());
    }

    #[tokio::test]
    async fn test_cancel_without_subscription() {
        let pool = setup_welfare_db().await;
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let result = cancel(&pool, &payments, &user).await;
        assert!(matches!(result, Err(MembershipError::NotSubscribed)));
    }

    #[tokio::test]
    async fn test_deactivate_by_customer() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        subscribe(&pool, &payments, &config, &user, MembershipPlan::Monthly).await.unwrap();
        activate_membership(&pool, &user_id, MembershipPlan::Monthly).await.unwrap();

        let user = get_user_row(&pool, &user_id).await.unwrap().unwrap();
        let customer_id = user.payment_customer_id.clone().unwrap();

        assert!(deactivate_by_customer(&pool, &customer_id).await.unwrap());
        assert!(!deactivate_by_customer(&pool, "cus_unknown").await.unwrap());

        let user = get_user_row(&pool, &user_id).await.unwrap().unwrap();
        assert_eq!(user.membership_status, "inactive");
    }
}
