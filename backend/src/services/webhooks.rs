use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::services::{donations, events, membership, welfare};
use shared::MembershipPlan;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid webhook signature")]
    InvalidSignature,
    #[error("Malformed webhook payload: {0}")]
    Malformed(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub customer_id: Option<String>,
}

/// Check the hex-encoded HMAC-SHA256 of the raw body against the
/// provider's signature header. Comparison happens inside the MAC so the
/// check is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), WebhookError> {
    let sig_bytes = hex::decode(signature).map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&sig_bytes).map_err(|_| WebhookError::InvalidSignature)
}

fn metadata_uuid(data: &WebhookData, key: &'static str) -> Result<Uuid, WebhookError> {
    let raw = data
        .metadata
        .get(key)
        .ok_or_else(|| WebhookError::Malformed(format!("missing metadata key {key}")))?;
    Uuid::parse_str(raw).map_err(|_| WebhookError::Malformed(format!("metadata key {key} is not a uuid")))
}

/// Dispatch a verified event. Every handler below is idempotent, so a
/// redelivered webhook is harmless. Unknown event types and purposes are
/// acknowledged and logged rather than bounced, the provider would retry
/// them forever otherwise.
pub async fn handle_event(pool: &SqlitePool, event: &WebhookEvent) -> Result<(), WebhookError> {
    match event.event_type.as_str() {
        "checkout.session.completed" => handle_checkout_completed(pool, &event.data).await,
        "customer.subscription.deleted" => {
            let customer_id = event
                .data
                .customer_id
                .as_deref()
                .ok_or_else(|| WebhookError::Malformed("missing customer_id".to_string()))?;
            let changed = membership::deactivate_by_customer(pool, customer_id).await?;
            if !changed {
                log::warn!("Subscription deleted for unknown customer {}", customer_id);
            }
            Ok(())
        }
        other => {
            log::info!("Ignoring unhandled webhook event type: {}", other);
            Ok(())
        }
    }
}

async fn handle_checkout_completed(
    pool: &SqlitePool,
    data: &WebhookData,
) -> Result<(), WebhookError> {
    let purpose = data.metadata.get("purpose").map(String::as_str).unwrap_or("");

    match purpose {
        "welfare_registration" => {
            let user_id = metadata_uuid(data, "user_id")?;
            if welfare::mark_registration_paid(pool, &user_id).await? {
                log::info!("Welfare registration paid for user {}", user_id);
            }
            Ok(())
        }
        "donation" => {
            let donation_id = metadata_uuid(data, "donation_id")?;
            if donations::complete_donation(pool, &donation_id).await? {
                log::info!("Donation {} completed", donation_id);
            }
            Ok(())
        }
        "event_ticket" => {
            let attendee_id = metadata_uuid(data, "attendee_id")?;
            if events::mark_ticket_paid(pool, &attendee_id).await? {
                log::info!("Event ticket {} paid", attendee_id);
            }
            Ok(())
        }
        "membership" => {
            let user_id = metadata_uuid(data, "user_id")?;
            let plan = data
                .metadata
                .get("plan")
                .and_then(|p| p.parse::<MembershipPlan>().ok())
                .ok_or_else(|| WebhookError::Malformed("missing or invalid plan".to_string()))?;
            membership::activate_membership(pool, &user_id, plan).await?;
            log::info!("Membership activated for user {}", user_id);
            Ok(())
        }
        other => {
            log::info!("Ignoring checkout completion with unknown purpose: {:?}", other);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::get_user_row;
    use crate::services::billing::test_support::MockPayments;
    use crate::services::welfare::test_support::{insert_user, operational_config, setup_welfare_db};

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let signature = sign("whsec", body);

        assert!(verify_signature("whsec", body, &signature).is_ok());
        assert!(verify_signature("wrong", body, &signature).is_err());
        assert!(verify_signature("whsec", b"tampered", &signature).is_err());
        assert!(verify_signature("whsec", body, "not-hex").is_err());
    }

    fn checkout_event(purpose: &str, extra: &[(&str, String)]) -> WebhookEvent {
        let mut metadata = HashMap::new();
        metadata.insert("purpose".to_string(), purpose.to_string());
        for (key, value) in extra {
            metadata.insert((*key).to_string(), value.clone());
        }
        WebhookEvent {
            event_type: "checkout.session.completed".to_string(),
            data: WebhookData { metadata, customer_id: None },
        }
    }

    #[tokio::test]
    async fn test_registration_checkout_marks_paid() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        welfare::register(&pool, &payments, &config, &user).await.unwrap();

        let event = checkout_event("welfare_registration", &[("user_id", user.id.clone())]);
        handle_event(&pool, &event).await.unwrap();
        // Redelivery is a no-op
        handle_event(&pool, &event).await.unwrap();

        let status: String =
            sqlx::query_scalar("SELECT payment_status FROM welfare_registrations WHERE user_id = ?")
                .bind(&user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "paid");
    }

    #[tokio::test]
    async fn test_membership_checkout_activates_plan() {
        let pool = setup_welfare_db().await;
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        let event = checkout_event(
            "membership",
            &[("user_id", user.id.clone()), ("plan", "annual".to_string())],
        );
        handle_event(&pool, &event).await.unwrap();

        let user = get_user_row(&pool, &user_id).await.unwrap().unwrap();
        assert_eq!(user.membership_status, "active");
        assert_eq!(user.membership_plan.as_deref(), Some("annual"));
    }

    #[tokio::test]
    async fn test_unknown_event_type_acknowledged() {
        let pool = setup_welfare_db().await;
        let event = WebhookEvent {
            event_type: "invoice.finalized".to_string(),
            data: WebhookData { metadata: HashMap::new(), customer_id: None },
        };

        assert!(handle_event(&pool, &event).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_metadata_is_malformed() {
        let pool = setup_welfare_db().await;
        let event = checkout_event("welfare_registration", &[]);

        let result = handle_event(&pool, &event).await;
        assert!(matches!(result, Err(WebhookError::Malformed(_))));
    }
}
