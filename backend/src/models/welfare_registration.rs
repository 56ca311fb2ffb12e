use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for welfare fund registrations
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WelfareRegistrationRow {
    pub id: String,
    pub user_id: String,
    pub registration_fee_cents: i64,
    pub payment_status: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl WelfareRegistrationRow {
    pub fn to_shared(&self) -> shared::WelfareRegistration {
        shared::WelfareRegistration {
            id: Uuid::parse_str(&self.id).unwrap(),
            user_id: Uuid::parse_str(&self.user_id).unwrap(),
            registration_fee_cents: self.registration_fee_cents,
            payment_status: self
                .payment_status
                .parse()
                .unwrap_or(shared::PaymentStatus::Pending),
            status: self
                .status
                .parse()
                .unwrap_or(shared::RegistrationStatus::Inactive),
            created_at: self.created_at,
            paid_at: self.paid_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_row_to_shared() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let row = WelfareRegistrationRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            registration_fee_cents: 20_000,
            payment_status: "paid".to_string(),
            status: "inactive".to_string(),
            created_at: now,
            paid_at: Some(now),
        };

        let registration = row.to_shared();

        assert_eq!(registration.id, id);
        assert_eq!(registration.user_id, user_id);
        assert_eq!(registration.registration_fee_cents, 20_000);
        assert_eq!(registration.payment_status, shared::PaymentStatus::Paid);
        assert_eq!(registration.status, shared::RegistrationStatus::Inactive);
        assert!(registration.paid_at.is_some());
    }
}
