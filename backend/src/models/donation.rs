use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for donations
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DonationRow {
    pub id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DonationRow {
    pub fn to_shared(&self) -> shared::Donation {
        shared::Donation {
            id: Uuid::parse_str(&self.id).unwrap(),
            user_id: Uuid::parse_str(&self.user_id).unwrap(),
            amount_cents: self.amount_cents,
            message: self.message.clone(),
            status: self.status.parse().unwrap_or(shared::DonationStatus::Pending),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}
