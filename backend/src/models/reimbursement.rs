use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for fund reimbursements owed after a payout
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReimbursementRow {
    pub id: String,
    pub application_id: String,
    pub amount_due_cents: i64,
    pub amount_paid_cents: i64,
    pub due_date: DateTime<Utc>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ReimbursementRow {
    pub fn to_shared(&self) -> shared::Reimbursement {
        shared::Reimbursement {
            id: Uuid::parse_str(&self.id).unwrap(),
            application_id: Uuid::parse_str(&self.application_id).unwrap(),
            amount_due_cents: self.amount_due_cents,
            amount_paid_cents: self.amount_paid_cents,
            due_date: self.due_date,
            status: self
                .status
                .parse()
                .unwrap_or(shared::ReimbursementStatus::Pending),
            paid_at: self.paid_at,
            created_at: self.created_at,
        }
    }
}
