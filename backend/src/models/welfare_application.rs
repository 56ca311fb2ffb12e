use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for welfare applications
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WelfareApplicationRow {
    pub id: String,
    pub user_id: String,
    pub application_type: String,
    pub deceased_name: String,
    pub relation_to_deceased: Option<String>,
    pub reason: String,
    pub status: String,
    pub claim_amount_cents: i64,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub payout_date: Option<DateTime<Utc>>,
}

impl WelfareApplicationRow {
    pub fn to_shared(&self) -> shared::WelfareApplication {
        shared::WelfareApplication {
            id: Uuid::parse_str(&self.id).unwrap(),
            user_id: Uuid::parse_str(&self.user_id).unwrap(),
            application_type: self
                .application_type
                .parse()
                .unwrap_or(shared::ApplicationType::FamilyDeath),
            deceased_name: self.deceased_name.clone(),
            relation_to_deceased: self.relation_to_deceased.clone(),
            reason: self.reason.clone(),
            status: self.status.parse().unwrap_or(shared::ApplicationStatus::Pending),
            claim_amount_cents: self.claim_amount_cents,
            rejection_reason: self.rejection_reason.clone(),
            created_at: self.created_at,
            approved_at: self.approved_at,
            rejected_at: self.rejected_at,
            payout_date: self.payout_date,
        }
    }
}

/// Database model for supporting documents on an application
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApplicationDocumentRow {
    pub id: String,
    pub application_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
}

impl ApplicationDocumentRow {
    pub fn to_shared(&self) -> shared::ApplicationDocument {
        shared::ApplicationDocument {
            id: Uuid::parse_str(&self.id).unwrap(),
            application_id: Uuid::parse_str(&self.application_id).unwrap(),
            file_name: self.file_name.clone(),
            file_url: self.file_url.clone(),
            file_type: self.file_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_row_to_shared() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let row = WelfareApplicationRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            application_type: "member_death".to_string(),
            deceased_name: "John Doe".to_string(),
            relation_to_deceased: None,
            reason: "Funeral costs".to_string(),
            status: "approved".to_string(),
            claim_amount_cents: 800_000,
            rejection_reason: None,
            created_at: now,
            approved_at: Some(now),
            rejected_at: None,
            payout_date: None,
        };

        let application = row.to_shared();

        assert_eq!(application.id, id);
        assert_eq!(application.user_id, user_id);
        assert_eq!(application.application_type, shared::ApplicationType::MemberDeath);
        assert_eq!(application.status, shared::ApplicationStatus::Approved);
        assert_eq!(application.claim_amount_cents, 800_000);
    }
}
