use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for documents attached to a family member
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FamilyDocumentRow {
    pub id: String,
    pub family_member_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
}

impl FamilyDocumentRow {
    pub fn to_shared(&self) -> shared::FamilyDocument {
        shared::FamilyDocument {
            id: Uuid::parse_str(&self.id).unwrap(),
            family_member_id: Uuid::parse_str(&self.family_member_id).unwrap(),
            file_name: self.file_name.clone(),
            file_url: self.file_url.clone(),
            file_type: self.file_type.clone(),
            created_at: self.created_at,
        }
    }
}
