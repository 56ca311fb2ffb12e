use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a member's immediate family
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ImmediateFamilyRow {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub relationship: String,
    pub phone: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImmediateFamilyRow {
    pub fn to_shared(&self) -> shared::ImmediateFamilyMember {
        shared::ImmediateFamilyMember {
            id: Uuid::parse_str(&self.id).unwrap(),
            user_id: Uuid::parse_str(&self.user_id).unwrap(),
            full_name: self.full_name.clone(),
            relationship: self.relationship.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            id_number: self.id_number.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
