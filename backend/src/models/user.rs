use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub identity_subject: Option<String>,
    pub role: String,
    pub membership_status: String,
    pub membership_plan: Option<String>,
    pub payment_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_shared(&self) -> shared::User {
        shared::User {
            id: Uuid::parse_str(&self.id).unwrap(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role.parse().unwrap_or(shared::UserRole::Member),
            membership_status: self
                .membership_status
                .parse()
                .unwrap_or(shared::MembershipStatus::Inactive),
            membership_plan: self
                .membership_plan
                .as_deref()
                .and_then(|p| p.parse().ok()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_row_to_shared() {
        let now = Utc::now();
        let id = Uuid::new_v4();

        let row = UserRow {
            id: id.to_string(),
            email: "member@example.com".to_string(),
            full_name: "Test Member".to_string(),
            identity_subject: Some("idp-subject-1".to_string()),
            role: "member".to_string(),
            membership_status: "active".to_string(),
            membership_plan: Some("monthly".to_string()),
            payment_customer_id: None,
            created_at: now,
            updated_at: now,
        };

        let user = row.to_shared();

        assert_eq!(user.id, id);
        assert_eq!(user.email, "member@example.com");
        assert_eq!(user.role, shared::UserRole::Member);
        assert_eq!(user.membership_status, shared::MembershipStatus::Active);
        assert_eq!(user.membership_plan, Some(shared::MembershipPlan::Monthly));
    }

    #[test]
    fn test_user_row_invalid_role_defaults_to_member() {
        let now = Utc::now();

        let row = UserRow {
            id: Uuid::new_v4().to_string(),
            email: "member@example.com".to_string(),
            full_name: "Test Member".to_string(),
            identity_subject: None,
            role: "superuser".to_string(),
            membership_status: "inactive".to_string(),
            membership_plan: None,
            payment_customer_id: None,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(row.to_shared().role, shared::UserRole::Member);
    }
}
