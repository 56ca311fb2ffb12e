use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for association events
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ticket_price_cents: i64,
    pub capacity: Option<i64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRow {
    pub fn to_shared(&self) -> shared::Event {
        shared::Event {
            id: Uuid::parse_str(&self.id).unwrap(),
            title: self.title.clone(),
            description: self.description.clone(),
            venue: self.venue.clone(),
            starts_at: self.starts_at,
            ticket_price_cents: self.ticket_price_cents,
            capacity: self.capacity,
            created_by: Uuid::parse_str(&self.created_by).unwrap(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Database model for event attendance (ticket) records
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventAttendeeRow {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

impl EventAttendeeRow {
    pub fn to_shared(&self) -> shared::EventAttendee {
        shared::EventAttendee {
            id: Uuid::parse_str(&self.id).unwrap(),
            event_id: Uuid::parse_str(&self.event_id).unwrap(),
            user_id: Uuid::parse_str(&self.user_id).unwrap(),
            payment_status: self
                .payment_status
                .parse()
                .unwrap_or(shared::PaymentStatus::Pending),
            created_at: self.created_at,
        }
    }
}
