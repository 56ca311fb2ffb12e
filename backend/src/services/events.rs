use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{EventAttendeeRow, EventRow, UserRow};
use crate::providers::{CheckoutMode, CheckoutSession, PaymentsProvider};
use crate::services::billing::{self, BillingError};
use shared::{CreateEventRequest, Event, EventAttendee, UpdateEventRequest};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event not found")]
    NotFound,
    #[error("Invalid {0}")]
    Validation(&'static str),
    #[error("Already holding a ticket for this event")]
    AlreadyAttending,
    #[error("Event is sold out")]
    SoldOut,
    #[error("Event has already started")]
    AlreadyStarted,
    #[error(transparent)]
    Billing(#[from] BillingError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl EventError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EventError::Billing(e) if e.is_retryable())
    }
}

/// Outcome of a ticket purchase: free events confirm immediately, paid
/// events hand back a checkout session to complete.
pub enum TicketPurchase {
    Confirmed(EventAttendee),
    CheckoutRequired(CheckoutSession),
}

fn validate(title: &str, venue: &str, ticket_price_cents: i64, capacity: Option<i64>) -> Result<(), EventError> {
    if title.trim().is_empty() {
        return Err(EventError::Validation("title"));
    }
    if venue.trim().is_empty() {
        return Err(EventError::Validation("venue"));
    }
    if ticket_price_cents < 0 {
        return Err(EventError::Validation("ticket_price_cents"));
    }
    if capacity.is_some_and(|c| c <= 0) {
        return Err(EventError::Validation("capacity"));
    }
    Ok(())
}

pub async fn create_event(
    pool: &SqlitePool,
    created_by: &Uuid,
    request: &CreateEventRequest,
) -> Result<Event, EventError> {
    validate(&request.title, &request.venue, request.ticket_price_cents, request.capacity)?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO events (id, title, description, venue, starts_at, ticket_price_cents, capacity, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&request.title)
    .bind(&request.description)
    .bind(&request.venue)
    .bind(request.starts_at)
    .bind(request.ticket_price_cents)
    .bind(request.capacity)
    .bind(created_by.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(get_event(pool, &id).await?)
}

pub async fn get_event(pool: &SqlitePool, event_id: &Uuid) -> Result<Event, EventError> {
    let row: Option<EventRow> = sqlx::query_as("SELECT * FROM events WHERE id = ?")
        .bind(event_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| r.to_shared()).ok_or(EventError::NotFound)
}

pub async fn list_events(pool: &SqlitePool) -> Result<Vec<Event>, sqlx::Error> {
    let rows: Vec<EventRow> = sqlx::query_as("SELECT * FROM events ORDER BY starts_at")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

pub async fn update_event(
    pool: &SqlitePool,
    event_id: &Uuid,
    request: &UpdateEventRequest,
) -> Result<Event, EventError> {
    let current = get_event(pool, event_id).await?;

    let title = request.title.clone().unwrap_or(current.title);
    let description = request.description.clone().unwrap_or(current.description);
    let venue = request.venue.clone().unwrap_or(current.venue);
    let starts_at = request.starts_at.unwrap_or(current.starts_at);
    let ticket_price_cents = request.ticket_price_cents.unwrap_or(current.ticket_price_cents);
    let capacity = request.capacity.or(current.capacity);

    validate(&title, &venue, ticket_price_cents, capacity)?;

    sqlx::query(
        r#"
        UPDATE events
        SET title = ?, description = ?, venue = ?, starts_at = ?, ticket_price_cents = ?, capacity = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&title)
    .bind(&description)
    .bind(&venue)
    .bind(starts_at)
    .bind(ticket_price_cents)
    .bind(capacity)
    .bind(Utc::now())
    .bind(event_id.to_string())
    .execute(pool)
    .await?;

    get_event(pool, event_id).await
}

pub async fn delete_event(pool: &SqlitePool, event_id: &Uuid) -> Result<(), EventError> {
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(event_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(EventError::NotFound);
    }
    Ok(())
}

async fn paid_attendee_count(pool: &SqlitePool, event_id: &Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM event_attendees WHERE event_id = ? AND payment_status = 'paid'",
    )
    .bind(event_id.to_string())
    .fetch_one(pool)
    .await
}

/// Take a ticket for an event. Free events confirm on the spot; paid
/// events create a pending attendance record and open a checkout. Only
/// paid tickets count against capacity.
pub async fn purchase_ticket(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    config: &Config,
    user: &UserRow,
    event_id: &Uuid,
) -> Result<TicketPurchase, EventError> {
    let event = get_event(pool, event_id).await?;

    if event.starts_at <= Utc::now() {
        return Err(EventError::AlreadyStarted);
    }

    let existing: Option<EventAttendeeRow> =
        sqlx::query_as("SELECT * FROM event_attendees WHERE event_id = ? AND user_id = ?")
            .bind(event_id.to_string())
            .bind(&user.id)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Err(EventError::AlreadyAttending);
    }

    if let Some(capacity) = event.capacity {
        if paid_attendee_count(pool, event_id).await? >= capacity {
            return Err(EventError::SoldOut);
        }
    }

    let attendee_id = Uuid::new_v4();
    let now = Utc::now();
    let free = event.ticket_price_cents == 0;
    let status = if free { "paid" } else { "pending" };

    let insert = sqlx::query(
        "INSERT INTO event_attendees (id, event_id, user_id, payment_status, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(attendee_id.to_string())
    .bind(event_id.to_string())
    .bind(&user.id)
    .bind(status)
    .bind(now)
    .execute(pool)
    .await;

    if let Err(sqlx::Error::Database(ref db)) = insert {
        if db.is_unique_violation() {
            return Err(EventError::AlreadyAttending);
        }
    }
    insert?;

    if free {
        return Ok(TicketPurchase::Confirmed(EventAttendee {
            id: attendee_id,
            event_id: *event_id,
            user_id: Uuid::parse_str(&user.id).unwrap_or_default(),
            payment_status: shared::PaymentStatus::Paid,
            created_at: now,
        }));
    }

    let customer_id = billing::ensure_customer(pool, payments, user).await?;
    let mut metadata = HashMap::new();
    metadata.insert("attendee_id".to_string(), attendee_id.to_string());
    metadata.insert("user_id".to_string(), user.id.clone());

    let session = billing::open_checkout(
        payments,
        config,
        &customer_id,
        CheckoutMode::Payment,
        event.ticket_price_cents,
        "event_ticket",
        metadata,
    )
    .await?;

    Ok(TicketPurchase::CheckoutRequired(session))
}

/// Webhook confirmation of a ticket payment. Idempotent.
pub async fn mark_ticket_paid(pool: &SqlitePool, attendee_id: &Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE event_attendees SET payment_status = 'paid' WHERE id = ? AND payment_status = 'pending'",
    )
    .bind(attendee_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_attendees(
    pool: &SqlitePool,
    event_id: &Uuid,
) -> Result<Vec<EventAttendee>, sqlx::Error> {
    let rows: Vec<EventAttendeeRow> =
        sqlx::query_as("SELECT * FROM event_attendees WHERE event_id = ? ORDER BY created_at")
            .bind(event_id.to_string())
            .fetch_all(pool)
            .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}
