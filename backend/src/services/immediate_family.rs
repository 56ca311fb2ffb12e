use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ImmediateFamilyRow;
use shared::{CreateFamilyMemberRequest, ImmediateFamilyMember, UpdateFamilyMemberRequest};

#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("Family member not found")]
    NotFound,
    #[error("Invalid {0}")]
    Validation(&'static str),
    #[error("A paid registration must retain at least one family member")]
    LastMember,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Minimal structural email check, applied only when an email is supplied
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

fn validate(
    full_name: &str,
    relationship: &str,
    phone: &str,
    email: Option<&str>,
) -> Result<(), FamilyError> {
    if full_name.trim().is_empty() {
        return Err(FamilyError::Validation("full_name"));
    }
    if relationship.trim().is_empty() {
        return Err(FamilyError::Validation("relationship"));
    }
    if phone.trim().is_empty() {
        return Err(FamilyError::Validation("phone"));
    }
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(FamilyError::Validation("email"));
        }
    }
    Ok(())
}

pub async fn list_family_members(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<Vec<ImmediateFamilyMember>, FamilyError> {
    let rows: Vec<ImmediateFamilyRow> =
        sqlx::query_as("SELECT * FROM immediate_family WHERE user_id = ? ORDER BY created_at")
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

/// Fetch a family member scoped to its owner. Rows owned by other users are
/// reported as absent, not forbidden.
async fn get_owned(
    pool: &SqlitePool,
    user_id: &Uuid,
    member_id: &Uuid,
) -> Result<ImmediateFamilyRow, FamilyError> {
    let row: Option<ImmediateFamilyRow> =
        sqlx::query_as("SELECT * FROM immediate_family WHERE id = ? AND user_id = ?")
            .bind(member_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?;

    row.ok_or(FamilyError::NotFound)
}

pub async fn add_family_member(
    pool: &SqlitePool,
    user_id: &Uuid,
    request: &CreateFamilyMemberRequest,
) -> Result<ImmediateFamilyMember, FamilyError> {
    validate(
        &request.full_name,
        &request.relationship,
        &request.phone,
        request.email.as_deref(),
    )?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO immediate_family (id, user_id, full_name, relationship, phone, email, id_number, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(&request.full_name)
    .bind(&request.relationship)
    .bind(&request.phone)
    .bind(&request.email)
    .bind(&request.id_number)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(ImmediateFamilyMember {
        id,
        user_id: *user_id,
        full_name: request.full_name.clone(),
        relationship: request.relationship.clone(),
        phone: request.phone.clone(),
        email: request.email.clone(),
        id_number: request.id_number.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn update_family_member(
    pool: &SqlitePool,
    user_id: &Uuid,
    member_id: &Uuid,
    request: &UpdateFamilyMemberRequest,
) -> Result<ImmediateFamilyMember, FamilyError> {
    let mut row = get_owned(pool, user_id, member_id).await?;

    if let Some(ref full_name) = request.full_name {
        row.full_name = full_name.clone();
    }
    if let Some(ref relationship) = request.relationship {
        row.relationship = relationship.clone();
    }
    if let Some(ref phone) = request.phone {
        row.phone = phone.clone();
    }
    if let Some(ref email) = request.email {
        row.email = Some(email.clone());
    }
    if let Some(ref id_number) = request.id_number {
        row.id_number = Some(id_number.clone());
    }

    validate(&row.full_name, &row.relationship, &row.phone, row.email.as_deref())?;

    row.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE immediate_family
        SET full_name = ?, relationship = ?, phone = ?, email = ?, id_number = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&row.full_name)
    .bind(&row.relationship)
    .bind(&row.phone)
    .bind(&row.email)
    .bind(&row.id_number)
    .bind(row.updated_at)
    .bind(member_id.to_string())
    .execute(pool)
    .await?;

    Ok(row.to_shared())
}

/// Delete a family member. A user with a paid registration must keep at
/// least one family member on file.
pub async fn delete_family_member(
    pool: &SqlitePool,
    user_id: &Uuid,
    member_id: &Uuid,
) -> Result<(), FamilyError> {
    get_owned(pool, user_id, member_id).await?;

    let registration_paid: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM welfare_registrations WHERE user_id = ? AND payment_status = 'paid'",
    )
    .bind(user_id.to_string())
    .fetch_one(pool)
    .await?;

    if registration_paid > 0 {
        let family_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM immediate_family WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(pool)
                .await?;

        if family_count <= 1 {
            return Err(FamilyError::LastMember);
        }
    }

    sqlx::query("DELETE FROM immediate_family WHERE id = ?")
        .bind(member_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}
