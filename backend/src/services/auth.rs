use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UserRow;
use crate::providers::{IdentityError, IdentityProvider, VerifiedIdentity};
use shared::{UpdateProfileRequest, User, UserRole};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identity token is invalid or expired")]
    InvalidToken,
    #[error("Identity provider unavailable")]
    IdentityUnavailable,
    #[error("User not found")]
    UserNotFound,
    #[error("Nothing to update")]
    EmptyUpdate,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Exchange a client-obtained identity token for a local user, creating the
/// user row on first sign-in. Identity is linked by verified email.
pub async fn exchange_session(
    pool: &SqlitePool,
    identity: &dyn IdentityProvider,
    identity_token: &str,
) -> Result<User, AuthError> {
    let verified = identity.verify_token(identity_token).await.map_err(|e| match e {
        IdentityError::InvalidToken => AuthError::InvalidToken,
        IdentityError::Unavailable(_) | IdentityError::Malformed(_) => {
            AuthError::IdentityUnavailable
        }
    })?;

    let existing: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&verified.email)
        .fetch_optional(pool)
        .await?;

    match existing {
        Some(user) => {
            // Store the provider subject on the first verified exchange
            if user.identity_subject.is_none() {
                sqlx::query("UPDATE users SET identity_subject = ?, updated_at = ? WHERE id = ?")
                    .bind(&verified.subject)
                    .bind(Utc::now())
                    .bind(&user.id)
                    .execute(pool)
                    .await?;
            }
            Ok(user.to_shared())
        }
        None => create_from_identity(pool, &verified).await,
    }
}

async fn create_from_identity(
    pool: &SqlitePool,
    verified: &VerifiedIdentity,
) -> Result<User, AuthError> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let full_name = verified.name.clone().unwrap_or_else(|| verified.email.clone());

    sqlx::query(
        r#"
        INSERT INTO users (id, email, full_name, identity_subject, role, membership_status, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'member', 'inactive', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&verified.email)
    .bind(&full_name)
    .bind(&verified.subject)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(User {
        id,
        email: verified.email.clone(),
        full_name,
        role: UserRole::Member,
        membership_status: shared::MembershipStatus::Inactive,
        membership_plan: None,
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_user_by_id(pool: &SqlitePool, user_id: &Uuid) -> Result<Option<User>, AuthError> {
    Ok(get_user_row(pool, user_id).await?.map(|u| u.to_shared()))
}

pub async fn get_user_row(pool: &SqlitePool, user_id: &Uuid) -> Result<Option<UserRow>, AuthError> {
    let user: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Role check used by admin-only handlers
pub async fn is_admin(pool: &SqlitePool, user_id: &Uuid) -> Result<bool, AuthError> {
    let user = get_user_row(pool, user_id).await?.ok_or(AuthError::UserNotFound)?;
    Ok(user.role.parse::<UserRole>().unwrap_or(UserRole::Member).can_manage_applications())
}

/// Profile updates never touch email, which is the identity-provider link
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: &Uuid,
    request: &UpdateProfileRequest,
) -> Result<User, AuthError> {
    let mut user = get_user_row(pool, user_id).await?.ok_or(AuthError::UserNotFound)?;

    let Some(ref full_name) = request.full_name else {
        return Err(AuthError::EmptyUpdate);
    };

    let now = Utc::now();
    user.full_name = full_name.clone();
    user.updated_at = now;

    sqlx::query("UPDATE users SET full_name = ?, updated_at = ? WHERE id = ?")
        .bind(&user.full_name)
        .bind(now)
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    Ok(user.to_shared())
}

pub fn create_jwt(user_id: &Uuid, secret: &str, expiration_hours: i64) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Uuid::parse_str(&token_data.claims.sub).map_err(|_| AuthError::InvalidToken)
}
