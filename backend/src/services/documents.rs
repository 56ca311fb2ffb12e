use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{FamilyDocumentRow, ImmediateFamilyRow};
use crate::providers::{ObjectStorage, StorageError};
use shared::{DocumentRef, FamilyDocument};

/// Upload hard limit
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("File exceeds the 5 MiB limit")]
    TooLarge,
    #[error("Document not found")]
    NotFound,
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

fn validate_upload(content_type: &str, size: usize) -> Result<(), DocumentError> {
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(DocumentError::UnsupportedType(content_type.to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(DocumentError::TooLarge);
    }
    Ok(())
}

/// Store a supporting document for a later application submission. The key
/// is namespaced by owner and timestamp so uploads never collide.
pub async fn store_upload(
    storage: &dyn ObjectStorage,
    user_id: &Uuid,
    file_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<DocumentRef, DocumentError> {
    validate_upload(content_type, bytes.len())?;

    let key = format!(
        "welfare/{}/{}-{}",
        user_id,
        Utc::now().timestamp_millis(),
        file_name
    );
    let file_url = storage.put_object(&key, content_type, bytes).await?;

    Ok(DocumentRef {
        file_name: file_name.to_string(),
        file_url,
        file_type: content_type.to_string(),
    })
}

/// Upload and attach a document to one of the caller's family members
pub async fn add_family_document(
    pool: &SqlitePool,
    storage: &dyn ObjectStorage,
    user_id: &Uuid,
    family_member_id: &Uuid,
    file_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<FamilyDocument, DocumentError> {
    // Ownership check: other users' family members are reported absent
    let owned: Option<ImmediateFamilyRow> =
        sqlx::query_as("SELECT * FROM immediate_family WHERE id = ? AND user_id = ?")
            .bind(family_member_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(pool)
            .await?;
    if owned.is_none() {
        return Err(DocumentError::NotFound);
    }

    let stored = store_upload(storage, user_id, file_name, content_type, bytes).await?;

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO family_documents (id, family_member_id, file_name, file_url, file_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(family_member_id.to_string())
    .bind(&stored.file_name)
    .bind(&stored.file_url)
    .bind(&stored.file_type)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(FamilyDocument {
        id,
        family_member_id: *family_member_id,
        file_name: stored.file_name,
        file_url: stored.file_url,
        file_type: stored.file_type,
        created_at: now,
    })
}

pub async fn list_family_documents(
    pool: &SqlitePool,
    user_id: &Uuid,
    family_member_id: &Uuid,
) -> Result<Vec<FamilyDocument>, DocumentError> {
    let rows: Vec<FamilyDocumentRow> = sqlx::query_as(
        r#"
        SELECT d.* FROM family_documents d
        JOIN immediate_family f ON f.id = d.family_member_id
        WHERE d.family_member_id = ? AND f.user_id = ?
        ORDER BY d.created_at
        "#,
    )
    .bind(family_member_id.to_string())
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

/// Remove the document record. The stored blob is owned by the external
/// storage provider and is not cleaned up here.
pub async fn delete_family_document(
    pool: &SqlitePool,
    user_id: &Uuid,
    document_id: &Uuid,
) -> Result<(), DocumentError> {
    let result = sqlx::query(
        r#"
        DELETE FROM family_documents
        WHERE id = ? AND family_member_id IN (SELECT id FROM immediate_family WHERE user_id = ?)
        "#,
    )
    .bind(document_id.to_string())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DocumentError::NotFound);
    }

    Ok(())
}
