use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::BlogPostRow;
use shared::{BlogPost, CreateBlogPostRequest, UpdateBlogPostRequest};

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Blog post not found")]
    NotFound,
    #[error("Invalid {0}")]
    Validation(&'static str),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn create_post(
    pool: &SqlitePool,
    author_id: &Uuid,
    request: &CreateBlogPostRequest,
) -> Result<BlogPost, BlogError> {
    if request.title.trim().is_empty() {
        return Err(BlogError::Validation("title"));
    }
    if request.content.trim().is_empty() {
        return Err(BlogError::Validation("content"));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        "INSERT INTO blog_posts (id, author_id, title, content, published, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(author_id.to_string())
    .bind(&request.title)
    .bind(&request.content)
    .bind(request.published.unwrap_or(false))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get_owned(pool, &id, author_id).await
}

/// Author-scoped lookup. A post belonging to someone else looks like a
/// missing post to the caller.
async fn get_owned(pool: &SqlitePool, post_id: &Uuid, author_id: &Uuid) -> Result<BlogPost, BlogError> {
    let row: Option<BlogPostRow> =
        sqlx::query_as("SELECT * FROM blog_posts WHERE id = ? AND author_id = ?")
            .bind(post_id.to_string())
            .bind(author_id.to_string())
            .fetch_optional(pool)
            .await?;

    row.map(|r| r.to_shared()).ok_or(BlogError::NotFound)
}

/// Published posts are public; drafts are only visible to their author.
pub async fn get_post(
    pool: &SqlitePool,
    post_id: &Uuid,
    reader_id: Option<&Uuid>,
) -> Result<BlogPost, BlogError> {
    let row: Option<BlogPostRow> = sqlx::query_as("SELECT * FROM blog_posts WHERE id = ?")
        .bind(post_id.to_string())
        .fetch_optional(pool)
        .await?;
    let row = row.ok_or(BlogError::NotFound)?;

    if !row.published && reader_id.map(Uuid::to_string).as_deref() != Some(&row.author_id) {
        return Err(BlogError::NotFound);
    }

    Ok(row.to_shared())
}

pub async fn list_published(pool: &SqlitePool) -> Result<Vec<BlogPost>, sqlx::Error> {
    let rows: Vec<BlogPostRow> =
        sqlx::query_as("SELECT * FROM blog_posts WHERE published = 1 ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

pub async fn list_for_author(
    pool: &SqlitePool,
    author_id: &Uuid,
) -> Result<Vec<BlogPost>, sqlx::Error> {
    let rows: Vec<BlogPostRow> =
        sqlx::query_as("SELECT * FROM blog_posts WHERE author_id = ? ORDER BY created_at DESC")
            .bind(author_id.to_string())
            .fetch_all(pool)
            .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

pub async fn update_post(
    pool: &SqlitePool,
    post_id: &Uuid,
    author_id: &Uuid,
    request: &UpdateBlogPostRequest,
) -> Result<BlogPost, BlogError> {
    let current = get_owned(pool, post_id, author_id).await?;

    let title = request.title.clone().unwrap_or(current.title);
    let content = request.content.clone().unwrap_or(current.content);
    let published = request.published.unwrap_or(current.published);

    if title.trim().is_empty() {
        return Err(BlogError::Validation("title"));
    }
    if content.trim().is_empty() {
        return Err(BlogError::Validation("content"));
    }

    sqlx::query(
        "UPDATE blog_posts SET title = ?, content = ?, published = ?, updated_at = ? WHERE id = ? AND author_id = ?",
    )
    .bind(&title)
    .bind(&content)
    .bind(published)
    .bind(Utc::now())
    .bind(post_id.to_string())
    .bind(author_id.to_string())
    .execute(pool)
    .await?;

    get_owned(pool, post_id, author_id).await
}

pub async fn delete_post(
    pool: &SqlitePool,
    post_id: &Uuid,
    author_id: &Uuid,
) -> Result<(), BlogError> {
    let result = sqlx::query("DELETE FROM blog_posts WHERE id = ? AND author_id = ?")
        .bind(post_id.to_string())
        .bind(author_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BlogError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::welfare::test_support::{insert_user, setup_welfare_db};

    async fn setup_db() -> SqlitePool {
        let pool = setup_welfare_db().await;
        sqlx::query(
            r#"
            CREATE TABLE blog_posts (
                id TEXT PRIMARY KEY NOT NULL,
                author_id TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                published INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    fn draft() -> CreateBlogPostRequest {
        CreateBlogPostRequest {
            title: "Fund update".to_string(),
            content: "The fund reached its first milestone.".to_string(),
            published: None,
        }
    }

    #[tokio::test]
    async fn test_draft_hidden_from_other_readers() {
        let pool = setup_db().await;
        let author = insert_user(&pool).await;
        let author_id = Uuid::parse_str(&author.id).unwrap();

        let post = create_post(&pool, &author_id, &draft()).await.unwrap();
        assert!(!post.published);

        // Author still sees their draft
        assert!(get_post(&pool, &post.id, Some(&author_id)).await.is_ok());

        let stranger = Uuid::new_v4();
        let result = get_post(&pool, &post.id, Some(&stranger)).await;
        assert!(matches!(result, Err(BlogError::NotFound)));

        let anonymous = get_post(&pool, &post.id, None).await;
        assert!(matches!(anonymous, Err(BlogError::NotFound)));
    }

    #[tokio::test]
    async fn test_publish_makes_post_public() {
        let pool = setup_db().await;
        let author = insert_user(&pool).await;
        let author_id = Uuid::parse_str(&author.id).unwrap();

        let post = create_post(&pool, &author_id, &draft()).await.unwrap();
        assert!(list_published(&pool).await.unwrap().is_empty());

        update_post(
            &pool,
            &post.id,
            &author_id,
            &UpdateBlogPostRequest { title: None, content: None, published: Some(true) },
        )
        .await
        .unwrap();

        let published = list_published(&pool).await.unwrap();
        assert_eq!(published.len(), 1);
        assert!(get_post(&pool, &post.id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_cross_author_update_looks_like_missing_post() {
        let pool = setup_db().await;
        let author = insert_user(&pool).await;
        let author_id = Uuid::parse_str(&author.id).unwrap();
        let other = insert_user(&pool).await;
        let other_id = Uuid::parse_str(&other.id).unwrap();

        let post = create_post(&pool, &author_id, &draft()).await.unwrap();

        let update = update_post(
            &pool,
            &post.id,
            &other_id,
            &UpdateBlogPostRequest {
                title: Some("Hijacked".to_string()),
                content: None,
                published: None,
            },
        )
        .await;
        assert!(matches!(update, Err(BlogError::NotFound)));

        let delete = delete_post(&pool, &post.id, &other_id).await;
        assert!(matches!(delete, Err(BlogError::NotFound)));
    }

    #[tokio::test]
    async fn test_validation_rejects_blank_title() {
        let pool = setup_db().await;
        let author = insert_user(&pool).await;
        let author_id = Uuid::parse_str(&author.id).unwrap();

        let mut request = draft();
        request.title = "  ".to_string();

        let result = create_post(&pool, &author_id, &request).await;
        assert!(matches!(result, Err(BlogError::Validation("title"))));
    }
}
