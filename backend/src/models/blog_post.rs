use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for blog posts
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BlogPostRow {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPostRow {
    pub fn to_shared(&self) -> shared::BlogPost {
        shared::BlogPost {
            id: Uuid::parse_str(&self.id).unwrap(),
            author_id: Uuid::parse_str(&self.author_id).unwrap(),
            title: self.title.clone(),
            content: self.content.clone(),
            published: self.published,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
