use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for voting campaigns
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VotingCampaignRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl VotingCampaignRow {
    pub fn to_shared(&self) -> shared::VotingCampaign {
        shared::VotingCampaign {
            id: Uuid::parse_str(&self.id).unwrap(),
            title: self.title.clone(),
            description: self.description.clone(),
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            created_by: Uuid::parse_str(&self.created_by).unwrap(),
            created_at: self.created_at,
        }
    }
}

/// Database model for campaign candidates
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CandidateRow {
    pub id: String,
    pub campaign_id: String,
    pub name: String,
    pub manifesto: Option<String>,
}

impl CandidateRow {
    pub fn to_shared(&self) -> shared::Candidate {
        shared::Candidate {
            id: Uuid::parse_str(&self.id).unwrap(),
            campaign_id: Uuid::parse_str(&self.campaign_id).unwrap(),
            name: self.name.clone(),
            manifesto: self.manifesto.clone(),
        }
    }
}
