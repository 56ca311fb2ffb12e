use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CandidateRow, UserRow, VotingCampaignRow};
use shared::{CampaignWithCandidates, CandidateWithVotes, CreateCampaignRequest, VotingCampaign};

/// A ballot needs at least two options to be meaningful
const MIN_CANDIDATES: usize = 2;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("Campaign not found")]
    CampaignNotFound,
    #[error("Candidate not found in this campaign")]
    CandidateNotFound,
    #[error("Invalid {0}")]
    Validation(&'static str),
    #[error("Voting requires an active membership")]
    MembershipRequired,
    #[error("Voting is not open for this campaign")]
    VotingClosed,
    #[error("Already voted in this campaign")]
    AlreadyVoted,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Create a campaign with its candidate slate in one transaction.
pub async fn create_campaign(
    pool: &SqlitePool,
    created_by: &Uuid,
    request: &CreateCampaignRequest,
) -> Result<CampaignWithCandidates, VotingError> {
    if request.title.trim().is_empty() {
        return Err(VotingError::Validation("title"));
    }
    if request.ends_at <= request.starts_at {
        return Err(VotingError::Validation("ends_at"));
    }
    if request.candidates.len() < MIN_CANDIDATES {
        return Err(VotingError::Validation("candidates"));
    }
    if request.candidates.iter().any(|c| c.name.trim().is_empty()) {
        return Err(VotingError::Validation("candidates"));
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO voting_campaigns (id, title, description, starts_at, ends_at, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.starts_at)
    .bind(request.ends_at)
    .bind(created_by.to_string())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for candidate in &request.candidates {
        sqlx::query("INSERT INTO candidates (id, campaign_id, name, manifesto) VALUES (?, ?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(id.to_string())
            .bind(&candidate.name)
            .bind(&candidate.manifesto)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    get_campaign(pool, &id).await
}

async fn candidates_with_tallies(
    pool: &SqlitePool,
    campaign_id: &str,
) -> Result<Vec<CandidateWithVotes>, sqlx::Error> {
    let candidates: Vec<CandidateRow> =
        sqlx::query_as("SELECT * FROM candidates WHERE campaign_id = ?")
            .bind(campaign_id)
            .fetch_all(pool)
            .await?;

    let mut tallied = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE candidate_id = ?")
            .bind(&candidate.id)
            .fetch_one(pool)
            .await?;
        tallied.push(CandidateWithVotes { candidate: candidate.to_shared(), votes });
    }
    Ok(tallied)
}

pub async fn get_campaign(
    pool: &SqlitePool,
    campaign_id: &Uuid,
) -> Result<CampaignWithCandidates, VotingError> {
    let row: Option<VotingCampaignRow> =
        sqlx::query_as("SELECT * FROM voting_campaigns WHERE id = ?")
            .bind(campaign_id.to_string())
            .fetch_optional(pool)
            .await?;
    let row = row.ok_or(VotingError::CampaignNotFound)?;

    let candidates = candidates_with_tallies(pool, &row.id).await?;
    Ok(CampaignWithCandidates { campaign: row.to_shared(), candidates })
}

pub async fn list_campaigns(pool: &SqlitePool) -> Result<Vec<CampaignWithCandidates>, VotingError> {
    let rows: Vec<VotingCampaignRow> =
        sqlx::query_as("SELECT * FROM voting_campaigns ORDER BY starts_at DESC")
            .fetch_all(pool)
            .await?;

    let mut campaigns = Vec::with_capacity(rows.len());
    for row in &rows {
        let candidates = candidates_with_tallies(pool, &row.id).await?;
        campaigns.push(CampaignWithCandidates { campaign: row.to_shared(), candidates });
    }
    Ok(campaigns)
}

/// Cast a vote. Requires an active membership, an open voting window, and
/// a candidate that belongs to the campaign. One vote per member per
/// campaign, enforced by the unique index.
pub async fn cast_vote(
    pool: &SqlitePool,
    user: &UserRow,
    campaign_id: &Uuid,
    candidate_id: &Uuid,
) -> Result<VotingCampaign, VotingError> {
    if user.membership_status != "active" {
        return Err(VotingError::MembershipRequired);
    }

    let campaign: Option<VotingCampaignRow> =
        sqlx::query_as("SELECT * FROM voting_campaigns WHERE id = ?")
            .bind(campaign_id.to_string())
            .fetch_optional(pool)
            .await?;
    let campaign = campaign.ok_or(VotingError::CampaignNotFound)?;

    let now = Utc::now();
    if now < campaign.starts_at || now >= campaign.ends_at {
        return Err(VotingError::VotingClosed);
    }

    let candidate: Option<CandidateRow> =
        sqlx::query_as("SELECT * FROM candidates WHERE id = ? AND campaign_id = ?")
            .bind(candidate_id.to_string())
            .bind(campaign_id.to_string())
            .fetch_optional(pool)
            .await?;
    if candidate.is_none() {
        return Err(VotingError::CandidateNotFound);
    }

    let insert = sqlx::query(
        "INSERT INTO votes (id, campaign_id, candidate_id, user_id, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(campaign_id.to_string())
    .bind(candidate_id.to_string())
    .bind(&user.id)
    .bind(now)
    .execute(pool)
    .await;

    match insert {
        Err(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
            return Err(VotingError::AlreadyVoted);
        }
        other => {
            other?;
        }
    }

    Ok(campaign.to_shared())
}
