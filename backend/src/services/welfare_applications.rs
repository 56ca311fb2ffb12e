use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    ApplicationDocumentRow, ImmediateFamilyRow, ReimbursementRow, WelfareApplicationRow,
};
use crate::services::welfare::{self, WelfareError};
use shared::{
    ApplicationDetail, ApplicationStatus, ApplicationType, Reimbursement,
    SubmitApplicationRequest, WelfareApplication,
};

/// Community reimbursement window after a payout
const REIMBURSEMENT_DUE_DAYS: i64 = 30;

/// Beneficiary selection bounds per application
const MAX_BENEFICIARIES: usize = 5;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Not eligible to apply: {0}")]
    Ineligible(String),
    #[error("Invalid {0}")]
    Validation(&'static str),
    #[error("Application not found")]
    NotFound,
    #[error("Cannot {action} an application in status {status}")]
    InvalidTransition { action: &'static str, status: String },
    #[error("Reimbursement not found")]
    ReimbursementNotFound,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<WelfareError> for ApplicationError {
    fn from(e: WelfareError) -> Self {
        match e {
            WelfareError::DatabaseError(db) => ApplicationError::DatabaseError(db),
            other => ApplicationError::Ineligible(other.to_string()),
        }
    }
}

pub async fn has_in_flight_application(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM welfare_applications WHERE user_id = ? AND status IN ('pending', 'processing')",
    )
    .bind(user_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

fn validate(request: &SubmitApplicationRequest) -> Result<(), ApplicationError> {
    if request.deceased_name.trim().is_empty() {
        return Err(ApplicationError::Validation("deceased_name"));
    }
    if request.application_type == ApplicationType::FamilyDeath
        && request
            .relation_to_deceased
            .as_deref()
            .map_or(true, |r| r.trim().is_empty())
    {
        return Err(ApplicationError::Validation("relation_to_deceased"));
    }
    if request.reason.trim().is_empty() {
        return Err(ApplicationError::Validation("reason"));
    }
    if request.beneficiary_ids.is_empty() || request.beneficiary_ids.len() > MAX_BENEFICIARIES {
        return Err(ApplicationError::Validation("beneficiary_ids"));
    }
    if request.documents.is_empty() {
        return Err(ApplicationError::Validation("documents"));
    }
    Ok(())
}

/// Submit a welfare application. Eligibility is re-derived at submission
/// time and the claim amount comes from the application type alone. The
/// application with its beneficiaries and documents commits in a single
/// transaction so a partial application is never persisted.
pub async fn submit_application(
    pool: &SqlitePool,
    config: &Config,
    user_id: &Uuid,
    request: &SubmitApplicationRequest,
) -> Result<WelfareApplication, ApplicationError> {
    let eligibility = welfare::check_eligibility(pool, config, user_id).await?;
    if !eligibility.can_apply {
        return Err(ApplicationError::Ineligible(
            eligibility.reason.unwrap_or_else(|| "Not eligible".to_string()),
        ));
    }

    validate(request)?;

    // Every selected beneficiary must be one of the caller's family members
    for beneficiary_id in &request.beneficiary_ids {
        let owned: Option<ImmediateFamilyRow> =
            sqlx::query_as("SELECT * FROM immediate_family WHERE id = ? AND user_id = ?")
                .bind(beneficiary_id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(pool)
                .await?;
        if owned.is_none() {
            return Err(ApplicationError::Validation("beneficiary_ids"));
        }
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let claim_amount_cents = request.application_type.claim_amount_cents();
    let relation = if request.application_type == ApplicationType::FamilyDeath {
        request.relation_to_deceased.clone()
    } else {
        None
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO welfare_applications
            (id, user_id, application_type, deceased_name, relation_to_deceased, reason, status, claim_amount_cents, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(request.application_type.as_str())
    .bind(&request.deceased_name)
    .bind(&relation)
    .bind(&request.reason)
    .bind(claim_amount_cents)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for beneficiary_id in &request.beneficiary_ids {
        sqlx::query(
            "INSERT INTO application_beneficiaries (id, application_id, family_member_id) VALUES (?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id.to_string())
        .bind(beneficiary_id.to_string())
        .execute(&mut *tx)
        .await?;
    }

    for document in &request.documents {
        sqlx::query(
            "INSERT INTO application_documents (id, application_id, file_name, file_url, file_type) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(id.to_string())
        .bind(&document.file_name)
        .bind(&document.file_url)
        .bind(&document.file_type)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(WelfareApplication {
        id,
        user_id: *user_id,
        application_type: request.application_type,
        deceased_name: request.deceased_name.clone(),
        relation_to_deceased: relation,
        reason: request.reason.clone(),
        status: ApplicationStatus::Pending,
        claim_amount_cents,
        rejection_reason: None,
        created_at: now,
        approved_at: None,
        rejected_at: None,
        payout_date: None,
    })
}

async fn load_detail(
    pool: &SqlitePool,
    row: &WelfareApplicationRow,
) -> Result<ApplicationDetail, sqlx::Error> {
    let beneficiaries: Vec<ImmediateFamilyRow> = sqlx::query_as(
        r#"
        SELECT f.* FROM immediate_family f
        JOIN application_beneficiaries b ON b.family_member_id = f.id
        WHERE b.application_id = ?
        "#,
    )
    .bind(&row.id)
    .fetch_all(pool)
    .await?;

    let documents: Vec<ApplicationDocumentRow> =
        sqlx::query_as("SELECT * FROM application_documents WHERE application_id = ?")
            .bind(&row.id)
            .fetch_all(pool)
            .await?;

    Ok(ApplicationDetail {
        application: row.to_shared(),
        beneficiaries: beneficiaries.iter().map(|b| b.to_shared()).collect(),
        documents: documents.iter().map(|d| d.to_shared()).collect(),
    })
}

pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<Vec<ApplicationDetail>, sqlx::Error> {
    let rows: Vec<WelfareApplicationRow> = sqlx::query_as(
        "SELECT * FROM welfare_applications WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(load_detail(pool, row).await?);
    }
    Ok(details)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ApplicationDetail>, sqlx::Error> {
    let rows: Vec<WelfareApplicationRow> =
        sqlx::query_as("SELECT * FROM welfare_applications ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(load_detail(pool, row).await?);
    }
    Ok(details)
}

async fn get_application(
    pool: &SqlitePool,
    application_id: &Uuid,
) -> Result<WelfareApplicationRow, ApplicationError> {
    let row: Option<WelfareApplicationRow> =
        sqlx::query_as("SELECT * FROM welfare_applications WHERE id = ?")
            .bind(application_id.to_string())
            .fetch_optional(pool)
            .await?;

    row.ok_or(ApplicationError::NotFound)
}

/// Admin: pending -> approved
pub async fn approve_application(
    pool: &SqlitePool,
    application_id: &Uuid,
) -> Result<WelfareApplication, ApplicationError> {
    let row = get_application(pool, application_id).await?;
    if row.status != "pending" {
        return Err(ApplicationError::InvalidTransition { action: "approve", status: row.status });
    }

    let now = Utc::now();
    sqlx::query("UPDATE welfare_applications SET status = 'approved', approved_at = ? WHERE id = ?")
        .bind(now)
        .bind(&row.id)
        .execute(pool)
        .await?;

    Ok(get_application(pool, application_id).await?.to_shared())
}

/// Admin: pending -> rejected (terminal), with a mandatory reason
pub async fn reject_application(
    pool: &SqlitePool,
    application_id: &Uuid,
    reason: &str,
) -> Result<WelfareApplication, ApplicationError> {
    if reason.trim().is_empty() {
        return Err(ApplicationError::Validation("reason"));
    }

    let row = get_application(pool, application_id).await?;
    if row.status != "pending" {
        return Err(ApplicationError::InvalidTransition { action: "reject", status: row.status });
    }

    let now = Utc::now();
    sqlx::query(
        "UPDATE welfare_applications SET status = 'rejected', rejected_at = ?, rejection_reason = ? WHERE id = ?",
    )
    .bind(now)
    .bind(reason)
    .bind(&row.id)
    .execute(pool)
    .await?;

    Ok(get_application(pool, application_id).await?.to_shared())
}

/// Admin: approved -> paid. Records the community's reimbursement obligation
/// in the same transaction as the payout.
pub async fn payout_application(
    pool: &SqlitePool,
    application_id: &Uuid,
) -> Result<WelfareApplication, ApplicationError> {
    let row = get_application(pool, application_id).await?;
    if row.status != "approved" {
        return Err(ApplicationError::InvalidTransition { action: "pay out", status: row.status });
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE welfare_applications SET status = 'paid', payout_date = ? WHERE id = ?")
        .bind(now)
        .bind(&row.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO reimbursements (id, application_id, amount_due_cents, amount_paid_cents, due_date, status, created_at)
        VALUES (?, ?, ?, 0, ?, 'pending', ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&row.id)
    .bind(row.claim_amount_cents)
    .bind(now + Duration::days(REIMBURSEMENT_DUE_DAYS))
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(get_application(pool, application_id).await?.to_shared())
}

pub async fn list_reimbursements(pool: &SqlitePool) -> Result<Vec<Reimbursement>, sqlx::Error> {
    let rows: Vec<ReimbursementRow> =
        sqlx::query_as("SELECT * FROM reimbursements ORDER BY due_date")
            .fetch_all(pool)
            .await?;

    Ok(rows.iter().map(|r| r.to_shared()).collect())
}

/// Admin: mark a reimbursement settled in full
pub async fn complete_reimbursement(
    pool: &SqlitePool,
    reimbursement_id: &Uuid,
) -> Result<Reimbursement, ApplicationError> {
    let row: Option<ReimbursementRow> =
        sqlx::query_as("SELECT * FROM reimbursements WHERE id = ?")
            .bind(reimbursement_id.to_string())
            .fetch_optional(pool)
            .await?;
    let row = row.ok_or(ApplicationError::ReimbursementNotFound)?;

    if row.status == "completed" {
        return Err(ApplicationError::InvalidTransition {
            action: "complete",
            status: row.status,
        });
    }

    let now = Utc::now();
    sqlx::query(
        "UPDATE reimbursements SET status = 'completed', amount_paid_cents = amount_due_cents, paid_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(&row.id)
    .execute(pool)
    .await?;

    let updated: ReimbursementRow = sqlx::query_as("SELECT * FROM reimbursements WHERE id = ?")
        .bind(&row.id)
        .fetch_one(pool)
        .await?;

    Ok(updated.to_shared())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::billing::test_support::MockPayments;
    use crate::services::immediate_family;
    use crate::services::welfare::test_support::{insert_user, operational_config, setup_welfare_db};
    use shared::{CreateFamilyMemberRequest, DocumentRef};

    async fn eligible_user(pool: &SqlitePool, config: &Config) -> (Uuid, Uuid) {
        let payments = MockPayments::default();
        let user = insert_user(pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        welfare::register(pool, &payments, config, &user).await.unwrap();
        welfare::mark_registration_paid(pool, &user_id).await.unwrap();

        let member = immediate_family::add_family_member(
            pool,
            &user_id,
            &CreateFamilyMemberRequest {
                full_name: "Jane Doe".to_string(),
                relationship: "spouse".to_string(),
                phone: "+15550100".to_string(),
                email: None,
                id_number: None,
            },
        )
        .await
        .unwrap();

        (user_id, member.id)
    }

    fn request(beneficiary: Uuid) -> SubmitApplicationRequest {
        SubmitApplicationRequest {
            application_type: ApplicationType::FamilyDeath,
            deceased_name: "John Doe".to_string(),
            relation_to_deceased: Some("father".to_string()),
            reason: "Funeral expenses".to_string(),
            beneficiary_ids: vec![beneficiary],
            documents: vec![DocumentRef {
                file_name: "burial-permit.pdf".to_string(),
                file_url: "https://storage.example/burial-permit.pdf".to_string(),
                file_type: "application/pdf".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_submit_persists_application_with_children() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        let application = submit_application(&pool, &config, &user_id, &request(member_id))
            .await
            .unwrap();

        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.claim_amount_cents, 500_000);

        let details = list_for_user(&pool, &user_id).await.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].beneficiaries.len(), 1);
        assert_eq!(details[0].documents.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_amount_derived_from_type() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        let mut req = request(member_id);
        req.application_type = ApplicationType::MemberDeath;
        req.relation_to_deceased = None;

        let application = submit_application(&pool, &config, &user_id, &req).await.unwrap();
        assert_eq!(application.claim_amount_cents, 800_000);
        assert!(application.relation_to_deceased.is_none());
    }

    #[tokio::test]
    async fn test_submit_requires_eligibility() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        let result = submit_application(&pool, &config, &user_id, &request(Uuid::new_v4())).await;
        assert!(matches!(result, Err(ApplicationError::Ineligible(_))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM welfare_applications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_foreign_beneficiary_without_partial_write() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, _member_id) = eligible_user(&pool, &config).await;

        let result = submit_application(&pool, &config, &user_id, &request(Uuid::new_v4())).await;
        assert!(matches!(result, Err(ApplicationError::Validation("beneficiary_ids"))));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM welfare_applications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_family_death_requires_relation() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        let mut req = request(member_id);
        req.relation_to_deceased = None;

        let result = submit_application(&pool, &config, &user_id, &req).await;
        assert!(matches!(result, Err(ApplicationError::Validation("relation_to_deceased"))));
    }

    #[tokio::test]
    async fn test_submit_requires_document() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        let mut req = request(member_id);
        req.documents.clear();

        let result = submit_application(&pool, &config, &user_id, &req).await;
        assert!(matches!(result, Err(ApplicationError::Validation("documents"))));
    }

    #[tokio::test]
    async fn test_second_in_flight_application_blocked() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        submit_application(&pool, &config, &user_id, &request(member_id)).await.unwrap();

        let result = submit_application(&pool, &config, &user_id, &request(member_id)).await;
        assert!(matches!(result, Err(ApplicationError::Ineligible(_))));
    }

    #[tokio::test]
    async fn test_approve_then_payout_creates_reimbursement() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        let application =
            submit_application(&pool, &config, &user_id, &request(member_id)).await.unwrap();

        let approved = approve_application(&pool, &application.id).await.unwrap();
        assert_eq!(approved.status, ApplicationStatus::Approved);
        assert!(approved.approved_at.is_some());

        let paid = payout_application(&pool, &application.id).await.unwrap();
        assert_eq!(paid.status, ApplicationStatus::Paid);
        assert!(paid.payout_date.is_some());

        let reimbursements = list_reimbursements(&pool).await.unwrap();
        assert_eq!(reimbursements.len(), 1);
        assert_eq!(reimbursements[0].amount_due_cents, 500_000);
        assert_eq!(reimbursements[0].status, shared::ReimbursementStatus::Pending);

        let completed = complete_reimbursement(&pool, &reimbursements[0].id).await.unwrap();
        assert_eq!(completed.status, shared::ReimbursementStatus::Completed);
        assert_eq!(completed.amount_paid_cents, 500_000);
    }

    #[tokio::test]
    async fn test_payout_requires_approval_first() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        let application =
            submit_application(&pool, &config, &user_id, &request(member_id)).await.unwrap();

        let result = payout_application(&pool, &application.id).await;
        assert!(matches!(result, Err(ApplicationError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_reject_requires_reason_and_is_terminal() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let (user_id, member_id) = eligible_user(&pool, &config).await;

        let application =
            submit_application(&pool, &config, &user_id, &request(member_id)).await.unwrap();

        let missing_reason = reject_application(&pool, &application.id, " ").await;
        assert!(matches!(missing_reason, Err(ApplicationError::Validation("reason"))));

        let rejected = reject_application(&pool, &application.id, "Duplicate claim").await.unwrap();
        assert_eq!(rejected.status, ApplicationStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Duplicate claim"));

        let approve_after = approve_application(&pool, &application.id).await;
        assert!(matches!(approve_after, Err(ApplicationError::InvalidTransition { .. })));
    }
}
