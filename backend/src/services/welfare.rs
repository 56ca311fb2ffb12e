use chrono::{Months, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{ReimbursementRow, UserRow, WelfareRegistrationRow};
use crate::providers::{CheckoutMode, CheckoutSession, PaymentsProvider};
use crate::services::billing::{self, BillingError};
use crate::services::welfare_applications;
use shared::{EligibilityResponse, WelfareStatusResponse};

/// One-time welfare fund registration fee
pub const REGISTRATION_FEE_CENTS: i64 = 20_000;

/// Months the fund waits after launch before paying claims
const FUND_WAITING_PERIOD_MONTHS: u32 = 2;

#[derive(Debug, Error)]
pub enum WelfareError {
    #[error("User is already registered for the welfare fund")]
    AlreadyRegistered,
    #[error("No welfare registration found")]
    NoRegistrationFound,
    #[error("Registration fee has already been paid")]
    AlreadyPaid,
    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

pub async fn get_registration(
    pool: &SqlitePool,
    user_id: &Uuid,
) -> Result<Option<WelfareRegistrationRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM welfare_registrations WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await
}

/// Register the caller for the welfare fund and open checkout for the fixed
/// registration fee. The UNIQUE(user_id) constraint backstops concurrent
/// double submission.
pub async fn register(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    config: &Config,
    user: &UserRow,
) -> Result<CheckoutSession, WelfareError> {
    let existing: Option<WelfareRegistrationRow> =
        sqlx::query_as("SELECT * FROM welfare_registrations WHERE user_id = ?")
            .bind(&user.id)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Err(WelfareError::AlreadyRegistered);
    }

    let id = Uuid::new_v4();
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO welfare_registrations (id, user_id, registration_fee_cents, payment_status, status, created_at)
        VALUES (?, ?, ?, 'pending', 'inactive', ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&user.id)
    .bind(REGISTRATION_FEE_CENTS)
    .bind(now)
    .execute(pool)
    .await;

    if let Err(e) = inserted {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            return Err(WelfareError::AlreadyRegistered);
        }
        return Err(e.into());
    }

    open_fee_checkout(pool, payments, config, user).await
}

/// Re-open checkout for an existing unpaid registration. Guarded against
/// duplicate completion: a paid registration is never charged again.
pub async fn complete_payment(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    config: &Config,
    user: &UserRow,
) -> Result<CheckoutSession, WelfareError> {
    let registration: WelfareRegistrationRow =
        sqlx::query_as("SELECT * FROM welfare_registrations WHERE user_id = ?")
            .bind(&user.id)
            .fetch_optional(pool)
            .await?
            .ok_or(WelfareError::NoRegistrationFound)?;

    if registration.payment_status == "paid" {
        return Err(WelfareError::AlreadyPaid);
    }

    open_fee_checkout(pool, payments, config, user).await
}

async fn open_fee_checkout(
    pool: &SqlitePool,
    payments: &dyn PaymentsProvider,
    config: &Config,
    user: &UserRow,
) -> Result<CheckoutSession, WelfareError> {
    let customer_id = billing::ensure_customer(pool, payments, user).await?;

    let metadata = std::collections::HashMap::from([("user_id".to_string(), user.id.clone())]);
    let session = billing::open_checkout(
        payments,
        config,
        &customer_id,
        CheckoutMode::Payment,
        REGISTRATION_FEE_CENTS,
        "welfare_registration",
        metadata,
    )
    .await?;

    Ok(session)
}

/// Webhook-side payment reconciliation. Idempotent: a registration already
/// marked paid is left untouched.
pub async fn mark_registration_paid(pool: &SqlitePool, user_id: &Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE welfare_registrations SET payment_status = 'paid', paid_at = ? WHERE user_id = ? AND payment_status = 'pending'",
    )
    .bind(Utc::now())
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fund-level operational gate: enough paid registrants and the post-launch
/// waiting period elapsed. Returns the blocking reason when not operational.
async fn fund_operational_block(
    pool: &SqlitePool,
    config: &Config,
) -> Result<Option<String>, sqlx::Error> {
    let paid_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM welfare_registrations WHERE payment_status = 'paid'",
    )
    .fetch_one(pool)
    .await?;

    if paid_count < config.fund_minimum_registrations {
        return Ok(Some(format!(
            "The fund becomes operational at {} paid registrations ({} so far)",
            config.fund_minimum_registrations, paid_count
        )));
    }

    let operational_from = config.fund_launch_date + Months::new(FUND_WAITING_PERIOD_MONTHS);
    if Utc::now() < operational_from {
        return Ok(Some(format!(
            "The fund opens for claims on {}",
            operational_from.format("%Y-%m-%d")
        )));
    }

    Ok(None)
}

/// Derive eligibility at read time. Never trusts a previously stored flag;
/// the stored registration status is only flipped active write-through once
/// the fund-level conditions hold.
pub async fn check_eligibility(
    pool: &SqlitePool,
    config: &Config,
    user_id: &Uuid,
) -> Result<EligibilityResponse, WelfareError> {
    let Some(registration) = get_registration(pool, user_id).await? else {
        return Ok(ineligible("No welfare registration found"));
    };

    if registration.payment_status != "paid" {
        return Ok(ineligible("The registration fee has not been paid"));
    }

    if let Some(reason) = fund_operational_block(pool, config).await? {
        return Ok(ineligible(&reason));
    }

    if registration.status != "active" {
        sqlx::query("UPDATE welfare_registrations SET status = 'active' WHERE id = ?")
            .bind(&registration.id)
            .execute(pool)
            .await?;
    }

    if welfare_applications::has_in_flight_application(pool, user_id).await? {
        return Ok(ineligible("An application is already in progress"));
    }

    Ok(EligibilityResponse { can_apply: true, reason: None })
}

fn ineligible(reason: &str) -> EligibilityResponse {
    EligibilityResponse {
        can_apply: false,
        reason: Some(reason.to_string()),
    }
}

/// Registration + applications + reimbursements snapshot for the caller
pub async fn get_status(
    pool: &SqlitePool,
    config: &Config,
    user_id: &Uuid,
) -> Result<WelfareStatusResponse, WelfareError> {
    // Re-derives the stored status before reading it back
    let _ = check_eligibility(pool, config, user_id).await?;

    let registration = get_registration(pool, user_id).await?.map(|r| r.to_shared());
    let applications = welfare_applications::list_for_user(pool, user_id).await?;

    let reimbursement_rows: Vec<ReimbursementRow> = sqlx::query_as(
        r#"
        SELECT r.* FROM reimbursements r
        JOIN welfare_applications a ON a.id = r.application_id
        WHERE a.user_id = ?
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(WelfareStatusResponse {
        registration,
        applications,
        reimbursements: reimbursement_rows.iter().map(|r| r.to_shared()).collect(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::DateTime;

    /// Schema for the welfare tables, shared by service tests
    pub async fn setup_welfare_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();

        for ddl in [
            r#"
            CREATE TABLE users (
                id TEXT PRIMARY KEY NOT NULL,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                identity_subject TEXT,
                role TEXT NOT NULL DEFAULT 'member',
                membership_status TEXT NOT NULL DEFAULT 'inactive',
                membership_plan TEXT,
                payment_customer_id TEXT,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
            r#"
            CREATE TABLE welfare_registrations (
                id TEXT PRIMARY KEY NOT NULL,
                user_id TEXT NOT NULL UNIQUE,
                registration_fee_cents INTEGER NOT NULL,
                payment_status TEXT NOT NULL DEFAULT 'pending',
                status TEXT NOT NULL DEFAULT 'inactive',
                created_at DATETIME NOT NULL,
                paid_at DATETIME
            )
            "#,
            r#"
            CREATE TABLE immediate_family (
                id TEXT PRIMARY KEY NOT NULL,
                user_id TEXT NOT NULL,
                full_name TEXT NOT NULL,
                relationship TEXT NOT NULL,
                phone TEXT NOT NULL,
                email TEXT,
                id_number TEXT,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
            r#"
            CREATE TABLE family_documents (
                id TEXT PRIMARY KEY NOT NULL,
                family_member_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_url TEXT NOT NULL,
                file_type TEXT NOT NULL,
                created_at DATETIME NOT NULL
            )
            "#,
            r#"
            CREATE TABLE welfare_applications (
                id TEXT PRIMARY KEY NOT NULL,
                user_id TEXT NOT NULL,
                application_type TEXT NOT NULL,
                deceased_name TEXT NOT NULL,
                relation_to_deceased TEXT,
                reason TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                claim_amount_cents INTEGER NOT NULL,
                rejection_reason TEXT,
                created_at DATETIME NOT NULL,
                approved_at DATETIME,
                rejected_at DATETIME,
                payout_date DATETIME
            )
            "#,
            r#"
            CREATE TABLE application_beneficiaries (
                id TEXT PRIMARY KEY NOT NULL,
                application_id TEXT NOT NULL,
                family_member_id TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE application_documents (
                id TEXT PRIMARY KEY NOT NULL,
                application_id TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_url TEXT NOT NULL,
                file_type TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE reimbursements (
                id TEXT PRIMARY KEY NOT NULL,
                application_id TEXT NOT NULL,
                amount_due_cents INTEGER NOT NULL,
                amount_paid_cents INTEGER NOT NULL DEFAULT 0,
                due_date DATETIME NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                paid_at DATETIME,
                created_at DATETIME NOT NULL
            )
            "#,
        ] {
            sqlx::query(ddl).execute(&pool).await.unwrap();
        }

        pool
    }

    /// Config with a long-past launch date and a threshold of one registrant,
    /// so a single paid registration makes the fund operational
    pub fn operational_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            cors_origins: vec![],
            jwt_secret: "test".to_string(),
            jwt_expiration_hours: 1,
            identity_base_url: String::new(),
            payments_base_url: String::new(),
            payments_api_key: String::new(),
            payments_webhook_secret: "whsec".to_string(),
            checkout_success_url: "http://localhost/ok".to_string(),
            checkout_cancel_url: "http://localhost/cancel".to_string(),
            currency: "usd".to_string(),
            storage_base_url: String::new(),
            storage_bucket: String::new(),
            storage_api_key: String::new(),
            membership_monthly_price_cents: 1000,
            membership_annual_price_cents: 10000,
            fund_launch_date: "2020-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap(),
            fund_minimum_registrations: 1,
        }
    }

    pub async fn insert_user(pool: &SqlitePool) -> UserRow {
        let now = Utc::now();
        let user = UserRow {
            id: Uuid::new_v4().to_string(),
            email: format!("{}@example.com", Uuid::new_v4()),
            full_name: "Member".to_string(),
            identity_subject: None,
            role: "member".to_string(),
            membership_status: "inactive".to_string(),
            membership_plan: None,
            payment_customer_id: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, email, full_name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await
        .unwrap();

        user
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{insert_user, operational_config, setup_welfare_db};
    use super::*;
    use crate::services::billing::test_support::MockPayments;

    #[tokio::test]
    async fn test_register_opens_checkout_for_fixed_fee() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let session = register(&pool, &payments, &config, &user).await.unwrap();
        assert_eq!(session.url, "https://checkout.example/cs_test");

        let checkouts = payments.checkouts.lock().unwrap();
        assert_eq!(checkouts.len(), 1);
        assert_eq!(checkouts[0].amount_cents, REGISTRATION_FEE_CENTS);
        assert_eq!(checkouts[0].metadata.get("purpose").unwrap(), "welfare_registration");
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        register(&pool, &payments, &config, &user).await.unwrap();
        let second = register(&pool, &payments, &config, &user).await;

        assert!(matches!(second, Err(WelfareError::AlreadyRegistered)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM welfare_registrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_complete_payment_requires_registration() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;

        let result = complete_payment(&pool, &payments, &config, &user).await;
        assert!(matches!(result, Err(WelfareError::NoRegistrationFound)));
    }

    #[tokio::test]
    async fn test_complete_payment_is_idempotent_after_paid() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        register(&pool, &payments, &config, &user).await.unwrap();
        assert!(mark_registration_paid(&pool, &user_id).await.unwrap());

        let result = complete_payment(&pool, &payments, &config, &user).await;
        assert!(matches!(result, Err(WelfareError::AlreadyPaid)));

        // No new checkout beyond the original registration one
        assert_eq!(payments.checkouts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_paid_is_idempotent() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        register(&pool, &payments, &config, &user).await.unwrap();

        assert!(mark_registration_paid(&pool, &user_id).await.unwrap());
        assert!(!mark_registration_paid(&pool, &user_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_eligibility_requires_registration() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        let eligibility = check_eligibility(&pool, &config, &user_id).await.unwrap();

        assert!(!eligibility.can_apply);
        assert_eq!(eligibility.reason.unwrap(), "No welfare registration found");
    }

    #[tokio::test]
    async fn test_eligibility_requires_payment() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        register(&pool, &payments, &config, &user).await.unwrap();

        let eligibility = check_eligibility(&pool, &config, &user_id).await.unwrap();
        assert!(!eligibility.can_apply);
        assert_eq!(eligibility.reason.unwrap(), "The registration fee has not been paid");
    }

    #[tokio::test]
    async fn test_eligibility_waits_for_fund_threshold() {
        let pool = setup_welfare_db().await;
        let mut config = operational_config();
        config.fund_minimum_registrations = 100;
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        register(&pool, &payments, &config, &user).await.unwrap();
        mark_registration_paid(&pool, &user_id).await.unwrap();

        let eligibility = check_eligibility(&pool, &config, &user_id).await.unwrap();
        assert!(!eligibility.can_apply);
        assert!(eligibility.reason.unwrap().contains("100 paid registrations"));

        // Stored status must not have been flipped
        let status: String =
            sqlx::query_scalar("SELECT status FROM welfare_registrations WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "inactive");
    }

    #[tokio::test]
    async fn test_eligibility_waits_for_launch_period() {
        let pool = setup_welfare_db().await;
        let mut config = operational_config();
        config.fund_launch_date = Utc::now();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        register(&pool, &payments, &config, &user).await.unwrap();
        mark_registration_paid(&pool, &user_id).await.unwrap();

        let eligibility = check_eligibility(&pool, &config, &user_id).await.unwrap();
        assert!(!eligibility.can_apply);
        assert!(eligibility.reason.unwrap().contains("opens for claims"));
    }

    #[tokio::test]
    async fn test_eligibility_activates_registration_write_through() {
        let pool = setup_welfare_db().await;
        let config = operational_config();
        let payments = MockPayments::default();
        let user = insert_user(&pool).await;
        let user_id = Uuid::parse_str(&user.id).unwrap();

        register(&pool, &payments, &config, &user).await.unwrap();
        mark_registration_paid(&pool, &user_id).await.unwrap();

        let eligibility = check_eligibility(&pool, &config, &user_id).await.unwrap();
        assert!(eligibility.can_apply);
        assert!(eligibility.reason.is_none());

        let status: String =
            sqlx::query_scalar("SELECT status FROM welfare_registrations WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(status, "active");
    }
}
