use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// User Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Member,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Admin => "admin",
        }
    }

    pub fn can_manage_applications(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_manage_events(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_manage_campaigns(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(UserRole::Member),
            "admin" => Ok(UserRole::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Inactive,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(MembershipStatus::Active),
            "inactive" => Ok(MembershipStatus::Inactive),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipPlan {
    Monthly,
    Annual,
}

impl MembershipPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipPlan::Monthly => "monthly",
            MembershipPlan::Annual => "annual",
        }
    }
}

impl FromStr for MembershipPlan {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(MembershipPlan::Monthly),
            "annual" => Ok(MembershipPlan::Annual),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub membership_status: MembershipStatus,
    pub membership_plan: Option<MembershipPlan>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub identity_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
}

// ============================================================================
// Membership Subscription Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub plan: MembershipPlan,
}

/// Returned whenever an operation hands the client off to external checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
}

// ============================================================================
// Welfare Registration Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Inactive,
    Active,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Inactive => "inactive",
            RegistrationStatus::Active => "active",
        }
    }
}

impl FromStr for RegistrationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inactive" => Ok(RegistrationStatus::Inactive),
            "active" => Ok(RegistrationStatus::Active),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelfareRegistration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub registration_fee_cents: i64,
    pub payment_status: PaymentStatus,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub can_apply: bool,
    pub reason: Option<String>,
}

// ============================================================================
// Immediate Family Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmediateFamilyMember {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub relationship: String,
    pub phone: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFamilyMemberRequest {
    pub full_name: String,
    pub relationship: String,
    pub phone: String,
    pub email: Option<String>,
    pub id_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFamilyMemberRequest {
    pub full_name: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub id_number: Option<String>,
}

// ============================================================================
// Document Types
// ============================================================================

/// A stored file reference, as returned by the upload endpoints and as
/// attached to welfare applications at submission time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRef {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyDocument {
    pub id: Uuid,
    pub family_member_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDocument {
    pub id: Uuid,
    pub application_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
}

// ============================================================================
// Welfare Application Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    FamilyDeath,
    MemberDeath,
}

impl ApplicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationType::FamilyDeath => "family_death",
            ApplicationType::MemberDeath => "member_death",
        }
    }

    /// Claim amounts are fixed by application type, never taken from input
    pub fn claim_amount_cents(&self) -> i64 {
        match self {
            ApplicationType::FamilyDeath => 500_000,
            ApplicationType::MemberDeath => 800_000,
        }
    }
}

impl FromStr for ApplicationType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "family_death" => Ok(ApplicationType::FamilyDeath),
            "member_death" => Ok(ApplicationType::MemberDeath),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Processing,
    Approved,
    Paid,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Processing => "processing",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Paid => "paid",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// An application still occupying the applicant's single in-flight slot
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ApplicationStatus::Pending | ApplicationStatus::Processing)
    }
}

impl FromStr for ApplicationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "processing" => Ok(ApplicationStatus::Processing),
            "approved" => Ok(ApplicationStatus::Approved),
            "paid" => Ok(ApplicationStatus::Paid),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelfareApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub application_type: ApplicationType,
    pub deceased_name: String,
    pub relation_to_deceased: Option<String>,
    pub reason: String,
    pub status: ApplicationStatus,
    pub claim_amount_cents: i64,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub payout_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplicationRequest {
    pub application_type: ApplicationType,
    pub deceased_name: String,
    pub relation_to_deceased: Option<String>,
    pub reason: String,
    pub beneficiary_ids: Vec<Uuid>,
    pub documents: Vec<DocumentRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplicationResponse {
    pub application_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectApplicationRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub application: WelfareApplication,
    pub beneficiaries: Vec<ImmediateFamilyMember>,
    pub documents: Vec<ApplicationDocument>,
}

// ============================================================================
// Reimbursement Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReimbursementStatus {
    Pending,
    Completed,
}

impl ReimbursementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReimbursementStatus::Pending => "pending",
            ReimbursementStatus::Completed => "completed",
        }
    }
}

impl FromStr for ReimbursementStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReimbursementStatus::Pending),
            "completed" => Ok(ReimbursementStatus::Completed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reimbursement {
    pub id: Uuid,
    pub application_id: Uuid,
    pub amount_due_cents: i64,
    pub amount_paid_cents: i64,
    pub due_date: DateTime<Utc>,
    pub status: ReimbursementStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Everything the welfare dashboard shows the calling member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelfareStatusResponse {
    pub registration: Option<WelfareRegistration>,
    pub applications: Vec<ApplicationDetail>,
    pub reimbursements: Vec<Reimbursement>,
}

// ============================================================================
// Donation Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Completed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
        }
    }
}

impl FromStr for DonationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DonationStatus::Pending),
            "completed" => Ok(DonationStatus::Completed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub message: Option<String>,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDonationRequest {
    pub amount_cents: i64,
    pub message: Option<String>,
}

// ============================================================================
// Event Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ticket_price_cents: i64,
    pub capacity: Option<i64>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ticket_price_cents: i64,
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ticket_price_cents: Option<i64>,
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAttendee {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Voting Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingCampaign {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    pub manifesto: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateWithVotes {
    pub candidate: Candidate,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignWithCandidates {
    pub campaign: VotingCampaign,
    pub candidates: Vec<CandidateWithVotes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub candidates: Vec<CreateCandidateRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCandidateRequest {
    pub name: String,
    pub manifesto: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastVoteRequest {
    pub candidate_id: Uuid,
}

// ============================================================================
// Blog Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlogPostRequest {
    pub title: String,
    pub content: String,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBlogPostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Error envelope for upstream-provider failures, so clients can
/// distinguish "try again" from "contact support"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamError {
    pub error: String,
    pub message: String,
    pub retryable: bool,
}

// ============================================================================
// Tests
// ============================================================================
