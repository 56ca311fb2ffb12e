use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::providers::{IdentityProvider, ObjectStorage, PaymentsProvider};

pub mod blog_post;
pub mod donation;
pub mod event;
pub mod family_document;
pub mod immediate_family;
pub mod reimbursement;
pub mod user;
pub mod voting;
pub mod welfare_application;
pub mod welfare_registration;

pub use blog_post::*;
pub use donation::*;
pub use event::*;
pub use family_document::*;
pub use immediate_family::*;
pub use reimbursement::*;
pub use user::*;
pub use voting::*;
pub use welfare_application::*;
pub use welfare_registration::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub session_rate_limiter: Arc<RateLimiter>,
    pub identity: Arc<dyn IdentityProvider>,
    pub payments: Arc<dyn PaymentsProvider>,
    pub storage: Arc<dyn ObjectStorage>,
}
