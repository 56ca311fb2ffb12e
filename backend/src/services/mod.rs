pub mod auth;
pub mod billing;
pub mod blogs;
pub mod documents;
pub mod donations;
pub mod events;
pub mod immediate_family;
pub mod membership;
pub mod voting;
pub mod webhooks;
pub mod welfare;
pub mod welfare_applications;
