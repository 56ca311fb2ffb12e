use actix_web::HttpRequest;
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth as auth_service;

#[derive(Debug, Error)]
pub enum AuthMiddlewareError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
}

/// Extract the session user ID from the Authorization header
pub fn extract_user_id(req: &HttpRequest, jwt_secret: &str) -> Result<Uuid, AuthMiddlewareError> {
    let token = bearer_token(req)?;

    auth_service::verify_jwt(token, jwt_secret).map_err(|_| AuthMiddlewareError::InvalidToken)
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthMiddlewareError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthMiddlewareError::MissingToken)?
        .to_str()
        .map_err(|_| AuthMiddlewareError::InvalidToken)?;

    header
        .strip_prefix("Bearer ")
        .ok_or(AuthMiddlewareError::InvalidToken)
}
