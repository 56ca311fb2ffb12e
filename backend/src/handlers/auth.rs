use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, SessionRequest, SessionResponse, UpstreamError};

use crate::models::AppState;
use crate::services::auth as auth_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/session", web::post().to(create_session))
            .route("/me", web::get().to(get_me)),
    );
}

async fn create_session(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<SessionRequest>,
) -> Result<HttpResponse> {
    // Rate-limit token exchanges per client IP
    let client_ip = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.session_rate_limiter.check(&client_ip) {
        return Ok(HttpResponse::TooManyRequests().json(ApiError {
            error: "rate_limited".to_string(),
            message: "Too many session attempts, try again later".to_string(),
        }));
    }
    state.session_rate_limiter.record(&client_ip);

    match auth_service::exchange_session(&state.db, state.identity.as_ref(), &body.identity_token)
        .await
    {
        Ok(user) => {
            let token = match auth_service::create_jwt(
                &user.id,
                &state.config.jwt_secret,
                state.config.jwt_expiration_hours,
            ) {
                Ok(token) => token,
                Err(e) => {
                    log::error!("Error signing session token: {:?}", e);
                    return Ok(HttpResponse::InternalServerError().json(ApiError {
                        error: "internal_error".to_string(),
                        message: "Failed to create session".to_string(),
                    }));
                }
            };

            state.session_rate_limiter.clear(&client_ip);
            Ok(HttpResponse::Ok().json(ApiSuccess::new(SessionResponse { token, user })))
        }
        Err(auth_service::AuthError::InvalidToken) => {
            Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Identity token is invalid or expired".to_string(),
            }))
        }
        Err(auth_service::AuthError::IdentityUnavailable) => {
            Ok(HttpResponse::ServiceUnavailable().json(UpstreamError {
                error: "upstream_unavailable".to_string(),
                message: "Identity provider is unavailable".to_string(),
                retryable: true,
            }))
        }
        Err(e) => {
            log::error!("Error exchanging session: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to create session".to_string(),
            }))
        }
    }
}

async fn get_me(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match auth_service::get_user_by_id(&state.db, &user_id).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "User not found".to_string(),
        })),
        Err(e) => {
            log::error!("Error fetching current user: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch user".to_string(),
            }))
        }
    }
}
