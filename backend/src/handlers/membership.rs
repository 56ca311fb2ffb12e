use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CheckoutResponse, SubscribeRequest, UpstreamError};

use crate::models::AppState;
use crate::services::{auth as auth_service, membership as membership_service};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/membership")
            .route("/subscribe", web::post().to(subscribe))
            .route("/cancel", web::post().to(cancel)),
    );
}

async fn subscribe(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<SubscribeRequest>,
) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    let user = match auth_service::get_user_row(&state.db, &user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiError {
                error: "not_found".to_string(),
                message: "User not found".to_string(),
            }));
        }
        Err(e) => {
            log::error!("Error loading user: {:?}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to subscribe".to_string(),
            }));
        }
    };

    match membership_service::subscribe(
        &state.db,
        state.payments.as_ref(),
        &state.config,
        &user,
        body.plan,
    )
    .await
    {
        Ok(session) => Ok(HttpResponse::Ok()
            .json(ApiSuccess::new(CheckoutResponse { checkout_url: session.url }))),
        Err(membership_service::MembershipError::AlreadyActive) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invariant_violation".to_string(),
                message: "Membership is already active".to_string(),
            }))
        }
        Err(e) if e.is_retryable() => Ok(HttpResponse::ServiceUnavailable().json(UpstreamError {
            error: "upstream_unavailable".to_string(),
            message: "Payment provider is unavailable, try again".to_string(),
            retryable: true,
        })),
        Err(membership_service::MembershipError::Billing(_)) => {
            Ok(HttpResponse::BadGateway().json(UpstreamError {
                error: "upstream_rejected".to_string(),
                message: "Payment provider rejected the request".to_string(),
                retryable: false,
            }))
        }
        Err(e) => {
            log::error!("Error subscribing: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to subscribe".to_string(),
            }))
        }
    }
}

async fn cancel(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    let user = match auth_service::get_user_row(&state.db, &user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiError {
                error: "not_found".to_string(),
                message: "User not found".to_string(),
            }));
        }
        Err(e) => {
            log::error!("Error loading user: {:?}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to cancel membership".to_string(),
            }));
        }
    };

    match membership_service::cancel(&state.db, state.payments.as_ref(), &user).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiSuccess::new("cancelled"))),
        Err(membership_service::MembershipError::NotSubscribed) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invariant_violation".to_string(),
                message: "No active membership to cancel".to_string(),
            }))
        }
        Err(e) if e.is_retryable() => Ok(HttpResponse::ServiceUnavailable().json(UpstreamError {
            error: "upstream_unavailable".to_string(),
            message: "Payment provider is unavailable, try again".to_string(),
            retryable: true,
        })),
        Err(membership_service::MembershipError::Billing(_)) => {
            Ok(HttpResponse::BadGateway().json(UpstreamError {
                error: "upstream_rejected".to_string(),
                message: "Payment provider rejected the request".to_string(),
                retryable: false,
            }))
        }
        Err(e) => {
            log::error!("Error cancelling membership: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to cancel membership".to_string(),
            }))
        }
    }
}
