use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use shared::{ApiError, ApiSuccess, CreateDonationRequest, Donation, UpstreamError};

use crate::models::AppState;
use crate::services::{auth as auth_service, donations as donations_service};
use crate::services::donations::DonationError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/donations")
            .route("", web::post().to(create_donation))
            .route("", web::get().to(list_donations)),
    );
}

#[derive(Debug, Serialize)]
struct DonationResponse {
    donation: Donation,
    checkout_url: String,
}

async fn create_donation(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateDonationRequest>,
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
                message: "Failed to create donation".to_string(),
            }));
        }
    };

    match donations_service::create_donation(
        &state.db,
        state.payments.as_ref(),
        &state.config,
        &user,
        body.amount_cents,
        body.message.as_deref(),
    )
    .await
    {
        Ok((donation, session)) => Ok(HttpResponse::Created().json(ApiSuccess::new(
            DonationResponse { donation, checkout_url: session.url },
        ))),
        Err(DonationError::AmountTooSmall) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: "Invalid amount_cents".to_string(),
        })),
        Err(e) if e.is_retryable() => Ok(HttpResponse::ServiceUnavailable().json(UpstreamError {
            error: "upstream_unavailable".to_string(),
            message: "Payment provider is unavailable, try again".to_string(),
            retryable: true,
        })),
        Err(DonationError::Billing(_)) => Ok(HttpResponse::BadGateway().json(UpstreamError {
            error: "upstream_rejected".to_string(),
            message: "Payment provider rejected the request".to_string(),
            retryable: false,
        })),
        Err(e) => {
            log::error!("Error creating donation: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to create donation".to_string(),
            }))
        }
    }
}

async fn list_donations(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
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

    match donations_service::list_for_user(&state.db, &user_id).await {
        Ok(donations) => Ok(HttpResponse::Ok().json(ApiSuccess::new(donations))),
        Err(e) => {
            log::error!("Error listing donations: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list donations".to_string(),
            }))
        }
    }
}
