use actix_web::{web, HttpResponse, Result};
use shared::ApiError;

use crate::models::AppState;
use crate::services::webhooks as webhooks_service;
use crate::services::webhooks::{WebhookError, WebhookEvent};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/payments", web::post().to(payments_webhook));
}

/// Signature is computed over the raw body, so the body is taken as bytes
/// and parsed only after verification.
async fn payments_webhook(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let signature = req
        .headers()
        .get("Webhook-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if webhooks_service::verify_signature(
        &state.config.payments_webhook_secret,
        &body,
        signature,
    )
    .is_err()
    {
        return Ok(HttpResponse::Unauthorized().json(ApiError {
            error: "unauthorized".to_string(),
            message: "Invalid webhook signature".to_string(),
        }));
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("Malformed webhook payload: {}", e);
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: "Malformed webhook payload".to_string(),
            }));
        }
    };

    match webhooks_service::handle_event(&state.db, &event).await {
        Ok(()) => Ok(HttpResponse::Ok().finish()),
        Err(WebhookError::Malformed(message)) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message,
        })),
        Err(e) => {
            log::error!("Error handling payment webhook: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to process webhook".to_string(),
            }))
        }
    }
}
