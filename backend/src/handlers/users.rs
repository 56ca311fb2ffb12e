use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, UpdateProfileRequest};

use crate::models::AppState;
use crate::services::auth as auth_service;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/users").route("/me", web::put().to(update_me)));
}

async fn update_me(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<UpdateProfileRequest>,
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

    match auth_service::update_profile(&state.db, &user_id, &body).await {
        Ok(user) => Ok(HttpResponse::Ok().json(ApiSuccess::new(user))),
        Err(auth_service::AuthError::EmptyUpdate) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "validation_error".to_string(),
                message: "Invalid full_name".to_string(),
            }))
        }
        Err(auth_service::AuthError::UserNotFound) => {
            Ok(HttpResponse::NotFound().json(ApiError {
                error: "not_found".to_string(),
                message: "User not found".to_string(),
            }))
        }
        Err(e) => {
            log::error!("Error updating profile: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to update profile".to_string(),
            }))
        }
    }
}
