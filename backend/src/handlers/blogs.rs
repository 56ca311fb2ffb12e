use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CreateBlogPostRequest, UpdateBlogPostRequest};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::blogs as blogs_service;
use crate::services::blogs::BlogError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/blogs")
            .route("", web::get().to(list_published))
            .route("", web::post().to(create_post))
            .route("/mine", web::get().to(list_mine))
            .route("/{id}", web::get().to(get_post))
            .route("/{id}", web::put().to(update_post))
            .route("/{id}", web::delete().to(delete_post)),
    );
}

fn blog_error_response(e: BlogError, context: &str) -> HttpResponse {
    match e {
        BlogError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Blog post not found".to_string(),
        }),
        BlogError::Validation(field) => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: format!("Invalid {field}"),
        }),
        e => {
            log::error!("Error while {}: {:?}", context, e);
            HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: format!("Failed while {context}"),
            })
        }
    }
}

async fn list_published(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    if crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret).is_err() {
        return Ok(HttpResponse::Unauthorized().json(ApiError {
            error: "unauthorized".to_string(),
            message: "Invalid or missing token".to_string(),
        }));
    }

    match blogs_service::list_published(&state.db).await {
        Ok(posts) => Ok(HttpResponse::Ok().json(ApiSuccess::new(posts))),
        Err(e) => {
            log::error!("Error listing blog posts: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list blog posts".to_string(),
            }))
        }
    }
}

async fn list_mine(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match blogs_service::list_for_author(&state.db, &user_id).await {
        Ok(posts) => Ok(HttpResponse::Ok().json(ApiSuccess::new(posts))),
        Err(e) => {
            log::error!("Error listing own blog posts: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list blog posts".to_string(),
            }))
        }
    }
}

async fn get_post(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
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

    let post_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid blog post ID format".to_string(),
            }));
        }
    };

    match blogs_service::get_post(&state.db, &post_id, Some(&user_id)).await {
        Ok(post) => Ok(HttpResponse::Ok().json(ApiSuccess::new(post))),
        Err(e) => Ok(blog_error_response(e, "fetching a blog post")),
    }
}

async fn create_post(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateBlogPostRequest>,
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

    match blogs_service::create_post(&state.db, &user_id, &body).await {
        Ok(post) => Ok(HttpResponse::Created().json(ApiSuccess::new(post))),
        Err(e) => Ok(blog_error_response(e, "creating a blog post")),
    }
}

async fn update_post(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateBlogPostRequest>,
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

    let post_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid blog post ID format".to_string(),
            }));
        }
    };

    match blogs_service::update_post(&state.db, &post_id, &user_id, &body).await {
        Ok(post) => Ok(HttpResponse::Ok().json(ApiSuccess::new(post))),
        Err(e) => Ok(blog_error_response(e, "updating a blog post")),
    }
}

async fn delete_post(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
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

    let post_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid blog post ID format".to_string(),
            }));
        }
    };

    match blogs_service::delete_post(&state.db, &post_id, &user_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(blog_error_response(e, "deleting a blog post")),
    }
}
