use actix_web::{web, HttpResponse, Result};
use shared::{ApiError, ApiSuccess, CastVoteRequest, CreateCampaignRequest};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::{auth as auth_service, voting as voting_service};
use crate::services::voting::VotingError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/voting")
            .route("/campaigns", web::get().to(list_campaigns))
            .route("/campaigns", web::post().to(create_campaign))
            .route("/campaigns/{id}", web::get().to(get_campaign))
            .route("/campaigns/{id}/vote", web::post().to(cast_vote)),
    );
}

fn voting_error_response(e: VotingError, context: &str) -> HttpResponse {
    match e {
        VotingError::CampaignNotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Campaign not found".to_string(),
        }),
        VotingError::CandidateNotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Candidate not found in this campaign".to_string(),
        }),
        VotingError::Validation(field) => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: format!("Invalid {field}"),
        }),
        VotingError::MembershipRequired => HttpResponse::BadRequest().json(ApiError {
            error: "membership_required".to_string(),
            message: "Voting requires an active membership".to_string(),
        }),
        VotingError::VotingClosed => HttpResponse::BadRequest().json(ApiError {
            error: "voting_closed".to_string(),
            message: "Voting is not open for this campaign".to_string(),
        }),
        VotingError::AlreadyVoted => HttpResponse::BadRequest().json(ApiError {
            error: "already_voted".to_string(),
            message: "Already voted in this campaign".to_string(),
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

async fn list_campaigns(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    if crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret).is_err() {
        return Ok(HttpResponse::Unauthorized().json(ApiError {
            error: "unauthorized".to_string(),
            message: "Invalid or missing token".to_string(),
        }));
    }

    match voting_service::list_campaigns(&state.db).await {
        Ok(campaigns) => Ok(HttpResponse::Ok().json(ApiSuccess::new(campaigns))),
        Err(e) => Ok(voting_error_response(e, "listing campaigns")),
    }
}

async fn get_campaign(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret).is_err() {
        return Ok(HttpResponse::Unauthorized().json(ApiError {
            error: "unauthorized".to_string(),
            message: "Invalid or missing token".to_string(),
        }));
    }

    let campaign_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid campaign ID format".to_string(),
            }));
        }
    };

    match voting_service::get_campaign(&state.db, &campaign_id).await {
        Ok(campaign) => Ok(HttpResponse::Ok().json(ApiSuccess::new(campaign))),
        Err(e) => Ok(voting_error_response(e, "fetching a campaign")),
    }
}

async fn create_campaign(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateCampaignRequest>,
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

    match auth_service::is_admin(&state.db, &user_id).await {
        Ok(true) => {}
        Ok(false) => {
            return Ok(HttpResponse::Forbidden().json(ApiError {
                error: "forbidden".to_string(),
                message: "Administrator role required".to_string(),
            }));
        }
        Err(e) => {
            log::error!("Error checking admin role: {:?}", e);
            return Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to authorize request".to_string(),
            }));
        }
    }

    match voting_service::create_campaign(&state.db, &user_id, &body).await {
        Ok(campaign) => Ok(HttpResponse::Created().json(ApiSuccess::new(campaign))),
        Err(e) => Ok(voting_error_response(e, "creating a campaign")),
    }
}

async fn cast_vote(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<CastVoteRequest>,
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

    let campaign_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid campaign ID format".to_string(),
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
                message: "Failed to cast vote".to_string(),
            }));
        }
    };

    match voting_service::cast_vote(&state.db, &user, &campaign_id, &body.candidate_id).await {
        Ok(campaign) => Ok(HttpResponse::Created().json(ApiSuccess::new(campaign))),
        Err(e) => Ok(voting_error_response(e, "casting a vote")),
    }
}
