use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    ApiError, ApiSuccess, CheckoutResponse, CreateFamilyMemberRequest, RejectApplicationRequest,
    SubmitApplicationRequest, SubmitApplicationResponse, UpdateFamilyMemberRequest, UpstreamError,
};

use crate::models::AppState;
use crate::services::{
    auth as auth_service, documents as documents_service,
    immediate_family as immediate_family_service, welfare as welfare_service,
    welfare_applications as applications_service,
};
use crate::services::billing::BillingError;
use crate::services::documents::DocumentError;
use crate::services::immediate_family::FamilyError;
use crate::services::welfare::WelfareError;
use crate::services::welfare_applications::ApplicationError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/welfare")
            .route("/register", web::post().to(register))
            .route("/complete-payment", web::post().to(complete_payment))
            .route("/eligibility", web::get().to(eligibility))
            .route("/status", web::get().to(status))
            .route("/apply", web::post().to(apply))
            .route("/documents", web::post().to(upload_document))
            .route("/immediate-family", web::get().to(list_family))
            .route("/immediate-family", web::post().to(add_family))
            .route("/immediate-family/{id}", web::put().to(update_family))
            .route("/immediate-family/{id}", web::delete().to(delete_family))
            .route("/immediate-family/{id}/documents", web::post().to(add_family_document))
            .route("/immediate-family/{id}/documents", web::get().to(list_family_documents))
            .route("/family-documents/{id}", web::delete().to(delete_family_document))
            .route("/applications", web::get().to(list_applications))
            .route("/applications/{id}/approve", web::post().to(approve_application))
            .route("/applications/{id}/reject", web::post().to(reject_application))
            .route("/applications/{id}/payout", web::post().to(payout_application))
            .route("/reimbursements", web::get().to(list_reimbursements))
            .route("/reimbursements/{id}/complete", web::post().to(complete_reimbursement)),
    );
}

fn billing_response(e: &BillingError) -> HttpResponse {
    if e.is_retryable() {
        HttpResponse::ServiceUnavailable().json(UpstreamError {
            error: "upstream_unavailable".to_string(),
            message: "Payment provider is unavailable, try again".to_string(),
            retryable: true,
        })
    } else {
        HttpResponse::BadGateway().json(UpstreamError {
            error: "upstream_rejected".to_string(),
            message: "Payment provider rejected the request".to_string(),
            retryable: false,
        })
    }
}

async fn register(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
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
                message: "Failed to register".to_string(),
            }));
        }
    };

    match welfare_service::register(&state.db, state.payments.as_ref(), &state.config, &user).await
    {
        Ok(session) => Ok(HttpResponse::Created()
            .json(ApiSuccess::new(CheckoutResponse { checkout_url: session.url }))),
        Err(WelfareError::AlreadyRegistered) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "already_registered".to_string(),
            message: "A welfare registration already exists for this user".to_string(),
        })),
        Err(WelfareError::Billing(ref e)) => Ok(billing_response(e)),
        Err(e) => {
            log::error!("Error registering for welfare fund: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to register".to_string(),
            }))
        }
    }
}

async fn complete_payment(
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
                message: "Failed to complete payment".to_string(),
            }));
        }
    };

    match welfare_service::complete_payment(&state.db, state.payments.as_ref(), &state.config, &user)
        .await
    {
        Ok(session) => Ok(HttpResponse::Ok()
            .json(ApiSuccess::new(CheckoutResponse { checkout_url: session.url }))),
        Err(WelfareError::NoRegistrationFound) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "no_registration".to_string(),
            message: "No welfare registration found".to_string(),
        })),
        Err(WelfareError::AlreadyPaid) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "already_paid".to_string(),
            message: "Registration fee has already been paid".to_string(),
        })),
        Err(WelfareError::Billing(ref e)) => Ok(billing_response(e)),
        Err(e) => {
            log::error!("Error completing registration payment: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to complete payment".to_string(),
            }))
        }
    }
}

async fn eligibility(
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

    match welfare_service::check_eligibility(&state.db, &state.config, &user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiSuccess::new(response))),
        Err(e) => {
            log::error!("Error checking eligibility: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to check eligibility".to_string(),
            }))
        }
    }
}

async fn status(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match welfare_service::get_status(&state.db, &state.config, &user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiSuccess::new(response))),
        Err(e) => {
            log::error!("Error fetching welfare status: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to fetch welfare status".to_string(),
            }))
        }
    }
}

async fn apply(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<SubmitApplicationRequest>,
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

    match applications_service::submit_application(&state.db, &state.config, &user_id, &body).await
    {
        Ok(application) => Ok(HttpResponse::Created().json(ApiSuccess::new(
            SubmitApplicationResponse { application_id: application.id },
        ))),
        Err(ApplicationError::Ineligible(reason)) => {
            Ok(HttpResponse::BadRequest().json(ApiError {
                error: "not_eligible".to_string(),
                message: reason,
            }))
        }
        Err(ApplicationError::Validation(field)) => Ok(HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: format!("Invalid {field}"),
        })),
        Err(e) => {
            log::error!("Error submitting application: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to submit application".to_string(),
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    file_name: String,
}

fn content_type_of(req: &actix_web::HttpRequest) -> String {
    req.headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn document_error_response(e: DocumentError, context: &str) -> HttpResponse {
    match e {
        DocumentError::UnsupportedType(ct) => HttpResponse::BadRequest().json(ApiError {
            error: "unsupported_type".to_string(),
            message: format!("Unsupported file type: {ct}"),
        }),
        DocumentError::TooLarge => HttpResponse::BadRequest().json(ApiError {
            error: "too_large".to_string(),
            message: "File exceeds the 5 MiB limit".to_string(),
        }),
        DocumentError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Document not found".to_string(),
        }),
        DocumentError::Storage(crate::providers::StorageError::Unavailable(_)) => {
            HttpResponse::ServiceUnavailable().json(UpstreamError {
                error: "upstream_unavailable".to_string(),
                message: "Object storage is unavailable, try again".to_string(),
                retryable: true,
            })
        }
        DocumentError::Storage(_) => HttpResponse::BadGateway().json(UpstreamError {
            error: "upstream_rejected".to_string(),
            message: "Object storage rejected the upload".to_string(),
            retryable: false,
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

async fn upload_document(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
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

    let content_type = content_type_of(&req);

    match documents_service::store_upload(
        state.storage.as_ref(),
        &user_id,
        &query.file_name,
        &content_type,
        body.to_vec(),
    )
    .await
    {
        Ok(document) => Ok(HttpResponse::Created().json(ApiSuccess::new(document))),
        Err(e) => Ok(document_error_response(e, "uploading document")),
    }
}

async fn list_family(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(&req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match immediate_family_service::list_family_members(&state.db, &user_id).await {
        Ok(members) => Ok(HttpResponse::Ok().json(ApiSuccess::new(members))),
        Err(e) => {
            log::error!("Error listing family members: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list family members".to_string(),
            }))
        }
    }
}

fn family_error_response(e: FamilyError, context: &str) -> HttpResponse {
    match e {
        FamilyError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Family member not found".to_string(),
        }),
        FamilyError::Validation(field) => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: format!("Invalid {field}"),
        }),
        FamilyError::LastMember => HttpResponse::BadRequest().json(ApiError {
            error: "invariant_violation".to_string(),
            message: "A paid registration must retain at least one family member".to_string(),
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

async fn add_family(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateFamilyMemberRequest>,
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

    match immediate_family_service::add_family_member(&state.db, &user_id, &body).await {
        Ok(member) => Ok(HttpResponse::Created().json(ApiSuccess::new(member))),
        Err(e) => Ok(family_error_response(e, "adding a family member")),
    }
}

async fn update_family(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateFamilyMemberRequest>,
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

    let member_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid family member ID format".to_string(),
            }));
        }
    };

    match immediate_family_service::update_family_member(&state.db, &user_id, &member_id, &body)
        .await
    {
        Ok(member) => Ok(HttpResponse::Ok().json(ApiSuccess::new(member))),
        Err(e) => Ok(family_error_response(e, "updating a family member")),
    }
}

async fn delete_family(
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

    let member_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid family member ID format".to_string(),
            }));
        }
    };

    match immediate_family_service::delete_family_member(&state.db, &user_id, &member_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(family_error_response(e, "deleting a family member")),
    }
}

async fn add_family_document(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
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

    let member_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid family member ID format".to_string(),
            }));
        }
    };

    let content_type = content_type_of(&req);

    match documents_service::add_family_document(
        &state.db,
        state.storage.as_ref(),
        &user_id,
        &member_id,
        &query.file_name,
        &content_type,
        body.to_vec(),
    )
    .await
    {
        Ok(document) => Ok(HttpResponse::Created().json(ApiSuccess::new(document))),
        Err(e) => Ok(document_error_response(e, "uploading a family document")),
    }
}

async fn list_family_documents(
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

    let member_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid family member ID format".to_string(),
            }));
        }
    };

    match documents_service::list_family_documents(&state.db, &user_id, &member_id).await {
        Ok(documents) => Ok(HttpResponse::Ok().json(ApiSuccess::new(documents))),
        Err(e) => Ok(document_error_response(e, "listing family documents")),
    }
}

async fn delete_family_document(
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

    let document_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid document ID format".to_string(),
            }));
        }
    };

    match documents_service::delete_family_document(&state.db, &user_id, &document_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(document_error_response(e, "deleting a family document")),
    }
}

/// Admin gate shared by the back-office routes below
async fn require_admin(state: &AppState, req: &actix_web::HttpRequest) -> Result<Uuid, HttpResponse> {
    let user_id = match crate::middleware::auth::extract_user_id(req, &state.config.jwt_secret) {
        Ok(id) => id,
        Err(_) => {
            return Err(HttpResponse::Unauthorized().json(ApiError {
                error: "unauthorized".to_string(),
                message: "Invalid or missing token".to_string(),
            }));
        }
    };

    match auth_service::is_admin(&state.db, &user_id).await {
        Ok(true) => Ok(user_id),
        Ok(false) => Err(HttpResponse::Forbidden().json(ApiError {
            error: "forbidden".to_string(),
            message: "Administrator role required".to_string(),
        })),
        Err(e) => {
            log::error!("Error checking admin role: {:?}", e);
            Err(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to authorize request".to_string(),
            }))
        }
    }
}

fn application_error_response(e: ApplicationError, context: &str) -> HttpResponse {
    match e {
        ApplicationError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Application not found".to_string(),
        }),
        ApplicationError::ReimbursementNotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Reimbursement not found".to_string(),
        }),
        ApplicationError::Validation(field) => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: format!("Invalid {field}"),
        }),
        ApplicationError::InvalidTransition { action, status } => {
            HttpResponse::BadRequest().json(ApiError {
                error: "invalid_transition".to_string(),
                message: format!("Cannot {action} an application in status {status}"),
            })
        }
        ApplicationError::Ineligible(reason) => HttpResponse::BadRequest().json(ApiError {
            error: "not_eligible".to_string(),
            message: reason,
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

async fn list_applications(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    if let Err(response) = require_admin(&state, &req).await {
        return Ok(response);
    }

    match applications_service::list_all(&state.db).await {
        Ok(applications) => Ok(HttpResponse::Ok().json(ApiSuccess::new(applications))),
        Err(e) => {
            log::error!("Error listing applications: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list applications".to_string(),
            }))
        }
    }
}

async fn approve_application(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(response) = require_admin(&state, &req).await {
        return Ok(response);
    }

    let application_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid application ID format".to_string(),
            }));
        }
    };

    match applications_service::approve_application(&state.db, &application_id).await {
        Ok(application) => Ok(HttpResponse::Ok().json(ApiSuccess::new(application))),
        Err(e) => Ok(application_error_response(e, "approving an application")),
    }
}

async fn reject_application(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<RejectApplicationRequest>,
) -> Result<HttpResponse> {
    if let Err(response) = require_admin(&state, &req).await {
        return Ok(response);
    }

    let application_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid application ID format".to_string(),
            }));
        }
    };

    match applications_service::reject_application(&state.db, &application_id, &body.reason).await {
        Ok(application) => Ok(HttpResponse::Ok().json(ApiSuccess::new(application))),
        Err(e) => Ok(application_error_response(e, "rejecting an application")),
    }
}

async fn payout_application(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(response) = require_admin(&state, &req).await {
        return Ok(response);
    }

    let application_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid application ID format".to_string(),
            }));
        }
    };

    match applications_service::payout_application(&state.db, &application_id).await {
        Ok(application) => Ok(HttpResponse::Ok().json(ApiSuccess::new(application))),
        Err(e) => Ok(application_error_response(e, "paying out an application")),
    }
}

async fn list_reimbursements(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse> {
    if let Err(response) = require_admin(&state, &req).await {
        return Ok(response);
    }

    match applications_service::list_reimbursements(&state.db).await {
        Ok(reimbursements) => Ok(HttpResponse::Ok().json(ApiSuccess::new(reimbursements))),
        Err(e) => {
            log::error!("Error listing reimbursements: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list reimbursements".to_string(),
            }))
        }
    }
}

async fn complete_reimbursement(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(response) = require_admin(&state, &req).await {
        return Ok(response);
    }

    let reimbursement_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid reimbursement ID format".to_string(),
            }));
        }
    };

    match applications_service::complete_reimbursement(&state.db, &reimbursement_id).await {
        Ok(reimbursement) => Ok(HttpResponse::Ok().json(ApiSuccess::new(reimbursement))),
        Err(e) => Ok(application_error_response(e, "completing a reimbursement")),
    }
}
