use actix_web::{web, HttpResponse, Result};
use serde::Serialize;
use shared::{ApiError, ApiSuccess, CreateEventRequest, EventAttendee, UpdateEventRequest, UpstreamError};
use uuid::Uuid;

use crate::models::AppState;
use crate::services::{auth as auth_service, events as events_service};
use crate::services::events::{EventError, TicketPurchase};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .route("", web::get().to(list_events))
            .route("", web::post().to(create_event))
            .route("/{id}", web::get().to(get_event))
            .route("/{id}", web::put().to(update_event))
            .route("/{id}", web::delete().to(delete_event))
            .route("/{id}/tickets", web::post().to(purchase_ticket))
            .route("/{id}/attendees", web::get().to(list_attendees)),
    );
}

/// Either the confirmed ticket (free events) or a checkout handoff
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum TicketResponse {
    Ticket(EventAttendee),
    Checkout { checkout_url: String },
}

fn event_error_response(e: EventError, context: &str) -> HttpResponse {
    match e {
        EventError::NotFound => HttpResponse::NotFound().json(ApiError {
            error: "not_found".to_string(),
            message: "Event not found".to_string(),
        }),
        EventError::Validation(field) => HttpResponse::BadRequest().json(ApiError {
            error: "validation_error".to_string(),
            message: format!("Invalid {field}"),
        }),
        EventError::AlreadyAttending => HttpResponse::BadRequest().json(ApiError {
            error: "already_attending".to_string(),
            message: "Already holding a ticket for this event".to_string(),
        }),
        EventError::SoldOut => HttpResponse::BadRequest().json(ApiError {
            error: "sold_out".to_string(),
            message: "Event is sold out".to_string(),
        }),
        EventError::AlreadyStarted => HttpResponse::BadRequest().json(ApiError {
            error: "already_started".to_string(),
            message: "Event has already started".to_string(),
        }),
        ref e2 if e2.is_retryable() => HttpResponse::ServiceUnavailable().json(UpstreamError {
            error: "upstream_unavailable".to_string(),
            message: "Payment provider is unavailable, try again".to_string(),
            retryable: true,
        }),
        EventError::Billing(_) => HttpResponse::BadGateway().json(UpstreamError {
            error: "upstream_rejected".to_string(),
            message: "Payment provider rejected the request".to_string(),
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

async fn require_user(
    state: &AppState,
    req: &actix_web::HttpRequest,
) -> Result<Uuid, HttpResponse> {
    crate::middleware::auth::extract_user_id(req, &state.config.jwt_secret).map_err(|_| {
        HttpResponse::Unauthorized().json(ApiError {
            error: "unauthorized".to_string(),
            message: "Invalid or missing token".to_string(),
        })
    })
}

async fn require_event_admin(
    state: &AppState,
    req: &actix_web::HttpRequest,
) -> Result<Uuid, HttpResponse> {
    let user_id = require_user(state, req).await?;

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

async fn list_events(state: web::Data<AppState>, req: actix_web::HttpRequest) -> Result<HttpResponse> {
    if let Err(response) = require_user(&state, &req).await {
        return Ok(response);
    }

    match events_service::list_events(&state.db).await {
        Ok(events) => Ok(HttpResponse::Ok().json(ApiSuccess::new(events))),
        Err(e) => {
            log::error!("Error listing events: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list events".to_string(),
            }))
        }
    }
}

async fn get_event(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(response) = require_user(&state, &req).await {
        return Ok(response);
    }

    let event_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid event ID format".to_string(),
            }));
        }
    };

    match events_service::get_event(&state.db, &event_id).await {
        Ok(event) => Ok(HttpResponse::Ok().json(ApiSuccess::new(event))),
        Err(e) => Ok(event_error_response(e, "fetching an event")),
    }
}

async fn create_event(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    body: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_event_admin(&state, &req).await {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    match events_service::create_event(&state.db, &user_id, &body).await {
        Ok(event) => Ok(HttpResponse::Created().json(ApiSuccess::new(event))),
        Err(e) => Ok(event_error_response(e, "creating an event")),
    }
}

async fn update_event(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
    body: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse> {
    if let Err(response) = require_event_admin(&state, &req).await {
        return Ok(response);
    }

    let event_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid event ID format".to_string(),
            }));
        }
    };

    match events_service::update_event(&state.db, &event_id, &body).await {
        Ok(event) => Ok(HttpResponse::Ok().json(ApiSuccess::new(event))),
        Err(e) => Ok(event_error_response(e, "updating an event")),
    }
}

async fn delete_event(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(response) = require_event_admin(&state, &req).await {
        return Ok(response);
    }

    let event_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid event ID format".to_string(),
            }));
        }
    };

    match events_service::delete_event(&state.db, &event_id).await {
        Ok(()) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Ok(event_error_response(e, "deleting an event")),
    }
}

async fn purchase_ticket(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let user_id = match require_user(&state, &req).await {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let event_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid event ID format".to_string(),
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
                message: "Failed to purchase ticket".to_string(),
            }));
        }
    };

    match events_service::purchase_ticket(
        &state.db,
        state.payments.as_ref(),
        &state.config,
        &user,
        &event_id,
    )
    .await
    {
        Ok(TicketPurchase::Confirmed(attendee)) => {
            Ok(HttpResponse::Created().json(ApiSuccess::new(TicketResponse::Ticket(attendee))))
        }
        Ok(TicketPurchase::CheckoutRequired(session)) => Ok(HttpResponse::Created()
            .json(ApiSuccess::new(TicketResponse::Checkout { checkout_url: session.url }))),
        Err(e) => Ok(event_error_response(e, "purchasing a ticket")),
    }
}

async fn list_attendees(
    state: web::Data<AppState>,
    req: actix_web::HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    if let Err(response) = require_event_admin(&state, &req).await {
        return Ok(response);
    }

    let event_id = match Uuid::parse_str(&path.into_inner()) {
        Ok(id) => id,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(ApiError {
                error: "invalid_id".to_string(),
                message: "Invalid event ID format".to_string(),
            }));
        }
    };

    match events_service::list_attendees(&state.db, &event_id).await {
        Ok(attendees) => Ok(HttpResponse::Ok().json(ApiSuccess::new(attendees))),
        Err(e) => {
            log::error!("Error listing attendees: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ApiError {
                error: "internal_error".to_string(),
                message: "Failed to list attendees".to_string(),
            }))
        }
    }
}
