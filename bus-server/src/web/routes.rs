//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::booking::{
    BookingError, DEFAULT_RECENT_LIMIT, LookupError, PaymentForm, PersonalForm, Stage,
    TripSummary, ValidationError,
};
use crate::domain::{DomainError, RouteId, SearchQuery, parse_date};
use crate::store::{FixedIdentity, IdentityProvider, UserId};
use crate::timetable::DisplaySegment;

use super::dto::*;
use super::state::AppState;

/// Header carrying the signed-in user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Largest history page served.
const MAX_RECENT_LIMIT: usize = 50;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/routes/search", get(search_routes))
        .route("/routes/:route/segment", get(route_segment))
        .route("/routes/:route/seats", get(route_seats))
        .route("/booking/:session", get(current_draft))
        .route("/booking/:session/trip", post(choose_trip))
        .route("/booking/:session/seats", post(choose_seats))
        .route("/booking/:session/details", post(enter_details))
        .route("/booking/:session/payment", post(enter_payment))
        .route("/booking/:session/commit", post(commit_booking))
        .route("/booking/:session/confirmation", get(confirmation))
        .route("/bookings/recent", get(recent_bookings))
        .route("/bookings/:code", get(booking_by_code))
        .route("/notifications", get(notifications))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The identity a request carries, if any.
fn identity(headers: &HeaderMap) -> FixedIdentity {
    FixedIdentity(
        headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(UserId::new),
    )
}

fn parse_route(raw: &str) -> Result<RouteId, AppError> {
    RouteId::parse(raw).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })
}

/// Parse a JSON body by hand so a bad body is logged.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, body = %String::from_utf8_lossy(body), "rejected request body");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })
}

/// Routes serving a search, each as a route card.
async fn search_routes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = SearchQuery::parse(
        state.flow.topology(),
        &params.from,
        &params.to,
        &params.date,
    )?;
    let routes = state.flow.search(&query).await?;

    Ok(Json(SearchResponse {
        date: query.date.format("%Y-%m-%d").to_string(),
        from: query.from,
        to: query.to,
        routes,
    }))
}

/// One route's stops between a search's origin and destination.
async fn route_segment(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Query(params): Query<SegmentParams>,
) -> Result<Json<SegmentResponse>, AppError> {
    let route = parse_route(&route)?;
    let preview = params.preview().ok_or_else(|| AppError::BadRequest {
        message: format!(
            "Unknown preview: {}",
            params.preview.as_deref().unwrap_or("")
        ),
    })?;

    let topology = state.flow.topology();
    let query = SearchQuery::parse(
        topology,
        &params.search.from,
        &params.search.to,
        &params.search.date,
    )?;
    let found = topology.route(&route)?;
    let segment = DisplaySegment::for_route(found, &query.from, &query.to, preview, query.date)?;

    Ok(Json(SegmentResponse {
        fare: found.fare().to_string(),
        segment,
    }))
}

/// Occupied seats on a route-date.
async fn route_seats(
    State(state): State<AppState>,
    Path(route): Path<String>,
    Query(params): Query<SeatsParams>,
) -> Result<Json<SeatsResponse>, AppError> {
    let route = parse_route(&route)?;
    let date = parse_date(&params.date)?;
    let availability = state.flow.availability(&route, date).await?;

    Ok(Json(SeatsResponse {
        date: date.format("%Y-%m-%d").to_string(),
        availability,
    }))
}

/// The session's booking in progress.
async fn current_draft(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<DraftResponse>, AppError> {
    let draft = state.flow.draft(&session).await?;
    Ok(Json(DraftResponse::new(draft)))
}

/// Start a booking for a route from the search results.
async fn choose_trip(
    State(state): State<AppState>,
    Path(session): Path<String>,
    body: Bytes,
) -> Result<Json<DraftResponse>, AppError> {
    let req: TripRequest = parse_body(&body)?;
    let route = parse_route(&req.route)?;
    let query = SearchQuery::parse(state.flow.topology(), &req.from, &req.to, &req.date)?;

    let draft = state.flow.begin(&session, &route, &query).await?;
    Ok(Json(DraftResponse::new(Some(draft))))
}

async fn choose_seats(
    State(state): State<AppState>,
    Path(session): Path<String>,
    body: Bytes,
) -> Result<Json<DraftResponse>, AppError> {
    let req: SeatsRequest = parse_body(&body)?;
    let draft = state.flow.submit_seats(&session, &req.seats).await?;
    Ok(Json(DraftResponse::new(Some(draft))))
}

async fn enter_details(
    State(state): State<AppState>,
    Path(session): Path<String>,
    body: Bytes,
) -> Result<Json<DraftResponse>, AppError> {
    let form: PersonalForm = parse_body(&body)?;
    let draft = state.flow.submit_details(&session, &form).await?;
    Ok(Json(DraftResponse::new(Some(draft))))
}

async fn enter_payment(
    State(state): State<AppState>,
    Path(session): Path<String>,
    body: Bytes,
) -> Result<Json<DraftResponse>, AppError> {
    let form: PaymentForm = parse_body(&body)?;
    let draft = state.flow.submit_payment(&session, &form).await?;
    Ok(Json(DraftResponse::new(Some(draft))))
}

/// Commit the session's booking.
async fn commit_booking(
    State(state): State<AppState>,
    Path(session): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ConfirmationResponse>, AppError> {
    let summary = state.flow.commit(&session, &identity(&headers)).await?;
    Ok(Json(summary.into()))
}

/// The session's last confirmed booking.
async fn confirmation(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<ConfirmationResponse>, AppError> {
    let summary = state.flow.confirmation(&session).await?;
    Ok(Json(summary.into()))
}

/// Most recent bookings, newest first.
async fn recent_bookings(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<RecentResponse>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT);
    let bookings = state.flow.recent_bookings(limit).await?;

    Ok(Json(RecentResponse {
        bookings: bookings.into_iter().map(Into::into).collect(),
    }))
}

/// A booking by its confirmation code.
async fn booking_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ConfirmationResponse>, AppError> {
    let booking = state.flow.booking(&code).await?;
    Ok(Json(TripSummary::new(&code, &booking).into()))
}

/// The signed-in user's notifications.
async fn notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NotificationsResponse>, AppError> {
    let user = identity(&headers)
        .current_user_id()
        .ok_or_else(|| AppError::Unauthorized {
            message: format!("Sign in required ({USER_ID_HEADER} header)"),
        })?;
    let notifications = state.flow.notifications_for(&user).await?;
    Ok(Json(NotificationsResponse { notifications }))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Unauthorized { message: String },
    NotFound { message: String },
    Invalid(ValidationError),
    Conflict { message: String, restart_at: Option<Stage> },
    Unavailable { message: String, restart_at: Option<Stage> },
    Internal { message: String },
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UnknownStop(_)
            | DomainError::UnknownRoute(_)
            | DomainError::StopNotOnRoute { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            DomainError::SameStops | DomainError::InvalidDate(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            DomainError::InvalidRouteConfig { .. } => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<BookingError> for AppError {
    fn from(e: BookingError) -> Self {
        let restart_at = e.restart_at();
        let message = e.to_string();
        match e {
            BookingError::Validation(v) => AppError::Invalid(v),
            BookingError::Lookup(LookupError::Domain(d)) => d.into(),
            BookingError::Lookup(lookup) => AppError::NotFound {
                message: lookup.to_string(),
            },
            BookingError::Persistence(_) => AppError::Unavailable {
                message,
                restart_at,
            },
            BookingError::StaleDraft { .. } | BookingError::SeatConflict { .. } => {
                AppError::Conflict {
                    message,
                    restart_at,
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, plain(message)),
            AppError::Unauthorized { message } => (StatusCode::UNAUTHORIZED, plain(message)),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, plain(message)),
            AppError::Invalid(v) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: v.message,
                    field: Some(v.field),
                    restart_at: None,
                },
            ),
            AppError::Conflict {
                message,
                restart_at,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: message,
                    field: None,
                    restart_at,
                },
            ),
            AppError::Unavailable {
                message,
                restart_at,
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse {
                    error: message,
                    field: None,
                    restart_at,
                },
            ),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, plain(message)),
        };

        if status.is_server_error() {
            warn!(%status, error = %body.error, "request failed");
        } else {
            debug!(%status, error = %body.error, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

fn plain(error: String) -> ErrorResponse {
    ErrorResponse {
        error,
        field: None,
        restart_at: None,
    }
}
