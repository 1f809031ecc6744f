use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    BlockProvenance, DateRange, GuestContact, PriceOverride, PropertyId, ReservationId,
};
use super::ical::{CalendarSync, IcsImportError};
use super::pricing::{PricingCalendar, RateCard};
use super::repository::{BlockedDateRepository, RepositoryError, ReservationRepository};
use super::service::{ReservationError, ReservationRequest, ReservationService};

/// Router builder exposing the engine over HTTP for the host process.
/// Property rates and price overrides are owned by the surrounding
/// marketplace and arrive inside each payload.
pub fn reservation_router<R, B>(service: Arc<ReservationService<R, B>>) -> Router
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    Router::new()
        .route("/api/v1/reservations", post(reserve_handler::<R, B>))
        .route(
            "/api/v1/reservations/:reservation_id",
            get(fetch_handler::<R, B>),
        )
        .route(
            "/api/v1/reservations/:reservation_id/confirm",
            post(confirm_handler::<R, B>),
        )
        .route(
            "/api/v1/reservations/:reservation_id/reject",
            post(reject_handler::<R, B>),
        )
        .route(
            "/api/v1/reservations/:reservation_id/cancel",
            post(cancel_handler::<R, B>),
        )
        .route(
            "/api/v1/properties/:property_id/availability/validate",
            post(validate_handler::<R, B>),
        )
        .route(
            "/api/v1/properties/:property_id/calendar",
            get(list_blocked_handler::<R, B>),
        )
        .route(
            "/api/v1/properties/:property_id/calendar/block",
            post(manual_block_handler::<R, B>),
        )
        .route(
            "/api/v1/properties/:property_id/calendar/unblock",
            post(manual_unblock_handler::<R, B>),
        )
        .route(
            "/api/v1/properties/:property_id/calendar/import",
            post(import_ics_handler::<R, B>),
        )
        .route(
            "/api/v1/properties/:property_id/calendar/export",
            get(export_ics_handler::<R, B>),
        )
        .route("/api/v1/quotes", post(quote_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReserveKind {
    ShortStay,
    SeasonRental,
}

#[derive(Debug, Deserialize)]
struct ReservePayload {
    kind: ReserveKind,
    property_id: String,
    range: DateRange,
    guest: GuestContact,
    occupant_count: u32,
    rates: RateCard,
    #[serde(default)]
    overrides: Vec<PriceOverride>,
}

#[derive(Debug, Default, Deserialize)]
struct NotePayload {
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangePayload {
    range: DateRange,
}

#[derive(Debug, Deserialize)]
struct CalendarWindow {
    from: NaiveDate,
    to: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    range: DateRange,
    rates: RateCard,
    #[serde(default)]
    overrides: Vec<PriceOverride>,
}

async fn reserve_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Json(payload): Json<ReservePayload>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let request = ReservationRequest {
        property_id: PropertyId(payload.property_id),
        range: payload.range,
        guest: payload.guest,
        occupant_count: payload.occupant_count,
    };
    let overrides = PriceOverride::into_map(payload.overrides);

    let created = match payload.kind {
        ReserveKind::ShortStay => {
            service.reserve_short_stay(request, &payload.rates, &overrides)
        }
        ReserveKind::SeasonRental => service.reserve_season_rental(request, &payload.rates),
    };

    match created {
        Ok(reservation) => (StatusCode::CREATED, Json(reservation)).into_response(),
        Err(err) => reservation_error_response(err),
    }
}

async fn fetch_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(reservation_id): Path<String>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    match service.get(&ReservationId(reservation_id)) {
        Ok(reservation) => (StatusCode::OK, Json(reservation)).into_response(),
        Err(err) => reservation_error_response(err),
    }
}

async fn confirm_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(reservation_id): Path<String>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    match service.confirm(&ReservationId(reservation_id)) {
        Ok(reservation) => (StatusCode::OK, Json(reservation)).into_response(),
        Err(err) => reservation_error_response(err),
    }
}

async fn reject_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(reservation_id): Path<String>,
    payload: Option<Json<NotePayload>>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let note = payload.and_then(|Json(body)| body.note);
    match service.reject(&ReservationId(reservation_id), note) {
        Ok(reservation) => (StatusCode::OK, Json(reservation)).into_response(),
        Err(err) => reservation_error_response(err),
    }
}

async fn cancel_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(reservation_id): Path<String>,
    payload: Option<Json<NotePayload>>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let note = payload.and_then(|Json(body)| body.note);
    match service.cancel(&ReservationId(reservation_id), note) {
        Ok(reservation) => (StatusCode::OK, Json(reservation)).into_response(),
        Err(err) => reservation_error_response(err),
    }
}

async fn validate_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(property_id): Path<String>,
    Json(payload): Json<RangePayload>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let property = PropertyId(property_id);
    match service
        .ledger()
        .validate_candidate(&property, &payload.range)
    {
        Ok(validation) => (StatusCode::OK, Json(validation)).into_response(),
        Err(err) => storage_error_response(err.into_repository()),
    }
}

async fn list_blocked_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(property_id): Path<String>,
    Query(window): Query<CalendarWindow>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let property = PropertyId(property_id);
    match service
        .ledger()
        .entries_in_range(&property, window.from, window.to)
    {
        Ok(entries) => (StatusCode::OK, Json(json!({ "blocked": entries }))).into_response(),
        Err(err) => storage_error_response(err.into_repository()),
    }
}

async fn manual_block_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(property_id): Path<String>,
    Json(payload): Json<RangePayload>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let property = PropertyId(property_id);
    match service
        .ledger()
        .block(&property, &payload.range, BlockProvenance::Manual)
    {
        Ok(added) => (StatusCode::OK, Json(json!({ "added": added }))).into_response(),
        Err(err) => storage_error_response(err.into_repository()),
    }
}

async fn manual_unblock_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(property_id): Path<String>,
    Json(payload): Json<RangePayload>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let property = PropertyId(property_id);
    match service
        .ledger()
        .unblock(&property, &payload.range, BlockProvenance::Manual)
    {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(err) => storage_error_response(err.into_repository()),
    }
}

async fn import_ics_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(property_id): Path<String>,
    body: String,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let property = PropertyId(property_id);
    let sync = CalendarSync::new(service.ledger().clone());
    match sync.import_ics(&property, &body) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(IcsImportError::Ledger(err)) => storage_error_response(err.into_repository()),
        Err(parse_err) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": parse_err.to_string() })),
        )
            .into_response(),
    }
}

async fn export_ics_handler<R, B>(
    State(service): State<Arc<ReservationService<R, B>>>,
    Path(property_id): Path<String>,
) -> Response
where
    R: ReservationRepository + 'static,
    B: BlockedDateRepository + 'static,
{
    let property = PropertyId(property_id);
    let sync = CalendarSync::new(service.ledger().clone());
    match sync.export_ics(&property) {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/calendar; charset=utf-8")],
            text,
        )
            .into_response(),
        Err(err) => storage_error_response(err.into_repository()),
    }
}

async fn quote_handler(Json(payload): Json<QuotePayload>) -> Response {
    let calendar = PricingCalendar::new(payload.rates);
    let overrides = PriceOverride::into_map(payload.overrides);
    match calendar.quote(&payload.range, &overrides) {
        Ok(total) => (
            StatusCode::OK,
            Json(json!({
                "total": total,
                "nights": payload.range.nights(),
            })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

fn reservation_error_response(err: ReservationError) -> Response {
    let status = match &err {
        ReservationError::MissingGuestName
        | ReservationError::MissingGuestEmail
        | ReservationError::NoOccupants
        | ReservationError::StayLengthOutOfBounds { .. }
        | ReservationError::Quote(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReservationError::InvalidTransition { .. } | ReservationError::RangeUnavailable { .. } => {
            StatusCode::CONFLICT
        }
        ReservationError::NotFound { .. } => StatusCode::NOT_FOUND,
        ReservationError::ConfirmationFailed { .. }
        | ReservationError::PartialCancellation { .. }
        | ReservationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut body = json!({ "error": err.to_string() });
    if let ReservationError::RangeUnavailable { days } = &err {
        body["conflicting_days"] = json!(days);
    }

    (status, Json(body)).into_response()
}

fn storage_error_response(err: RepositoryError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}
