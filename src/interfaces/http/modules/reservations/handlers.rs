//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use crate::application::{BookingCoordinator, LifecycleService, ReservationQueries};
use crate::domain::{
    DomainResult, LifecycleAction, Reservation, ReservationFilter, ReservationStatus,
};
use crate::interfaces::http::common::{
    domain_error, ApiError, ApiResponse, ApiResult, PaginatedResponse, ValidatedJson,
};
use crate::shared::types::PaginationParams;

use super::dto::*;

/// Application state for reservation handlers.
#[derive(Clone)]
pub struct ReservationAppState {
    pub coordinator: Arc<BookingCoordinator>,
    pub lifecycle: LifecycleService,
    pub queries: ReservationQueries,
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    request_body = ReservationRequest,
    responses(
        (status = 201, description = "Reservation created (Pending)", body = ApiResponse<ReservationResponse>),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Room already booked for an overlapping stay")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    ValidatedJson(request): ValidatedJson<ReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationResponse>>), ApiError<ReservationResponse>> {
    let (draft, _) = request.into_draft();
    let reservation = state
        .coordinator
        .create_reservation(draft)
        .await
        .map_err(domain_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(reservation.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = ApiResponse<ReservationResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    Path(id): Path<i64>,
) -> ApiResult<ReservationResponse> {
    let reservation = state
        .coordinator
        .get_reservation(id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    request_body = ReservationRequest,
    responses(
        (status = 200, description = "Reservation updated", body = ApiResponse<ReservationResponse>),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Overlapping stay or concurrent modification")
    )
)]
pub async fn update_reservation(
    State(state): State<ReservationAppState>,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<ReservationRequest>,
) -> ApiResult<ReservationResponse> {
    let (draft, version) = request.into_draft();
    let reservation = state
        .coordinator
        .update_reservation(id, draft, version)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 204, description = "Reservation deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_reservation(
    State(state): State<ReservationAppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError<()>> {
    state
        .coordinator
        .delete_reservation(id)
        .await
        .map_err(domain_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn transition(
    state: &ReservationAppState,
    id: i64,
    action: LifecycleAction,
) -> ApiResult<ReservationResponse> {
    let reservation = state
        .lifecycle
        .apply(id, action)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{id}/confirm",
    tag = "Reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation confirmed", body = ApiResponse<ReservationResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Not Pending")
    )
)]
pub async fn confirm_reservation(
    State(state): State<ReservationAppState>,
    Path(id): Path<i64>,
) -> ApiResult<ReservationResponse> {
    transition(&state, id, LifecycleAction::Confirm).await
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{id}/cancel",
    tag = "Reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = ApiResponse<ReservationResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already Cancelled or Completed")
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    Path(id): Path<i64>,
) -> ApiResult<ReservationResponse> {
    transition(&state, id, LifecycleAction::Cancel).await
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{id}/complete",
    tag = "Reservations",
    params(("id" = i64, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation completed", body = ApiResponse<ReservationResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Not Confirmed")
    )
)]
pub async fn complete_reservation(
    State(state): State<ReservationAppState>,
    Path(id): Path<i64>,
) -> ApiResult<ReservationResponse> {
    transition(&state, id, LifecycleAction::Complete).await
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/conflicts",
    tag = "Reservations",
    params(ConflictQuery),
    responses(
        (status = 200, description = "Whether the stay collides with a booking", body = ApiResponse<bool>),
        (status = 400, description = "checkIn must be before checkOut")
    )
)]
pub async fn check_conflicts(
    State(state): State<ReservationAppState>,
    Query(q): Query<ConflictQuery>,
) -> ApiResult<bool> {
    let conflict = state
        .coordinator
        .detector()
        .has_conflict(q.room_id, q.check_in, q.check_out, q.exclude_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(conflict)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/conflicts/details",
    tag = "Reservations",
    params(ConflictQuery),
    responses(
        (status = 200, description = "Colliding reservations", body = ApiResponse<Vec<ReservationResponse>>),
        (status = 400, description = "checkIn must be before checkOut")
    )
)]
pub async fn list_conflicts(
    State(state): State<ReservationAppState>,
    Query(q): Query<ConflictQuery>,
) -> ApiResult<Vec<ReservationResponse>> {
    let conflicts = state
        .coordinator
        .detector()
        .list_conflicts(q.room_id, q.check_in, q.check_out, q.exclude_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(
        conflicts.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    tag = "Reservations",
    params(ListReservationsQuery),
    responses(
        (status = 200, description = "Active reservations, newest first", body = ApiResponse<PaginatedResponse<ReservationResponse>>),
        (status = 400, description = "Unknown status or inverted range")
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationAppState>,
    Query(q): Query<ListReservationsQuery>,
) -> ApiResult<PaginatedResponse<ReservationResponse>> {
    let status = q
        .status
        .as_deref()
        .map(str::parse::<ReservationStatus>)
        .transpose()
        .map_err(domain_error)?;

    let filter = ReservationFilter {
        hotel_id: q.hotel_id,
        room_id: q.room_id,
        guest_email: q.guest_email,
        guest_name: q.guest_name,
        status,
        check_in_from: q.check_in_from,
        check_in_to: q.check_in_to,
        min_price: q.min_price,
        max_price: q.max_price,
    };
    let page = PaginationParams::new(q.page.unwrap_or(1), q.limit.unwrap_or(20));

    let result = state
        .queries
        .list(filter, page)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(result.into())))
}

fn listed(result: DomainResult<Vec<Reservation>>) -> ApiResult<Vec<ReservationResponse>> {
    let reservations = result.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(
        reservations.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/hotel/{hotel_id}/upcoming",
    tag = "Hotel views",
    params(("hotel_id" = i64, Path, description = "Hotel ID")),
    responses(
        (status = 200, description = "Pending/Confirmed stays starting today or later", body = ApiResponse<Vec<ReservationResponse>>)
    )
)]
pub async fn upcoming(
    State(state): State<ReservationAppState>,
    Path(hotel_id): Path<i64>,
) -> ApiResult<Vec<ReservationResponse>> {
    listed(state.queries.upcoming(hotel_id, Utc::now().date_naive()).await)
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/hotel/{hotel_id}/check-ins/today",
    tag = "Hotel views",
    params(("hotel_id" = i64, Path, description = "Hotel ID")),
    responses(
        (status = 200, description = "Arrivals today", body = ApiResponse<Vec<ReservationResponse>>)
    )
)]
pub async fn check_ins_today(
    State(state): State<ReservationAppState>,
    Path(hotel_id): Path<i64>,
) -> ApiResult<Vec<ReservationResponse>> {
    listed(state.queries.check_ins_on(hotel_id, Utc::now().date_naive()).await)
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/hotel/{hotel_id}/check-outs/today",
    tag = "Hotel views",
    params(("hotel_id" = i64, Path, description = "Hotel ID")),
    responses(
        (status = 200, description = "Departures today", body = ApiResponse<Vec<ReservationResponse>>)
    )
)]
pub async fn check_outs_today(
    State(state): State<ReservationAppState>,
    Path(hotel_id): Path<i64>,
) -> ApiResult<Vec<ReservationResponse>> {
    listed(state.queries.check_outs_on(hotel_id, Utc::now().date_naive()).await)
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/hotel/{hotel_id}/overdue",
    tag = "Hotel views",
    params(("hotel_id" = i64, Path, description = "Hotel ID")),
    responses(
        (status = 200, description = "Pending/Confirmed stays whose check-out has passed", body = ApiResponse<Vec<ReservationResponse>>)
    )
)]
pub async fn overdue(
    State(state): State<ReservationAppState>,
    Path(hotel_id): Path<i64>,
) -> ApiResult<Vec<ReservationResponse>> {
    listed(state.queries.overdue(hotel_id, Utc::now().date_naive()).await)
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/hotel/{hotel_id}/statistics",
    tag = "Hotel views",
    params(("hotel_id" = i64, Path, description = "Hotel ID")),
    responses(
        (status = 200, description = "Counts per status, average price and revenue", body = ApiResponse<HotelStatisticsResponse>)
    )
)]
pub async fn statistics(
    State(state): State<ReservationAppState>,
    Path(hotel_id): Path<i64>,
) -> ApiResult<HotelStatisticsResponse> {
    let stats = state
        .queries
        .statistics(hotel_id)
        .await
        .map_err(domain_error)?;
    Ok(Json(ApiResponse::success(stats.into())))
}
