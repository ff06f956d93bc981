use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::server::AppState;
use crate::server::dto::{DateParams, SlotDayParams};
use crate::server::response::{ApiError, ApiResponse, DomainResultExt};
use crate::server::validation::{non_blank, parse_optional_date};

pub async fn list_rooms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rooms = state.catalog.list_rooms(true)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(rooms)))
}

pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let room = state.catalog.get_room(&id).or_not_found("Room not found")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(room)))
}

/// Active time slots of one room for a day, marked booked or free.
pub async fn room_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<DateParams>,
) -> impl IntoResponse {
    let date = parse_optional_date("date", params.date.as_deref())?
        .unwrap_or_else(|| state.clock.today());

    let slots = state
        .schedule
        .room_day(&id, date)
        .or_not_found("Room not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(slots)))
}

pub async fn list_time_slots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let slots = state.catalog.list_time_slots(true)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(slots)))
}

pub async fn time_slot_availability(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SlotDayParams>,
) -> impl IntoResponse {
    let date = parse_optional_date("date", params.date.as_deref())?
        .unwrap_or_else(|| state.clock.today());
    let room_id = non_blank(params.room_id);

    let slots = state
        .schedule
        .time_slot_day(date, room_id.as_deref())
        .or_not_found("Room not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(slots)))
}
