use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::scheduling::{PublicBookingQuery, group_by_room};
use crate::server::AppState;
use crate::server::dto::{DateParams, PublicBookingsResponse, ScheduleBookingsParams};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{non_blank, parse_optional_date};

/// The room x time slot matrix for one day (today by default).
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateParams>,
) -> impl IntoResponse {
    let date = parse_optional_date("date", params.date.as_deref())?;
    let schedule = state.schedule.day_schedule(date)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(schedule)))
}

pub async fn list_schedule_bookings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScheduleBookingsParams>,
) -> impl IntoResponse {
    let query = PublicBookingQuery {
        date: parse_optional_date("date", params.date.as_deref())?,
        date_from: parse_optional_date("date_from", params.date_from.as_deref())?,
        date_to: parse_optional_date("date_to", params.date_to.as_deref())?,
        room_id: non_blank(params.room_id),
        time_slot_id: non_blank(params.time_slot_id),
    };

    let bookings = state.schedule.public_bookings(query)?;
    let response = if params.group_by_room {
        PublicBookingsResponse::ByRoom(group_by_room(bookings))
    } else {
        PublicBookingsResponse::List(bookings)
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(response)))
}
