use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{
    AdminBookingsParams, BookingPageResponse, BulkApproveRequest, BulkRejectRequest,
    BulkRejectResponse, ReviewRequest,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, DomainResultExt, PaginatedResponse, paginate,
};
use crate::server::validation::{non_blank, parse_offset_cursor, parse_optional_date};
use crate::types::{BookingFilter, Capability};

/// Newest booking dates first, `DEFAULT_PAGE_SIZE` per page, with status counters.
pub async fn list_bookings(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<AdminBookingsParams>,
) -> impl IntoResponse {
    let filter = BookingFilter {
        status: params.status,
        date_from: parse_optional_date("date_from", params.date_from.as_deref())?,
        date_to: parse_optional_date("date_to", params.date_to.as_deref())?,
        room_id: non_blank(params.room_id),
        search: non_blank(params.search),
        ..Default::default()
    };
    let offset = parse_offset_cursor(params.cursor.as_deref())?;

    let bookings = state
        .bookings
        .list_all(&auth.current, &filter, offset, DEFAULT_PAGE_SIZE + 1)?;
    let stats = state.bookings.stats(&auth.current)?;

    let (bookings, next_cursor, has_more) =
        paginate(bookings, DEFAULT_PAGE_SIZE as usize, |_| {
            (offset + DEFAULT_PAGE_SIZE).to_string()
        });

    Ok::<_, ApiError>(Json(BookingPageResponse {
        page: PaginatedResponse::new(bookings, next_cursor, has_more),
        stats,
    }))
}

pub async fn get_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    auth.current.require(Capability::VIEW_ALL_BOOKINGS)?;
    let booking = state
        .bookings
        .get(&auth.current, &id)
        .or_not_found("Booking not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(booking)))
}

pub async fn delete_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    auth.current.require(Capability::DELETE_ANY_BOOKING)?;
    state
        .bookings
        .delete(&auth.current, &id)
        .or_not_found("Booking not found")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn approve_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> impl IntoResponse {
    let booking = state
        .bookings
        .approve(&auth.current, &id, req.admin_notes)
        .or_not_found("Booking not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(booking)))
}

pub async fn reject_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> impl IntoResponse {
    let booking = state
        .bookings
        .reject(&auth.current, &id, req.admin_notes)
        .or_not_found("Booking not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(booking)))
}

pub async fn bulk_approve(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkApproveRequest>,
) -> impl IntoResponse {
    let outcome = state.bulk.bulk_approve(&auth.current, &req.booking_ids)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(outcome)))
}

pub async fn bulk_reject(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkRejectRequest>,
) -> impl IntoResponse {
    let rejected_count = state
        .bulk
        .bulk_reject(&auth.current, &req.booking_ids, req.admin_notes)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(BulkRejectResponse {
        rejected_count,
    })))
}
