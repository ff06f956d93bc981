use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::scheduling::{BookingContent, NewBooking};
use crate::server::AppState;
use crate::server::dto::{AvailabilityParams, CreateBookingRequest, UpdateBookingRequest};
use crate::server::response::{ApiError, ApiResponse, DomainResultExt};
use crate::server::validation::parse_date;

pub async fn check_availability(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<AvailabilityParams>,
) -> impl IntoResponse {
    let date = parse_date("date", &params.date)?;

    let availability = state
        .bookings
        .availability()
        .check_availability(&params.room_id, &params.time_slot_id, date)
        .or_not_found("Room or time slot not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(availability)))
}

pub async fn create_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> impl IntoResponse {
    let request = NewBooking {
        room_id: req.room_id,
        time_slot_id: req.time_slot_id,
        booking_date: parse_date("booking_date", &req.booking_date)?,
        content: BookingContent {
            keperluan: req.keperluan,
            subject: req.subject,
            instructor: req.instructor,
            notes: req.notes,
        },
    };

    let booking = state
        .bookings
        .create(&auth.current, request)
        .or_not_found("Room or time slot not found")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(booking))))
}

pub async fn list_my_bookings(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let bookings = state.bookings.list_mine(&auth.current)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(bookings)))
}

pub async fn get_my_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let booking = state
        .bookings
        .get(&auth.current, &id)
        .or_not_found("Booking not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(booking)))
}

pub async fn update_my_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingRequest>,
) -> impl IntoResponse {
    let booking = state
        .bookings
        .update(&auth.current, &id, req.into())
        .or_not_found("Booking not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(booking)))
}

pub async fn delete_my_booking(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .bookings
        .delete(&auth.current, &id)
        .or_not_found("Booking not found")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
