mod catalog;
mod schedule;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::server::AppState;

/// Routes that need no authentication.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        // Schedule
        .route("/schedule", get(schedule::get_schedule))
        .route("/schedule/bookings", get(schedule::list_schedule_bookings))
        // Rooms
        .route("/rooms", get(catalog::list_rooms))
        .route("/rooms/{id}", get(catalog::get_room))
        .route("/rooms/{id}/availability", get(catalog::room_availability))
        // Time slots
        .route("/time-slots", get(catalog::list_time_slots))
        .route(
            "/time-slots/availability",
            get(catalog::time_slot_availability),
        )
}
