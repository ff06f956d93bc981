mod bookings;
mod rooms;
mod time_slots;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

/// Admin routes. Every handler authenticates with `RequireUser`; the operation
/// it calls checks the caller's capabilities.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Rooms
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route(
            "/rooms/{id}",
            get(rooms::get_room)
                .patch(rooms::update_room)
                .delete(rooms::delete_room),
        )
        // Time slots
        .route(
            "/time-slots",
            get(time_slots::list_time_slots).post(time_slots::create_time_slot),
        )
        .route(
            "/time-slots/{id}",
            get(time_slots::get_time_slot)
                .patch(time_slots::update_time_slot)
                .delete(time_slots::delete_time_slot),
        )
        // Bookings
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/bulk-approve", post(bookings::bulk_approve))
        .route("/bookings/bulk-reject", post(bookings::bulk_reject))
        .route(
            "/bookings/{id}",
            get(bookings::get_booking).delete(bookings::delete_booking),
        )
        .route("/bookings/{id}/approve", post(bookings::approve_booking))
        .route("/bookings/{id}/reject", post(bookings::reject_booking))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
}
