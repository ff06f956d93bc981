mod bookings;
mod me;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

/// Routes for any signed-in user.
pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me::get_me))
        .route("/availability", get(bookings::check_availability))
        .route("/bookings", post(bookings::create_booking))
        .route("/my-bookings", get(bookings::list_my_bookings))
        .route(
            "/my-bookings/{id}",
            get(bookings::get_my_booking)
                .put(bookings::update_my_booking)
                .delete(bookings::delete_my_booking),
        )
}
