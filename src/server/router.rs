use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::public::public_router;
use super::user::user_router;
use crate::clock::Clock;
use crate::palette::ColorPalette;
use crate::scheduling::{BookingManager, BulkCoordinator, Catalog, ScheduleView};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub bookings: BookingManager,
    pub bulk: BulkCoordinator,
    pub catalog: Catalog,
    pub schedule: ScheduleView,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        palette: Arc<dyn ColorPalette>,
    ) -> Self {
        let bookings = BookingManager::new(store.clone(), clock.clone(), palette);
        Self {
            bulk: BulkCoordinator::new(bookings.clone()),
            catalog: Catalog::new(store.clone(), clock.clone()),
            schedule: ScheduleView::new(store.clone(), clock.clone()),
            bookings,
            store,
            clock,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", public_router().merge(user_router()))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
