use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::scheduling::{NewTimeSlot, TimeSlotChanges};
use crate::server::AppState;
use crate::server::dto::{CreateTimeSlotRequest, UpdateTimeSlotRequest};
use crate::server::response::{ApiError, ApiResponse, DomainResultExt};
use crate::server::validation::parse_time;
use crate::types::Capability;

pub async fn list_time_slots(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    auth.current.require(Capability::MANAGE_CATALOG)?;
    let slots = state.catalog.list_time_slots(false)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(slots)))
}

pub async fn get_time_slot(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    auth.current.require(Capability::MANAGE_CATALOG)?;
    let slot = state
        .catalog
        .get_time_slot(&id)
        .or_not_found("Time slot not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(slot)))
}

pub async fn create_time_slot(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTimeSlotRequest>,
) -> impl IntoResponse {
    let new = NewTimeSlot {
        start_time: parse_time("start_time", &req.start_time)?,
        end_time: parse_time("end_time", &req.end_time)?,
        is_active: req.is_active,
    };

    let slot = state.catalog.create_time_slot(&auth.current, new)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(slot))))
}

pub async fn update_time_slot(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTimeSlotRequest>,
) -> impl IntoResponse {
    let changes = TimeSlotChanges {
        start_time: req
            .start_time
            .as_deref()
            .map(|raw| parse_time("start_time", raw))
            .transpose()?,
        end_time: req
            .end_time
            .as_deref()
            .map(|raw| parse_time("end_time", raw))
            .transpose()?,
        is_active: req.is_active,
    };

    let slot = state
        .catalog
        .update_time_slot(&auth.current, &id, changes)
        .or_not_found("Time slot not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(slot)))
}

pub async fn delete_time_slot(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .catalog
        .delete_time_slot(&auth.current, &id)
        .or_not_found("Time slot not found")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
