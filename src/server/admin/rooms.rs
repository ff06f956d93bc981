use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::error::Error;
use crate::scheduling::{NewRoom, RoomChanges};
use crate::server::AppState;
use crate::server::dto::{CreateRoomRequest, UpdateRoomRequest};
use crate::server::response::{ApiError, ApiResponse, DomainResultExt};
use crate::types::Capability;

/// Every room, inactive ones included.
pub async fn list_rooms(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    auth.current.require(Capability::MANAGE_CATALOG)?;
    let rooms = state.catalog.list_rooms(false)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(rooms)))
}

pub async fn get_room(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    auth.current.require(Capability::MANAGE_CATALOG)?;
    let room = state.catalog.get_room(&id).or_not_found("Room not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(room)))
}

pub async fn create_room(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> impl IntoResponse {
    let room = state
        .catalog
        .create_room(
            &auth.current,
            NewRoom {
                name: req.name,
                capacity: req.capacity,
                facilities: req.facilities,
                is_active: req.is_active,
            },
        )
        .map_err(|e| match e {
            Error::AlreadyExists => {
                ApiError::conflict("A room with this name already exists")
            }
            other => other.into(),
        })?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(room))))
}

pub async fn update_room(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoomRequest>,
) -> impl IntoResponse {
    let changes = RoomChanges {
        name: req.name,
        capacity: req.capacity,
        facilities: req.facilities,
        is_active: req.is_active,
    };

    let room = state
        .catalog
        .update_room(&auth.current, &id, changes)
        .map_err(|e| match e {
            Error::AlreadyExists => {
                ApiError::conflict("A room with this name already exists")
            }
            Error::NotFound => ApiError::not_found("Room not found"),
            other => other.into(),
        })?;

    Ok::<_, ApiError>(Json(ApiResponse::success(room)))
}

pub async fn delete_room(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .catalog
        .delete_room(&auth.current, &id)
        .or_not_found("Room not found")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
