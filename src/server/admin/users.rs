use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Duration;

use crate::auth::{RequireUser, issue_token, register_user};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateUserRequest, CreateUserResponse, PaginationParams};
use crate::server::response::{ApiError, ApiResponse, PaginatedResponse, paginate};
use crate::types::{Capability, Role};

const USER_PAGE_SIZE: i32 = 50;

/// Creates a user and issues their first token.
pub async fn create_user(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    auth.current.require(Capability::MANAGE_USERS)?;

    if req.token_expires_in_seconds.is_some_and(|s| s <= 0) {
        return Err(ApiError::unprocessable(
            "token_expires_in_seconds must be positive",
        ));
    }

    let user = register_user(
        state.store.as_ref(),
        &req.name,
        &req.email,
        req.role.unwrap_or(Role::User),
    )
    .map_err(|e| match e {
        Error::AlreadyExists => ApiError::conflict("A user with this email already exists"),
        other => other.into(),
    })?;

    let expires_at = req
        .token_expires_in_seconds
        .map(|s| state.clock.now() + Duration::seconds(s));
    let (token, raw_token) = issue_token(state.store.as_ref(), &user.id, expires_at)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateUserResponse {
            user,
            token: raw_token,
            token_expires_at: token.expires_at,
        })),
    ))
}

pub async fn list_users(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    auth.current.require(Capability::MANAGE_USERS)?;
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state.store.list_users(cursor, USER_PAGE_SIZE + 1)?;

    let (users, next_cursor, has_more) =
        paginate(users, USER_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}
