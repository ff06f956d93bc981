use axum::{Json, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::dto::MeResponse;
use crate::server::response::ApiResponse;

pub async fn get_me(auth: RequireUser) -> impl IntoResponse {
    let capabilities = auth.user.role.capabilities().to_strings();
    Json(ApiResponse::success(MeResponse {
        user: auth.user,
        capabilities,
    }))
}
