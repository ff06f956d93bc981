use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::helpers::{TokenValidationError, bearer_token, validate_token};
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::{CurrentUser, User};

/// Extractor for any signed-in user. What the user may do is decided by the
/// operation it calls, from `current.role`.
pub struct RequireUser {
    pub current: CurrentUser,
    pub user: User,
}

impl From<TokenValidationError> for ApiError {
    fn from(e: TokenValidationError) -> Self {
        match e {
            TokenValidationError::InvalidScheme => {
                ApiError::unauthorized("Invalid authorization scheme")
            }
            TokenValidationError::InvalidToken => ApiError::unauthorized("Invalid token"),
            TokenValidationError::TokenExpired => {
                ApiError::unauthorized("Token expired").with_reason("token_expired")
            }
            TokenValidationError::InternalError => ApiError::internal("Internal server error"),
        }
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let raw_token = bearer_token(header)?
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let validated = validate_token(state.store.as_ref(), state.clock.as_ref(), raw_token)?;

        Ok(RequireUser {
            current: CurrentUser::new(validated.user.id.clone(), validated.user.role),
            user: validated.user,
        })
    }
}
