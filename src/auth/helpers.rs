use super::{TokenGenerator, parse_token};
use crate::clock::Clock;
use crate::store::Store;
use crate::types::{Token, User};

#[derive(Debug, PartialEq, Eq)]
pub enum TokenValidationError {
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InternalError,
}

pub struct ValidatedToken {
    pub token: Token,
    pub user: User,
}

/// Pulls the raw token out of an `Authorization: Bearer ...` header.
/// `Ok(None)` means the header was absent.
pub fn bearer_token(auth_header: Option<&str>) -> Result<Option<&str>, TokenValidationError> {
    match auth_header {
        Some(header) => header
            .strip_prefix("Bearer ")
            .map(|t| Some(t.trim()))
            .ok_or(TokenValidationError::InvalidScheme),
        None => Ok(None),
    }
}

/// Checks a raw token against the store and loads the user it belongs to.
pub fn validate_token(
    store: &dyn Store,
    clock: &dyn Clock,
    raw_token: &str,
) -> Result<ValidatedToken, TokenValidationError> {
    let (lookup, _secret) =
        parse_token(raw_token).map_err(|_| TokenValidationError::InvalidToken)?;

    let token = store
        .get_token_by_lookup(&lookup)
        .map_err(|e| {
            tracing::error!("Token lookup failed: {e}");
            TokenValidationError::InternalError
        })?
        .ok_or(TokenValidationError::InvalidToken)?;

    if !TokenGenerator::new()
        .verify(raw_token, &token.token_hash)
        .map_err(|_| TokenValidationError::InternalError)?
    {
        return Err(TokenValidationError::InvalidToken);
    }

    if token.expires_at.is_some_and(|at| at < clock.now()) {
        return Err(TokenValidationError::TokenExpired);
    }

    let user = store
        .get_user(&token.user_id)
        .map_err(|_| TokenValidationError::InternalError)?
        .ok_or(TokenValidationError::InvalidToken)?;

    if let Err(e) = store.update_token_last_used(&token.id) {
        tracing::warn!("Failed to update token last_used_at: {e}");
    }

    Ok(ValidatedToken { token, user })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issue_token;
    use crate::clock::FixedClock;
    use crate::store::SqliteStore;
    use crate::types::Role;
    use chrono::{Duration, Utc};

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(None), Ok(None));
        assert_eq!(bearer_token(Some("Bearer abc")), Ok(Some("abc")));
        assert_eq!(
            bearer_token(Some("Basic eDp5")),
            Err(TokenValidationError::InvalidScheme)
        );
    }

    #[test]
    fn test_validate_token_checks_expiry() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let now = Utc::now();
        store
            .create_user(&User {
                id: "u1".to_string(),
                name: "Dewi".to_string(),
                email: "dewi@campus.test".to_string(),
                role: Role::Admin,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let (_, raw) = issue_token(&store, "u1", Some(now + Duration::hours(1))).unwrap();

        let clock = FixedClock::new(now);
        let validated = validate_token(&store, &clock, &raw).unwrap();
        assert_eq!(validated.user.role, Role::Admin);

        let later = FixedClock::new(now + Duration::hours(2));
        assert!(matches!(
            validate_token(&store, &later, &raw),
            Err(TokenValidationError::TokenExpired)
        ));

        let tampered = format!("{}AAAA", &raw[..raw.len() - 4]);
        assert!(matches!(
            validate_token(&store, &clock, &tampered),
            Err(TokenValidationError::InvalidToken)
        ));
    }
}
