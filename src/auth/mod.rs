mod accounts;
mod helpers;
mod middleware;
mod token;

pub use accounts::register_user;
pub use helpers::{TokenValidationError, ValidatedToken, bearer_token, validate_token};
pub use middleware::RequireUser;
pub use token::{TokenGenerator, issue_token, parse_token};
