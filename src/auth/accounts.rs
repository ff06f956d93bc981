use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Role, User};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 255;

/// Creates a user after validating name and email. Emails are stored lowercase.
pub fn register_user(store: &dyn Store, name: &str, email: &str, role: Role) -> Result<User> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "name must be 1 to {MAX_NAME_LEN} characters"
        )));
    }

    let email = email.trim().to_lowercase();
    let valid_email = email.len() <= MAX_EMAIL_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(Error::validation("email is not a valid address"));
    }

    if store.get_user_by_email(&email)?.is_some() {
        return Err(Error::AlreadyExists);
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email,
        role,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(user)
}
