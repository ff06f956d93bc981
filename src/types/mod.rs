mod capability;
mod models;

pub use capability::{Capability, CurrentUser, Role};
pub use models::*;
