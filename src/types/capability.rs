use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Capabilities granted to every holder of this role.
    #[must_use]
    pub const fn capabilities(self) -> Capability {
        match self {
            Self::User => Capability::BOOK_ROOMS,
            Self::Admin => Capability::ALL,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability is a bitmask of operations a role may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(u32);

impl Capability {
    pub const BOOK_ROOMS: Capability = Capability(1 << 0); // 1
    pub const VIEW_ALL_BOOKINGS: Capability = Capability(1 << 1); // 2
    pub const REVIEW_BOOKINGS: Capability = Capability(1 << 2); // 4
    pub const DELETE_ANY_BOOKING: Capability = Capability(1 << 3); // 8
    pub const MANAGE_CATALOG: Capability = Capability(1 << 4); // 16
    pub const MANAGE_USERS: Capability = Capability(1 << 5); // 32

    pub const ALL: Capability = Capability(
        Self::BOOK_ROOMS.0
            | Self::VIEW_ALL_BOOKINGS.0
            | Self::REVIEW_BOOKINGS.0
            | Self::DELETE_ANY_BOOKING.0
            | Self::MANAGE_CATALOG.0
            | Self::MANAGE_USERS.0,
    );

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if this bitmask contains every bit of `required`.
    #[must_use]
    pub const fn has(self, required: Capability) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: Capability) -> Capability {
        Capability(self.0 | other.0)
    }

    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        let names = [
            (Self::BOOK_ROOMS, "bookings:create"),
            (Self::VIEW_ALL_BOOKINGS, "bookings:read_all"),
            (Self::REVIEW_BOOKINGS, "bookings:review"),
            (Self::DELETE_ANY_BOOKING, "bookings:delete_any"),
            (Self::MANAGE_CATALOG, "catalog:manage"),
            (Self::MANAGE_USERS, "users:manage"),
        ];
        names
            .into_iter()
            .filter(|(cap, _)| self.has(*cap))
            .map(|(_, name)| name)
            .collect()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    #[must_use]
    pub fn can(&self, required: Capability) -> bool {
        self.role.capabilities().has(required)
    }

    /// Fails with [`Error::Forbidden`] unless the caller's role grants `required`.
    pub fn require(&self, required: Capability) -> Result<()> {
        if self.can(required) {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    #[must_use]
    pub fn owns(&self, user_id: &str) -> bool {
        self.id == user_id
    }
}
