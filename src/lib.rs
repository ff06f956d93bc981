//! # Roombook
//!
//! A room booking server for schools and campuses: users request a room for a
//! time slot on a date, admins approve or reject, and everyone can read the
//! day's schedule as a room x time slot grid. Usable both as a standalone
//! binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! roombook = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use roombook::clock::SystemClock;
//! use roombook::palette::DefaultPalette;
//! use roombook::server::{AppState, create_router};
//! use roombook::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/roombook.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(SystemClock::utc()),
//!     Arc::new(DefaultPalette),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): builds the `roombook` binary. Disable with `default-features = false`.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod palette;
pub mod scheduling;
pub mod server;
pub mod store;
pub mod types;
