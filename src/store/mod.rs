mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn has_admin_user(&self) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Room operations (lists are ordered by name)
    fn create_room(&self, room: &Room) -> Result<()>;
    fn get_room(&self, id: &str) -> Result<Option<Room>>;
    fn get_room_by_name(&self, name: &str) -> Result<Option<Room>>;
    fn list_rooms(&self, active_only: bool) -> Result<Vec<Room>>;
    fn update_room(&self, room: &Room) -> Result<()>;
    fn delete_room(&self, id: &str) -> Result<bool>;
    fn count_room_bookings(&self, id: &str) -> Result<i64>;

    // Time slot operations (lists are ordered by start time)
    /// Inserts a slot. Fails with `Validation` if its interval overlaps any
    /// other slot; the check and the write are atomic.
    fn create_time_slot(&self, slot: &TimeSlot) -> Result<()>;
    fn get_time_slot(&self, id: &str) -> Result<Option<TimeSlot>>;
    fn list_time_slots(&self, active_only: bool) -> Result<Vec<TimeSlot>>;
    /// Same overlap rule as `create_time_slot`, ignoring the slot itself.
    fn update_time_slot(&self, slot: &TimeSlot) -> Result<()>;
    fn delete_time_slot(&self, id: &str) -> Result<bool>;
    fn count_time_slot_bookings(&self, id: &str) -> Result<i64>;

    // Booking operations
    /// Inserts a booking. A second live booking by the same user for the same
    /// (time slot, date) fails with `UserConflict`.
    fn create_booking(&self, booking: &Booking) -> Result<()>;
    fn get_booking(&self, id: &str) -> Result<Option<Booking>>;
    fn get_booking_detail(&self, id: &str) -> Result<Option<BookingDetail>>;
    /// `limit = None` returns every match.
    fn list_booking_details(
        &self,
        filter: &BookingFilter,
        order: BookingOrder,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<BookingDetail>>;
    /// Rewrites the content fields of a booking that is still pending.
    fn update_booking_content(&self, booking: &Booking) -> Result<()>;
    fn delete_booking(&self, id: &str) -> Result<bool>;
    /// pending -> approved. Fails with `SlotConflict` when another approved booking
    /// already holds the slot and with `InvalidState` when the row is not pending.
    fn approve_booking(
        &self,
        id: &str,
        admin_notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()>;
    /// pending -> rejected. Fails with `InvalidState` when the row is not pending.
    fn reject_booking(&self, id: &str, admin_notes: &str, at: DateTime<Utc>) -> Result<()>;
    /// The listed bookings that are still pending, in insertion order
    /// (created_at, then row order).
    fn list_pending_bookings(&self, ids: &[String]) -> Result<Vec<Booking>>;
    /// Rejects every listed booking that is still pending; returns how many changed.
    fn reject_pending_bookings(
        &self,
        ids: &[String],
        admin_notes: &str,
        at: DateTime<Utc>,
    ) -> Result<usize>;
    fn approved_booking_exists(
        &self,
        room_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
        exclude_booking_id: Option<&str>,
    ) -> Result<bool>;
    fn live_user_booking_exists(
        &self,
        user_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
    ) -> Result<bool>;
    fn booking_stats(&self) -> Result<BookingStats>;

    fn close(&self) -> Result<()>;
}
