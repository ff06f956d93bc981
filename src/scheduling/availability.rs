use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{RoomSummary, TimeSlotSummary};

/// Answers whether a (room, time slot, date) can still be taken.
///
/// Only approved bookings block a slot. Pending requests for the same slot may
/// coexist until one of them is approved.
#[derive(Clone)]
pub struct AvailabilityChecker {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

/// Result of an explicit availability query.
#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
    pub available: bool,
    pub date: NaiveDate,
    pub room: RoomSummary,
    pub time_slot: TimeSlotSummary,
}

impl AvailabilityChecker {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// True iff no approved booking holds the slot, ignoring `exclude_booking_id`.
    pub fn is_slot_free(
        &self,
        room_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
        exclude_booking_id: Option<&str>,
    ) -> Result<bool> {
        let taken =
            self.store
                .approved_booking_exists(room_id, time_slot_id, date, exclude_booking_id)?;
        Ok(!taken)
    }

    /// True iff the user already holds a pending or approved booking for this
    /// (time slot, date), in any room.
    pub fn has_user_conflict(
        &self,
        user_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
    ) -> Result<bool> {
        self.store
            .live_user_booking_exists(user_id, time_slot_id, date)
    }

    /// Availability lookup for a booking form. Inactive rooms and slots are never available.
    pub fn check_availability(
        &self,
        room_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
    ) -> Result<SlotAvailability> {
        ensure_not_past(self.clock.as_ref(), date)?;

        let room = self.store.get_room(room_id)?.ok_or(Error::NotFound)?;
        let slot = self
            .store
            .get_time_slot(time_slot_id)?
            .ok_or(Error::NotFound)?;

        let free = self.is_slot_free(room_id, time_slot_id, date, None)?;

        Ok(SlotAvailability {
            available: free && room.is_active && slot.is_active,
            date,
            room: room.summary(),
            time_slot: slot.summary(),
        })
    }
}

/// Bookings may target today or any later date.
pub(crate) fn ensure_not_past(clock: &dyn Clock, date: NaiveDate) -> Result<()> {
    let today = clock.today();
    if date < today {
        return Err(Error::validation(format!(
            "booking_date must be today ({today}) or later"
        )));
    }
    Ok(())
}
