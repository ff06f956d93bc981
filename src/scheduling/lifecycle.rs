use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use super::availability::{AvailabilityChecker, ensure_not_past};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::palette::ColorPalette;
use crate::store::Store;
use crate::types::*;

pub const MAX_SUBJECT_LEN: usize = 100;
pub const MAX_INSTRUCTOR_LEN: usize = 100;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_ADMIN_NOTES_LEN: usize = 500;

/// A booking request as submitted by a user.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: String,
    pub time_slot_id: String,
    pub booking_date: NaiveDate,
    pub content: BookingContent,
}

/// The fields of a booking its owner may still edit while it is pending.
#[derive(Debug, Clone)]
pub struct BookingContent {
    pub keperluan: Keperluan,
    pub subject: Option<String>,
    pub instructor: Option<String>,
    pub notes: Option<String>,
}

impl BookingContent {
    /// Trims every field, drops blank ones and enforces the purpose-dependent
    /// required fields.
    pub fn normalized(self) -> Result<Self> {
        let subject = clean(self.subject);
        let instructor = clean(self.instructor);
        let notes = clean(self.notes);

        check_len("subject", subject.as_deref(), MAX_SUBJECT_LEN)?;
        check_len("instructor", instructor.as_deref(), MAX_INSTRUCTOR_LEN)?;
        check_len("notes", notes.as_deref(), MAX_NOTES_LEN)?;

        match self.keperluan {
            Keperluan::Class if subject.is_none() => {
                return Err(Error::validation("subject is required for class bookings"));
            }
            Keperluan::Other if notes.is_none() => {
                return Err(Error::validation("notes are required for other bookings"));
            }
            _ => {}
        }

        Ok(Self {
            keperluan: self.keperluan,
            subject,
            instructor,
            notes,
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(Error::validation(format!(
            "{field} must be at most {max} characters"
        ))),
        _ => Ok(()),
    }
}

/// Validates optional admin notes and returns them trimmed.
fn optional_admin_notes(notes: Option<String>) -> Result<Option<String>> {
    let notes = clean(notes);
    check_len("admin_notes", notes.as_deref(), MAX_ADMIN_NOTES_LEN)?;
    Ok(notes)
}

/// Admin notes are mandatory when rejecting.
pub(crate) fn required_admin_notes(notes: Option<String>) -> Result<String> {
    optional_admin_notes(notes)?
        .ok_or_else(|| Error::validation("admin_notes are required when rejecting"))
}

/// Enforces the booking state machine: creation, owner edits and deletes,
/// approval and rejection.
#[derive(Clone)]
pub struct BookingManager {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    palette: Arc<dyn ColorPalette>,
    availability: AvailabilityChecker,
}

impl BookingManager {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        palette: Arc<dyn ColorPalette>,
    ) -> Self {
        let availability = AvailabilityChecker::new(store.clone(), clock.clone());
        Self {
            store,
            clock,
            palette,
            availability,
        }
    }

    pub fn availability(&self) -> &AvailabilityChecker {
        &self.availability
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn detail(&self, id: &str) -> Result<BookingDetail> {
        self.store.get_booking_detail(id)?.ok_or(Error::NotFound)
    }

    /// Submits a new pending booking for the caller.
    pub fn create(&self, caller: &CurrentUser, request: NewBooking) -> Result<BookingDetail> {
        caller.require(Capability::BOOK_ROOMS)?;

        let content = request.content.normalized()?;
        let date = request.booking_date;
        ensure_not_past(self.clock.as_ref(), date)?;

        let room = self
            .store
            .get_room(&request.room_id)?
            .ok_or(Error::NotFound)?;
        if !room.is_active {
            return Err(Error::validation(format!("room {} is not active", room.name)));
        }

        let slot = self
            .store
            .get_time_slot(&request.time_slot_id)?
            .ok_or(Error::NotFound)?;
        if !slot.is_active {
            return Err(Error::validation(format!(
                "time slot {} is not active",
                slot.label
            )));
        }

        if !self.availability.is_slot_free(&room.id, &slot.id, date, None)? {
            warn!(room = %room.name, slot = %slot.label, %date, "Booking rejected: slot taken");
            return Err(Error::SlotConflict);
        }
        if self.availability.has_user_conflict(&caller.id, &slot.id, date)? {
            return Err(Error::UserConflict);
        }

        let now = self.clock.now();
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            user_id: caller.id.clone(),
            room_id: room.id,
            time_slot_id: slot.id,
            booking_date: date,
            keperluan: content.keperluan,
            subject: content.subject,
            instructor: content.instructor,
            notes: content.notes,
            status: BookingStatus::Pending,
            admin_notes: None,
            display_color: self.palette.pick_random(),
            created_at: now,
            updated_at: now,
        };

        self.store.create_booking(&booking)?;

        info!(
            booking_id = %booking.id,
            user_id = %booking.user_id,
            %date,
            "Booking created"
        );

        self.detail(&booking.id)
    }

    /// Bookings of other users are reported as missing unless the caller may see all bookings.
    pub fn get(&self, caller: &CurrentUser, id: &str) -> Result<BookingDetail> {
        let detail = self.detail(id)?;
        if !caller.owns(&detail.booking.user_id) && !caller.can(Capability::VIEW_ALL_BOOKINGS) {
            return Err(Error::NotFound);
        }
        Ok(detail)
    }

    /// The caller's own bookings, newest date first.
    pub fn list_mine(&self, caller: &CurrentUser) -> Result<Vec<BookingDetail>> {
        let filter = BookingFilter {
            user_id: Some(caller.id.clone()),
            ..Default::default()
        };
        self.store
            .list_booking_details(&filter, BookingOrder::Newest, 0, None)
    }

    pub fn list_all(
        &self,
        caller: &CurrentUser,
        filter: &BookingFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BookingDetail>> {
        caller.require(Capability::VIEW_ALL_BOOKINGS)?;
        self.store
            .list_booking_details(filter, BookingOrder::Newest, offset, Some(limit))
    }

    pub fn stats(&self, caller: &CurrentUser) -> Result<BookingStats> {
        caller.require(Capability::VIEW_ALL_BOOKINGS)?;
        self.store.booking_stats()
    }

    /// Replaces the content fields of the caller's own pending booking.
    /// Room, time slot and date never change after creation.
    pub fn update(
        &self,
        caller: &CurrentUser,
        id: &str,
        content: BookingContent,
    ) -> Result<BookingDetail> {
        caller.require(Capability::BOOK_ROOMS)?;

        let mut booking = self.store.get_booking(id)?.ok_or(Error::NotFound)?;
        if !caller.owns(&booking.user_id) {
            return Err(Error::Forbidden);
        }
        if !booking.is_pending() {
            return Err(Error::InvalidState(format!(
                "booking is {}; only pending bookings can be edited",
                booking.status
            )));
        }

        let content = content.normalized()?;
        booking.keperluan = content.keperluan;
        booking.subject = content.subject;
        booking.instructor = content.instructor;
        booking.notes = content.notes;
        booking.updated_at = self.clock.now();

        self.store.update_booking_content(&booking)?;
        info!(booking_id = %id, "Booking updated");

        self.detail(id)
    }

    /// Owners may delete their pending bookings; admins may delete any booking.
    pub fn delete(&self, caller: &CurrentUser, id: &str) -> Result<()> {
        let booking = self.store.get_booking(id)?.ok_or(Error::NotFound)?;

        if !caller.can(Capability::DELETE_ANY_BOOKING) {
            if !caller.owns(&booking.user_id) {
                return Err(Error::Forbidden);
            }
            if !booking.is_pending() {
                return Err(Error::InvalidState(format!(
                    "booking is {}; only pending bookings can be cancelled",
                    booking.status
                )));
            }
        }

        if !self.store.delete_booking(id)? {
            return Err(Error::NotFound);
        }

        info!(booking_id = %id, by = %caller.id, status = %booking.status, "Booking deleted");
        Ok(())
    }

    /// pending -> approved, re-checking the slot at decision time.
    pub fn approve(
        &self,
        caller: &CurrentUser,
        id: &str,
        admin_notes: Option<String>,
    ) -> Result<BookingDetail> {
        caller.require(Capability::REVIEW_BOOKINGS)?;
        let admin_notes = optional_admin_notes(admin_notes)?;
        self.approve_pending(id, admin_notes.as_deref())?;
        self.detail(id)
    }

    /// Approval without the capability check; callers have already authorized.
    pub(crate) fn approve_pending(&self, id: &str, admin_notes: Option<&str>) -> Result<()> {
        let booking = self.store.get_booking(id)?.ok_or(Error::NotFound)?;
        if !booking.is_pending() {
            return Err(Error::InvalidState(format!(
                "booking is {}; only pending bookings can be approved",
                booking.status
            )));
        }

        let free = self.availability.is_slot_free(
            &booking.room_id,
            &booking.time_slot_id,
            booking.booking_date,
            Some(&booking.id),
        )?;
        if !free {
            warn!(booking_id = %id, date = %booking.booking_date, "Approval blocked: slot already approved");
            return Err(Error::SlotConflict);
        }

        // The unique index on approved slots catches a concurrent approval that
        // lands between the check above and this update.
        if let Err(e) = self.store.approve_booking(id, admin_notes, self.clock.now()) {
            if matches!(e, Error::SlotConflict) {
                warn!(booking_id = %id, "Approval lost race for slot");
            }
            return Err(e);
        }

        info!(booking_id = %id, "Booking approved");
        Ok(())
    }

    /// pending -> rejected. Admin notes are required.
    pub fn reject(
        &self,
        caller: &CurrentUser,
        id: &str,
        admin_notes: Option<String>,
    ) -> Result<BookingDetail> {
        caller.require(Capability::REVIEW_BOOKINGS)?;
        let admin_notes = required_admin_notes(admin_notes)?;

        let booking = self.store.get_booking(id)?.ok_or(Error::NotFound)?;
        if !booking.is_pending() {
            return Err(Error::InvalidState(format!(
                "booking is {}; only pending bookings can be rejected",
                booking.status
            )));
        }

        self.store
            .reject_booking(id, &admin_notes, self.clock.now())?;
        info!(booking_id = %id, "Booking rejected");

        self.detail(id)
    }
}
