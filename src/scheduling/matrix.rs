use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::availability::ensure_not_past;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::*;

/// What the public sees of an approved booking. Never carries the requester's
/// id or email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub id: String,
    pub title: String,
    pub keperluan: Keperluan,
    pub subject: Option<String>,
    pub instructor: Option<String>,
    pub display_color: String,
    pub user_name: String,
}

impl From<&BookingDetail> for BookingSummary {
    fn from(detail: &BookingDetail) -> Self {
        let booking = &detail.booking;
        Self {
            id: booking.id.clone(),
            title: booking.title(),
            keperluan: booking.keperluan,
            subject: booking.subject.clone(),
            instructor: booking.instructor.clone(),
            display_color: booking.display_color.clone(),
            user_name: detail.user_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixCell {
    pub room_id: String,
    pub is_booked: bool,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingSummary>,
}

/// One time slot across every room.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub time_slot: TimeSlotSummary,
    pub cells: Vec<MatrixCell>,
}

/// Projects approved bookings for one date onto a time slot x room grid.
///
/// Rows follow `time_slots` order and cells follow `rooms` order. Bookings that
/// are not approved are ignored.
pub fn build_matrix(
    rooms: &[Room],
    time_slots: &[TimeSlot],
    bookings: &[BookingDetail],
) -> Vec<MatrixRow> {
    let by_slot: HashMap<(&str, &str), &BookingDetail> = bookings
        .iter()
        .filter(|d| d.booking.status == BookingStatus::Approved)
        .map(|d| {
            (
                (d.booking.room_id.as_str(), d.booking.time_slot_id.as_str()),
                d,
            )
        })
        .collect();

    time_slots
        .iter()
        .map(|slot| MatrixRow {
            time_slot: slot.summary(),
            cells: rooms
                .iter()
                .map(|room| {
                    let booking = by_slot.get(&(room.id.as_str(), slot.id.as_str()));
                    let is_booked = booking.is_some();
                    MatrixCell {
                        room_id: room.id.clone(),
                        is_booked,
                        is_available: !is_booked && room.is_active && slot.is_active,
                        booking: booking.map(|d| BookingSummary::from(*d)),
                    }
                })
                .collect(),
        })
        .collect()
}

/// The schedule matrix for one day with the axes it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    /// e.g. "Monday, January 5, 2026".
    pub date_display: String,
    pub rooms: Vec<RoomSummary>,
    pub time_slots: Vec<TimeSlotSummary>,
    pub matrix: Vec<MatrixRow>,
    pub total_bookings: usize,
}

/// Booked state of one time slot on one day.
#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub time_slot: TimeSlotSummary,
    pub is_booked: bool,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
}

/// An approved booking as listed on the public schedule.
#[derive(Debug, Clone, Serialize)]
pub struct PublicBooking {
    pub id: String,
    pub booking_date: NaiveDate,
    pub title: String,
    pub keperluan: Keperluan,
    pub subject: Option<String>,
    pub instructor: Option<String>,
    pub display_color: String,
    pub room: RoomSummary,
    pub time_slot: TimeSlotSummary,
    pub user_name: String,
}

impl From<BookingDetail> for PublicBooking {
    fn from(detail: BookingDetail) -> Self {
        let title = detail.booking.title();
        let booking = detail.booking;
        Self {
            id: booking.id,
            booking_date: booking.booking_date,
            title,
            keperluan: booking.keperluan,
            subject: booking.subject,
            instructor: booking.instructor,
            display_color: booking.display_color,
            room: detail.room,
            time_slot: detail.time_slot,
            user_name: detail.user_name,
        }
    }
}

/// Filters for the public booking list. With no dates at all, today is used.
#[derive(Debug, Clone, Default)]
pub struct PublicBookingQuery {
    pub date: Option<NaiveDate>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub room_id: Option<String>,
    pub time_slot_id: Option<String>,
}

/// Groups listed bookings under their room name, rooms sorted by name.
pub fn group_by_room(bookings: Vec<PublicBooking>) -> BTreeMap<String, Vec<PublicBooking>> {
    let mut grouped: BTreeMap<String, Vec<PublicBooking>> = BTreeMap::new();
    for booking in bookings {
        grouped
            .entry(booking.room.name.clone())
            .or_default()
            .push(booking);
    }
    grouped
}

/// Read-only schedule queries.
#[derive(Clone)]
pub struct ScheduleView {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ScheduleView {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn approved_on(&self, date: NaiveDate, room_id: Option<&str>) -> Result<Vec<BookingDetail>> {
        let filter = BookingFilter {
            status: Some(BookingStatus::Approved),
            date: Some(date),
            room_id: room_id.map(str::to_string),
            ..Default::default()
        };
        self.store
            .list_booking_details(&filter, BookingOrder::Chronological, 0, None)
    }

    /// Matrix of active rooms (by name) against active time slots (by start time).
    /// `date` defaults to today.
    pub fn day_schedule(&self, date: Option<NaiveDate>) -> Result<DaySchedule> {
        let date = date.unwrap_or_else(|| self.clock.today());

        let rooms = self.store.list_rooms(true)?;
        let time_slots = self.store.list_time_slots(true)?;
        let bookings = self.approved_on(date, None)?;

        let matrix = build_matrix(&rooms, &time_slots, &bookings);
        let total_bookings = matrix
            .iter()
            .flat_map(|row| &row.cells)
            .filter(|cell| cell.is_booked)
            .count();

        Ok(DaySchedule {
            date,
            date_display: date.format("%A, %B %-d, %Y").to_string(),
            rooms: rooms.iter().map(Room::summary).collect(),
            time_slots: time_slots.iter().map(TimeSlot::summary).collect(),
            matrix,
            total_bookings,
        })
    }

    /// Every active time slot for one room on `date`.
    pub fn room_day(&self, room_id: &str, date: NaiveDate) -> Result<Vec<SlotStatus>> {
        ensure_not_past(self.clock.as_ref(), date)?;
        let room = self.store.get_room(room_id)?.ok_or(Error::NotFound)?;

        let taken: HashMap<String, String> = self
            .approved_on(date, Some(room_id))?
            .into_iter()
            .map(|d| (d.booking.time_slot_id, d.booking.id))
            .collect();

        Ok(self
            .store
            .list_time_slots(true)?
            .iter()
            .map(|slot| {
                let booking_id = taken.get(&slot.id).cloned();
                SlotStatus {
                    time_slot: slot.summary(),
                    is_booked: booking_id.is_some(),
                    is_available: booking_id.is_none() && room.is_active,
                    booking_id,
                }
            })
            .collect())
    }

    /// Every active time slot on `date`. Without a room, a slot counts as booked
    /// when any room has an approved booking in it.
    pub fn time_slot_day(&self, date: NaiveDate, room_id: Option<&str>) -> Result<Vec<SlotStatus>> {
        ensure_not_past(self.clock.as_ref(), date)?;
        if let Some(id) = room_id {
            self.store.get_room(id)?.ok_or(Error::NotFound)?;
        }

        let bookings = self.approved_on(date, room_id)?;

        Ok(self
            .store
            .list_time_slots(true)?
            .iter()
            .map(|slot| {
                let booked = bookings.iter().find(|d| d.booking.time_slot_id == slot.id);
                SlotStatus {
                    time_slot: slot.summary(),
                    is_booked: booked.is_some(),
                    is_available: booked.is_none(),
                    booking_id: room_id.and(booked.map(|d| d.booking.id.clone())),
                }
            })
            .collect())
    }

    /// Approved bookings ordered by date then creation.
    pub fn public_bookings(&self, query: PublicBookingQuery) -> Result<Vec<PublicBooking>> {
        let date = match (query.date, query.date_from, query.date_to) {
            (None, None, None) => Some(self.clock.today()),
            (date, _, _) => date,
        };
        if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
            if from > to {
                return Err(Error::validation("date_from must not be after date_to"));
            }
        }

        let filter = BookingFilter {
            status: Some(BookingStatus::Approved),
            date,
            date_from: query.date_from,
            date_to: query.date_to,
            room_id: query.room_id,
            time_slot_id: query.time_slot_id,
            ..Default::default()
        };

        Ok(self
            .store
            .list_booking_details(&filter, BookingOrder::Chronological, 0, None)?
            .into_iter()
            .map(PublicBooking::from)
            .collect())
    }
}
