//! Booking rules: availability, the booking state machine, the schedule matrix,
//! bulk review and the room/time slot catalog.

mod availability;
mod bulk;
mod catalog;
mod lifecycle;
mod matrix;

#[cfg(test)]
mod test_support;

pub use availability::{AvailabilityChecker, SlotAvailability};
pub use bulk::{BulkApproveOutcome, BulkCoordinator};
pub use catalog::{Catalog, NewRoom, NewTimeSlot, RoomChanges, TimeSlotChanges};
pub use lifecycle::{BookingContent, BookingManager, NewBooking};
pub use matrix::{
    BookingSummary, DaySchedule, MatrixCell, MatrixRow, PublicBooking, PublicBookingQuery,
    ScheduleView, SlotStatus, build_matrix, group_by_room,
};
