use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduling::{BookingContent, PublicBooking};
use crate::types::{BookingDetail, BookingStats, BookingStatus, Keperluan, Role, User};

use super::response::PaginatedResponse;

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateParams {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleBookingsParams {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub time_slot_id: Option<String>,
    #[serde(default)]
    pub group_by_room: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotDayParams {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub room_id: String,
    pub time_slot_id: String,
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminBookingsParams {
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub room_id: String,
    pub time_slot_id: String,
    pub booking_date: String,
    pub keperluan: Keperluan,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Room, time slot and date are fixed after creation, so they are refused here.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBookingRequest {
    pub keperluan: Keperluan,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<UpdateBookingRequest> for BookingContent {
    fn from(req: UpdateBookingRequest) -> Self {
        Self {
            keperluan: req.keperluan,
            subject: req.subject,
            instructor: req.instructor,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkApproveRequest {
    pub booking_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkRejectRequest {
    pub booking_ids: Vec<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkRejectResponse {
    pub rejected_count: usize,
}

/// Admin booking list: one page plus counters over every booking.
#[derive(Debug, Serialize)]
pub struct BookingPageResponse {
    #[serde(flatten)]
    pub page: PaginatedResponse<BookingDetail>,
    pub stats: BookingStats,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PublicBookingsResponse {
    List(Vec<PublicBooking>),
    ByRoom(std::collections::BTreeMap<String, Vec<PublicBooking>>),
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub capacity: i32,
    #[serde(default)]
    pub facilities: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoomRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub facilities: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTimeSlotRequest {
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTimeSlotRequest {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub token_expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: User,
    /// Shown once; only its hash is stored.
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub capabilities: Vec<&'static str>,
}

fn default_true() -> bool {
    true
}
