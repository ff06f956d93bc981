//! Throwaway database with a small seeded catalog, shared by the scheduling tests.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use tempfile::TempDir;

use super::{AvailabilityChecker, BookingManager, BulkCoordinator, Catalog, ScheduleView};
use crate::clock::{Clock, FixedClock};
use crate::palette::DefaultPalette;
use crate::store::{SqliteStore, Store};
use crate::types::*;

pub struct Fixture {
    _temp: TempDir,
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub today: NaiveDate,
}

impl Fixture {
    /// Users `alice`, `bob` and `admin`; rooms `r1` ("R1") and `r2` ("R2");
    /// slots `s1` 09-10, `s2` 10-11, `s3` 11-12. Today is 2030-05-01.
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let store: Arc<dyn Store> = Arc::new(store);

        let today = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let now = Utc::now();

        for (id, name, role) in [
            ("alice", "Alice", Role::User),
            ("bob", "Bob", Role::User),
            ("admin", "Admin", Role::Admin),
        ] {
            store
                .create_user(&User {
                    id: id.to_string(),
                    name: name.to_string(),
                    email: format!("{id}@campus.test"),
                    role,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
        }

        for (id, name) in [("r1", "R1"), ("r2", "R2")] {
            store
                .create_room(&Room {
                    id: id.to_string(),
                    name: name.to_string(),
                    capacity: 10,
                    facilities: None,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
        }

        for (id, start, end) in [("s1", 9, 10), ("s2", 10, 11), ("s3", 11, 12)] {
            let start = NaiveTime::from_hms_opt(start, 0, 0).unwrap();
            let end = NaiveTime::from_hms_opt(end, 0, 0).unwrap();
            store
                .create_time_slot(&TimeSlot {
                    id: id.to_string(),
                    start_time: start,
                    end_time: end,
                    label: TimeSlot::label_for(start, end),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
        }

        Self {
            _temp: temp,
            store,
            clock: Arc::new(FixedClock::on(today)),
            today,
        }
    }

    pub fn day(&self, offset: i64) -> NaiveDate {
        if offset >= 0 {
            self.today + Days::new(offset as u64)
        } else {
            self.today - Days::new(offset.unsigned_abs())
        }
    }

    pub fn user(&self, id: &str) -> CurrentUser {
        CurrentUser::new(id, Role::User)
    }

    pub fn admin(&self) -> CurrentUser {
        CurrentUser::new("admin", Role::Admin)
    }

    pub fn checker(&self) -> AvailabilityChecker {
        AvailabilityChecker::new(self.store.clone(), self.clock.clone())
    }

    pub fn manager(&self) -> BookingManager {
        BookingManager::new(
            self.store.clone(),
            self.clock.clone(),
            Arc::new(DefaultPalette),
        )
    }

    pub fn bulk(&self) -> BulkCoordinator {
        BulkCoordinator::new(self.manager())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.store.clone(), self.clock.clone())
    }

    pub fn schedule(&self) -> ScheduleView {
        ScheduleView::new(self.store.clone(), self.clock.clone())
    }

    /// Inserts a pending booking directly, then moves it to `status`.
    pub fn insert_booking(
        &self,
        user_id: &str,
        room_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
        status: BookingStatus,
    ) -> String {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        self.store
            .create_booking(&Booking {
                id: id.clone(),
                user_id: user_id.to_string(),
                room_id: room_id.to_string(),
                time_slot_id: time_slot_id.to_string(),
                booking_date: date,
                keperluan: Keperluan::Class,
                subject: Some("Algorithms".to_string()),
                instructor: Some("Dr. Sari".to_string()),
                notes: None,
                status: BookingStatus::Pending,
                admin_notes: None,
                display_color: "#3B82F6".to_string(),
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        match status {
            BookingStatus::Pending => {}
            BookingStatus::Approved => self.approve(&id),
            BookingStatus::Rejected => self.reject(&id),
        }
        id
    }

    pub fn approve(&self, id: &str) {
        self.store.approve_booking(id, None, Utc::now()).unwrap();
    }

    pub fn reject(&self, id: &str) {
        self.store.reject_booking(id, "No", Utc::now()).unwrap();
    }

    pub fn status_of(&self, id: &str) -> BookingStatus {
        self.store.get_booking(id).unwrap().unwrap().status
    }

    pub fn deactivate_room(&self, id: &str) {
        let mut room = self.store.get_room(id).unwrap().unwrap();
        room.is_active = false;
        self.store.update_room(&room).unwrap();
    }

    pub fn deactivate_slot(&self, id: &str) {
        let mut slot = self.store.get_time_slot(id).unwrap().unwrap();
        slot.is_active = false;
        self.store.update_time_slot(&slot).unwrap();
    }
}
