use std::sync::Arc;

use chrono::NaiveTime;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::*;

pub const MAX_ROOM_NAME_LEN: usize = 100;
pub const MAX_FACILITIES_LEN: usize = 1000;
pub const MIN_CAPACITY: i32 = 1;
pub const MAX_CAPACITY: i32 = 1000;

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub capacity: i32,
    pub facilities: Option<String>,
    pub is_active: bool,
}

/// Partial room update. An empty `facilities` string clears the field.
#[derive(Debug, Clone, Default)]
pub struct RoomChanges {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub facilities: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewTimeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TimeSlotChanges {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_active: Option<bool>,
}

/// Rooms and daily time slots. Reads are public; writes need `MANAGE_CATALOG`.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    // Rooms

    pub fn list_rooms(&self, active_only: bool) -> Result<Vec<Room>> {
        self.store.list_rooms(active_only)
    }

    pub fn get_room(&self, id: &str) -> Result<Room> {
        self.store.get_room(id)?.ok_or(Error::NotFound)
    }

    pub fn create_room(&self, caller: &CurrentUser, new: NewRoom) -> Result<Room> {
        caller.require(Capability::MANAGE_CATALOG)?;

        let name = validate_room_name(&new.name)?;
        validate_capacity(new.capacity)?;
        let facilities = validate_facilities(new.facilities)?;
        self.ensure_room_name_free(&name, None)?;

        let now = self.clock.now();
        let room = Room {
            id: Uuid::new_v4().to_string(),
            name,
            capacity: new.capacity,
            facilities,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        self.store.create_room(&room)?;

        info!(room_id = %room.id, name = %room.name, "Room created");
        Ok(room)
    }

    pub fn update_room(&self, caller: &CurrentUser, id: &str, changes: RoomChanges) -> Result<Room> {
        caller.require(Capability::MANAGE_CATALOG)?;
        let mut room = self.get_room(id)?;

        if let Some(name) = changes.name {
            let name = validate_room_name(&name)?;
            self.ensure_room_name_free(&name, Some(id))?;
            room.name = name;
        }
        if let Some(capacity) = changes.capacity {
            validate_capacity(capacity)?;
            room.capacity = capacity;
        }
        if changes.facilities.is_some() {
            room.facilities = validate_facilities(changes.facilities)?;
        }
        if let Some(active) = changes.is_active {
            room.is_active = active;
        }
        room.updated_at = self.clock.now();

        self.store.update_room(&room)?;
        info!(room_id = %room.id, "Room updated");
        Ok(room)
    }

    /// Rooms referenced by any booking cannot be deleted.
    pub fn delete_room(&self, caller: &CurrentUser, id: &str) -> Result<()> {
        caller.require(Capability::MANAGE_CATALOG)?;
        let room = self.get_room(id)?;

        let bookings = self.store.count_room_bookings(id)?;
        if bookings > 0 {
            return Err(Error::Conflict(format!(
                "room {} still has {bookings} booking(s)",
                room.name
            )));
        }

        if !self.store.delete_room(id)? {
            return Err(Error::NotFound);
        }
        info!(room_id = %id, name = %room.name, "Room deleted");
        Ok(())
    }

    fn ensure_room_name_free(&self, name: &str, except_id: Option<&str>) -> Result<()> {
        match self.store.get_room_by_name(name)? {
            Some(existing) if Some(existing.id.as_str()) != except_id => Err(Error::AlreadyExists),
            _ => Ok(()),
        }
    }

    // Time slots

    pub fn list_time_slots(&self, active_only: bool) -> Result<Vec<TimeSlot>> {
        self.store.list_time_slots(active_only)
    }

    pub fn get_time_slot(&self, id: &str) -> Result<TimeSlot> {
        self.store.get_time_slot(id)?.ok_or(Error::NotFound)
    }

    pub fn create_time_slot(&self, caller: &CurrentUser, new: NewTimeSlot) -> Result<TimeSlot> {
        caller.require(Capability::MANAGE_CATALOG)?;
        ensure_ordered(new.start_time, new.end_time)?;

        let now = self.clock.now();
        let slot = TimeSlot {
            id: Uuid::new_v4().to_string(),
            start_time: new.start_time,
            end_time: new.end_time,
            label: TimeSlot::label_for(new.start_time, new.end_time),
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        self.store.create_time_slot(&slot)?;

        info!(time_slot_id = %slot.id, label = %slot.label, "Time slot created");
        Ok(slot)
    }

    pub fn update_time_slot(
        &self,
        caller: &CurrentUser,
        id: &str,
        changes: TimeSlotChanges,
    ) -> Result<TimeSlot> {
        caller.require(Capability::MANAGE_CATALOG)?;
        let mut slot = self.get_time_slot(id)?;

        let start = changes.start_time.unwrap_or(slot.start_time);
        let end = changes.end_time.unwrap_or(slot.end_time);
        ensure_ordered(start, end)?;

        slot.start_time = start;
        slot.end_time = end;
        slot.label = TimeSlot::label_for(start, end);
        if let Some(active) = changes.is_active {
            slot.is_active = active;
        }
        slot.updated_at = self.clock.now();

        self.store.update_time_slot(&slot)?;
        info!(time_slot_id = %slot.id, label = %slot.label, "Time slot updated");
        Ok(slot)
    }

    /// Time slots referenced by any booking cannot be deleted.
    pub fn delete_time_slot(&self, caller: &CurrentUser, id: &str) -> Result<()> {
        caller.require(Capability::MANAGE_CATALOG)?;
        let slot = self.get_time_slot(id)?;

        let bookings = self.store.count_time_slot_bookings(id)?;
        if bookings > 0 {
            return Err(Error::Conflict(format!(
                "time slot {} still has {bookings} booking(s)",
                slot.label
            )));
        }

        if !self.store.delete_time_slot(id)? {
            return Err(Error::NotFound);
        }
        info!(time_slot_id = %id, label = %slot.label, "Time slot deleted");
        Ok(())
    }
}

/// Overlap with other slots is checked by the store in the same transaction as
/// the write.
fn ensure_ordered(start: NaiveTime, end: NaiveTime) -> Result<()> {
    if end <= start {
        return Err(Error::validation("end_time must be after start_time"));
    }
    Ok(())
}

fn validate_room_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("room name is required"));
    }
    if name.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(Error::validation(format!(
            "room name must be at most {MAX_ROOM_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_capacity(capacity: i32) -> Result<()> {
    if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
        return Err(Error::validation(format!(
            "capacity must be between {MIN_CAPACITY} and {MAX_CAPACITY}"
        )));
    }
    Ok(())
}

fn validate_facilities(facilities: Option<String>) -> Result<Option<String>> {
    let facilities = facilities
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    if facilities
        .as_deref()
        .is_some_and(|f| f.chars().count() > MAX_FACILITIES_LEN)
    {
        return Err(Error::validation(format!(
            "facilities must be at most {MAX_FACILITIES_LEN} characters"
        )));
    }
    Ok(facilities)
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use chrono::Duration;

    use super::*;
    use crate::scheduling::test_support::Fixture;
    use crate::types::hhmm;

    fn t(s: &str) -> NaiveTime {
        hhmm::parse(s).unwrap()
    }

    fn new_slot(start: &str, end: &str) -> NewTimeSlot {
        NewTimeSlot {
            start_time: t(start),
            end_time: t(end),
            is_active: true,
        }
    }

    fn new_room(name: &str, capacity: i32) -> NewRoom {
        NewRoom {
            name: name.to_string(),
            capacity,
            facilities: Some(" Projector, AC ".to_string()),
            is_active: true,
        }
    }

    #[test]
    fn test_create_room_validates() {
        let fx = Fixture::new();
        let catalog = fx.catalog();
        let admin = fx.admin();

        let room = catalog.create_room(&admin, new_room("  Lab 3 ", 40)).unwrap();
        assert_eq!(room.name, "Lab 3");
        assert_eq!(room.facilities.as_deref(), Some("Projector, AC"));

        for capacity in [0, 1001] {
            assert!(matches!(
                catalog.create_room(&admin, new_room("Hall", capacity)),
                Err(Error::Validation(_))
            ));
        }
        assert!(matches!(
            catalog.create_room(&admin, new_room("   ", 10)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            catalog.create_room(&admin, new_room("R1", 10)),
            Err(Error::AlreadyExists)
        ));
        assert!(matches!(
            catalog.create_room(&fx.user("alice"), new_room("Hall", 10)),
            Err(Error::Forbidden)
        ));
    }

    #[test]
    fn test_update_room_keeps_own_name() {
        let fx = Fixture::new();
        let catalog = fx.catalog();

        let updated = catalog
            .update_room(
                &fx.admin(),
                "r1",
                RoomChanges {
                    name: Some("R1".to_string()),
                    capacity: Some(25),
                    facilities: Some(String::new()),
                    is_active: Some(false),
                },
            )
            .unwrap();
        assert_eq!(updated.capacity, 25);
        assert!(updated.facilities.is_none());
        assert!(!updated.is_active);

        assert!(matches!(
            catalog.update_room(
                &fx.admin(),
                "r1",
                RoomChanges {
                    name: Some("R2".to_string()),
                    ..Default::default()
                }
            ),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_room_delete_guard() {
        let fx = Fixture::new();
        let catalog = fx.catalog();
        fx.insert_booking("alice", "r1", "s1", fx.day(1), BookingStatus::Rejected);

        assert!(matches!(
            catalog.delete_room(&fx.admin(), "r1"),
            Err(Error::Conflict(_))
        ));
        catalog.delete_room(&fx.admin(), "r2").unwrap();
        assert!(matches!(catalog.get_room("r2"), Err(Error::NotFound)));
    }

    #[test]
    fn test_time_slot_overlap_rejected() {
        let fx = Fixture::new();
        let catalog = fx.catalog();
        let admin = fx.admin();

        // Seeded slots cover 09:00-12:00.
        for (start, end) in [("09:30", "10:30"), ("08:00", "13:00"), ("11:15", "11:45")] {
            assert!(
                matches!(
                    catalog.create_time_slot(&admin, new_slot(start, end)),
                    Err(Error::Validation(_))
                ),
                "{start}-{end} should overlap"
            );
        }

        let touching = catalog.create_time_slot(&admin, new_slot("12:00", "13:00")).unwrap();
        assert_eq!(touching.label, "12:00 - 13:00");
        catalog.create_time_slot(&admin, new_slot("07:00", "09:00")).unwrap();

        assert!(matches!(
            catalog.create_time_slot(&admin, new_slot("15:00", "15:00")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            catalog.create_time_slot(&admin, new_slot("16:00", "15:00")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_time_slot_update_excludes_itself() {
        let fx = Fixture::new();
        let catalog = fx.catalog();

        let widened = catalog
            .update_time_slot(
                &fx.admin(),
                "s3",
                TimeSlotChanges {
                    end_time: Some(t("12:30")),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(widened.label, "11:00 - 12:30");

        let clash = catalog.update_time_slot(
            &fx.admin(),
            "s3",
            TimeSlotChanges {
                start_time: Some(t("10:30")),
                ..Default::default()
            },
        );
        assert!(matches!(clash, Err(Error::Validation(_))));
    }

    #[test]
    fn test_time_slot_delete_guard() {
        let fx = Fixture::new();
        let catalog = fx.catalog();
        fx.insert_booking("alice", "r1", "s2", fx.day(1), BookingStatus::Pending);

        assert!(matches!(
            catalog.delete_time_slot(&fx.admin(), "s2"),
            Err(Error::Conflict(_))
        ));
        catalog.delete_time_slot(&fx.admin(), "s3").unwrap();
        assert_eq!(catalog.list_time_slots(false).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_overlapping_creates_keep_one() {
        let fx = Fixture::new();
        let catalog = fx.catalog();
        let admin = fx.admin();
        let barrier = Barrier::new(2);

        for round in 0..40 {
            let base = t("13:00") + Duration::minutes(3 * round);
            let windows = [
                (base, base + Duration::minutes(2)),
                (base + Duration::minutes(1), base + Duration::minutes(3)),
            ];

            let created = thread::scope(|scope| {
                let handles = windows.map(|(start, end)| {
                    let (catalog, admin, barrier) = (&catalog, &admin, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        catalog.create_time_slot(
                            admin,
                            NewTimeSlot {
                                start_time: start,
                                end_time: end,
                                is_active: true,
                            },
                        )
                    })
                });
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(Result::is_ok)
                    .count()
            });
            assert_eq!(created, 1, "round {round}");
        }

        let slots = catalog.list_time_slots(false).unwrap();
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                assert!(
                    !a.overlaps(b.start_time, b.end_time),
                    "{} overlaps {}",
                    a.label,
                    b.label
                );
            }
        }
    }
}
