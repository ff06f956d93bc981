use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, Value, ValueRef};
use rusqlite::{
    Connection, OptionalExtension, Row, ToSql, TransactionBehavior, params, params_from_iter,
};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

macro_rules! text_enum_sql {
    ($ty:ty, $what:literal) => {
        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_str()?;
                <$ty>::parse(raw)
                    .ok_or_else(|| FromSqlError::Other(format!("unknown {}: {raw}", $what).into()))
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }
    };
}

text_enum_sql!(Role, "role");
text_enum_sql!(Keperluan, "keperluan");
text_enum_sql!(BookingStatus, "booking status");

const USER_COLUMNS: &str = "id, name, email, role, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
    })
}

const ROOM_COLUMNS: &str = "id, name, capacity, facilities, is_active, created_at, updated_at";

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        name: row.get(1)?,
        capacity: row.get(2)?,
        facilities: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const TIME_SLOT_COLUMNS: &str = "id, start_time, end_time, label, is_active, created_at, updated_at";

fn time_slot_from_row(row: &Row<'_>) -> rusqlite::Result<TimeSlot> {
    Ok(TimeSlot {
        id: row.get(0)?,
        start_time: time_column(row, 1)?,
        end_time: time_column(row, 2)?,
        label: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const BOOKING_SELECT: &str = "SELECT b.id, b.user_id, b.room_id, b.time_slot_id, b.booking_date,
        b.keperluan, b.subject, b.instructor, b.notes, b.status, b.admin_notes,
        b.display_color, b.created_at, b.updated_at
     FROM bookings b";

const BOOKING_DETAIL_SELECT: &str = "SELECT b.id, b.user_id, b.room_id, b.time_slot_id, b.booking_date,
        b.keperluan, b.subject, b.instructor, b.notes, b.status, b.admin_notes,
        b.display_color, b.created_at, b.updated_at,
        r.name, r.capacity, t.label, t.start_time, t.end_time, u.name
     FROM bookings b
     JOIN rooms r ON r.id = b.room_id
     JOIN time_slots t ON t.id = b.time_slot_id
     JOIN users u ON u.id = b.user_id";

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        room_id: row.get(2)?,
        time_slot_id: row.get(3)?,
        booking_date: date_column(row, 4)?,
        keperluan: row.get(5)?,
        subject: row.get(6)?,
        instructor: row.get(7)?,
        notes: row.get(8)?,
        status: row.get(9)?,
        admin_notes: row.get(10)?,
        display_color: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?),
        updated_at: parse_datetime(&row.get::<_, String>(13)?),
    })
}

fn booking_detail_from_row(row: &Row<'_>) -> rusqlite::Result<BookingDetail> {
    let booking = booking_from_row(row)?;
    let room = RoomSummary {
        id: booking.room_id.clone(),
        name: row.get(14)?,
        capacity: row.get(15)?,
    };
    let time_slot = TimeSlotSummary {
        id: booking.time_slot_id.clone(),
        label: row.get(16)?,
        start_time: time_column(row, 17)?,
        end_time: time_column(row, 18)?,
    };
    Ok(BookingDetail {
        booking,
        room,
        time_slot,
        user_name: row.get(19)?,
    })
}

/// Numbered SQL arguments collected while building a dynamic WHERE clause.
#[derive(Default)]
struct SqlArgs {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl SqlArgs {
    /// Adds `clause`, binding every `?` in it to `value`.
    fn push(&mut self, clause: &str, value: Value) {
        self.values.push(value);
        let placeholder = format!("?{}", self.values.len());
        self.clauses.push(clause.replace('?', &placeholder));
    }

    fn bind(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("?{}", self.values.len())
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Makes `%`, `_` and `\` match literally in a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn booking_filter_args(filter: &BookingFilter) -> SqlArgs {
    let mut args = SqlArgs::default();

    if let Some(status) = filter.status {
        args.push("b.status = ?", Value::Text(status.as_str().to_string()));
    }
    if let Some(date) = filter.date {
        args.push("b.booking_date = ?", Value::Text(format_date(date)));
    }
    if let Some(from) = filter.date_from {
        args.push("b.booking_date >= ?", Value::Text(format_date(from)));
    }
    if let Some(to) = filter.date_to {
        args.push("b.booking_date <= ?", Value::Text(format_date(to)));
    }
    if let Some(room_id) = &filter.room_id {
        args.push("b.room_id = ?", Value::Text(room_id.clone()));
    }
    if let Some(time_slot_id) = &filter.time_slot_id {
        args.push("b.time_slot_id = ?", Value::Text(time_slot_id.clone()));
    }
    if let Some(user_id) = &filter.user_id {
        args.push("b.user_id = ?", Value::Text(user_id.clone()));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        args.push(
            "(u.name LIKE ? ESCAPE '\\' OR b.subject LIKE ? ESCAPE '\\' OR b.instructor LIKE ? ESCAPE '\\')",
            Value::Text(format!("%{}%", escape_like(search))),
        );
    }

    args
}

/// Rejects `slot` if its [start, end) interval meets any other slot, inactive
/// ones included. "HH:MM" text compares in time order.
fn ensure_no_slot_overlap(conn: &Connection, slot: &TimeSlot) -> Result<()> {
    let clash: Option<String> = conn
        .query_row(
            "SELECT label FROM time_slots
             WHERE start_time < ?1 AND end_time > ?2 AND id != ?3
             ORDER BY start_time LIMIT 1",
            params![
                format_time(slot.end_time),
                format_time(slot.start_time),
                slot.id
            ],
            |row| row.get(0),
        )
        .optional()?;

    match clash {
        Some(label) => Err(Error::validation(format!(
            "time slot overlaps existing slot {label}"
        ))),
        None => Ok(()),
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, name, email, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.name,
                user.email,
                user.role,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::NotFound),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Room operations

    fn create_room(&self, room: &Room) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO rooms (id, name, capacity, facilities, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                room.id,
                room.name,
                room.capacity,
                room.facilities,
                room.is_active,
                format_datetime(&room.created_at),
                format_datetime(&room.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_room(&self, id: &str) -> Result<Option<Room>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1"),
            params![id],
            room_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_room_by_name(&self, name: &str) -> Result<Option<Room>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE name = ?1"),
            params![name],
            room_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_rooms(&self, active_only: bool) -> Result<Vec<Room>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE (?1 = 0 OR is_active = 1) ORDER BY name, id"
        ))?;

        let rows = stmt.query_map(params![active_only], room_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_room(&self, room: &Room) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE rooms SET name = ?1, capacity = ?2, facilities = ?3, is_active = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                room.name,
                room.capacity,
                room.facilities,
                room.is_active,
                format_datetime(&room.updated_at),
                room.id
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn delete_room(&self, id: &str) -> Result<bool> {
        let result = self
            .conn()
            .execute("DELETE FROM rooms WHERE id = ?1", params![id]);

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_foreign_key_violation(&e) => {
                Err(Error::Conflict("Room is referenced by bookings".to_string()))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn count_room_bookings(&self, id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE room_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Time slot operations

    fn create_time_slot(&self, slot: &TimeSlot) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_no_slot_overlap(&tx, slot)?;
        tx.execute(
            "INSERT INTO time_slots (id, start_time, end_time, label, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                slot.id,
                format_time(slot.start_time),
                format_time(slot.end_time),
                slot.label,
                slot.is_active,
                format_datetime(&slot.created_at),
                format_datetime(&slot.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_time_slot(&self, id: &str) -> Result<Option<TimeSlot>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TIME_SLOT_COLUMNS} FROM time_slots WHERE id = ?1"),
            params![id],
            time_slot_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_time_slots(&self, active_only: bool) -> Result<Vec<TimeSlot>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TIME_SLOT_COLUMNS} FROM time_slots
             WHERE (?1 = 0 OR is_active = 1) ORDER BY start_time, id"
        ))?;

        let rows = stmt.query_map(params![active_only], time_slot_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_time_slot(&self, slot: &TimeSlot) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_no_slot_overlap(&tx, slot)?;
        let rows = tx.execute(
            "UPDATE time_slots SET start_time = ?1, end_time = ?2, label = ?3, is_active = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                format_time(slot.start_time),
                format_time(slot.end_time),
                slot.label,
                slot.is_active,
                format_datetime(&slot.updated_at),
                slot.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_time_slot(&self, id: &str) -> Result<bool> {
        let result = self
            .conn()
            .execute("DELETE FROM time_slots WHERE id = ?1", params![id]);

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::Conflict(
                "Time slot is referenced by bookings".to_string(),
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn count_time_slot_bookings(&self, id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE time_slot_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Booking operations

    fn create_booking(&self, booking: &Booking) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO bookings (id, user_id, room_id, time_slot_id, booking_date, keperluan,
                                   subject, instructor, notes, status, admin_notes, display_color,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                booking.id,
                booking.user_id,
                booking.room_id,
                booking.time_slot_id,
                format_date(booking.booking_date),
                booking.keperluan,
                booking.subject,
                booking.instructor,
                booking.notes,
                booking.status,
                booking.admin_notes,
                booking.display_color,
                format_datetime(&booking.created_at),
                format_datetime(&booking.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            // Both partial unique indexes can fire here; the slot index only when
            // inserting an already-approved row.
            Err(e) if is_unique_violation(&e) => {
                if booking.status == BookingStatus::Approved
                    && self.approved_booking_exists(
                        &booking.room_id,
                        &booking.time_slot_id,
                        booking.booking_date,
                        None,
                    )?
                {
                    Err(Error::SlotConflict)
                } else {
                    Err(Error::UserConflict)
                }
            }
            Err(e) if is_foreign_key_violation(&e) => Err(Error::NotFound),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_booking(&self, id: &str) -> Result<Option<Booking>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{BOOKING_SELECT} WHERE b.id = ?1"),
            params![id],
            booking_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_booking_detail(&self, id: &str) -> Result<Option<BookingDetail>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{BOOKING_DETAIL_SELECT} WHERE b.id = ?1"),
            params![id],
            booking_detail_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_booking_details(
        &self,
        filter: &BookingFilter,
        order: BookingOrder,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<BookingDetail>> {
        let mut args = booking_filter_args(filter);
        let order_sql = match order {
            BookingOrder::Newest => "b.booking_date DESC, b.created_at DESC, b.id",
            BookingOrder::Chronological => "b.booking_date ASC, b.created_at ASC, b.id",
        };
        let where_sql = args.where_sql();
        // SQLite treats a negative LIMIT as "no limit".
        let limit_param = args.bind(Value::Integer(limit.unwrap_or(-1)));
        let offset_param = args.bind(Value::Integer(offset.max(0)));

        let sql = format!(
            "{BOOKING_DETAIL_SELECT}{where_sql} ORDER BY {order_sql} LIMIT {limit_param} OFFSET {offset_param}"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.values.iter()), booking_detail_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_booking_content(&self, booking: &Booking) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE bookings SET keperluan = ?1, subject = ?2, instructor = ?3, notes = ?4, updated_at = ?5
             WHERE id = ?6 AND status = 'pending'",
            params![
                booking.keperluan,
                booking.subject,
                booking.instructor,
                booking.notes,
                format_datetime(&booking.updated_at),
                booking.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::InvalidState(
                "only pending bookings can be edited".to_string(),
            ));
        }
        Ok(())
    }

    fn delete_booking(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn approve_booking(
        &self,
        id: &str,
        admin_notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = self.conn().execute(
            "UPDATE bookings SET status = 'approved', admin_notes = ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            params![admin_notes, format_datetime(&at), id],
        );

        match result {
            Ok(0) => Err(Error::InvalidState(
                "only pending bookings can be approved".to_string(),
            )),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::SlotConflict),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn reject_booking(&self, id: &str, admin_notes: &str, at: DateTime<Utc>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE bookings SET status = 'rejected', admin_notes = ?1, updated_at = ?2
             WHERE id = ?3 AND status = 'pending'",
            params![admin_notes, format_datetime(&at), id],
        )?;

        if rows == 0 {
            return Err(Error::InvalidState(
                "only pending bookings can be rejected".to_string(),
            ));
        }
        Ok(())
    }

    fn list_pending_bookings(&self, ids: &[String]) -> Result<Vec<Booking>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = SqlArgs::default();
        let id_params: Vec<String> = ids
            .iter()
            .map(|id| args.bind(Value::Text(id.clone())))
            .collect();

        let sql = format!(
            "{BOOKING_SELECT} WHERE b.status = 'pending' AND b.id IN ({})
             ORDER BY b.created_at, b.rowid",
            id_params.join(", ")
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.values.iter()), booking_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn reject_pending_bookings(
        &self,
        ids: &[String],
        admin_notes: &str,
        at: DateTime<Utc>,
    ) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut args = SqlArgs::default();
        let notes_param = args.bind(Value::Text(admin_notes.to_string()));
        let at_param = args.bind(Value::Text(format_datetime(&at)));
        let id_params: Vec<String> = ids
            .iter()
            .map(|id| args.bind(Value::Text(id.clone())))
            .collect();

        let sql = format!(
            "UPDATE bookings SET status = 'rejected', admin_notes = {notes_param}, updated_at = {at_param}
             WHERE status = 'pending' AND id IN ({})",
            id_params.join(", ")
        );

        let rows = self
            .conn()
            .execute(&sql, params_from_iter(args.values.iter()))?;
        Ok(rows)
    }

    fn approved_booking_exists(
        &self,
        room_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
        exclude_booking_id: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM bookings
                 WHERE room_id = ?1 AND time_slot_id = ?2 AND booking_date = ?3
                   AND status = 'approved'
                   AND (?4 IS NULL OR id != ?4)
             )",
            params![room_id, time_slot_id, format_date(date), exclude_booking_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn live_user_booking_exists(
        &self,
        user_id: &str,
        time_slot_id: &str,
        date: NaiveDate,
    ) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM bookings
                 WHERE user_id = ?1 AND time_slot_id = ?2 AND booking_date = ?3
                   AND status IN ('pending', 'approved')
             )",
            params![user_id, time_slot_id, format_date(date)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn booking_stats(&self) -> Result<BookingStats> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'approved' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'rejected' THEN 1 ELSE 0 END), 0)
             FROM bookings",
            [],
            |row| {
                Ok(BookingStats {
                    total: row.get(0)?,
                    pending: row.get(1)?,
                    approved: row.get(2)?,
                    rejected: row.get(3)?,
                })
            },
        )
        .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, TIME_FORMAT).unwrap()
    }

    fn user(store: &SqliteStore, id: &str, name: &str) {
        let now = Utc::now();
        store
            .create_user(&User {
                id: id.to_string(),
                name: name.to_string(),
                email: format!("{id}@campus.test"),
                role: Role::User,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn room(store: &SqliteStore, id: &str, name: &str) {
        let now = Utc::now();
        store
            .create_room(&Room {
                id: id.to_string(),
                name: name.to_string(),
                capacity: 30,
                facilities: Some("Projector".to_string()),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn slot(store: &SqliteStore, id: &str, start: &str, end: &str) {
        let now = Utc::now();
        store
            .create_time_slot(&TimeSlot {
                id: id.to_string(),
                start_time: time(start),
                end_time: time(end),
                label: TimeSlot::label_for(time(start), time(end)),
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    fn booking(id: &str, user_id: &str, room_id: &str, slot_id: &str, day: &str) -> Booking {
        let now = Utc::now();
        Booking {
            id: id.to_string(),
            user_id: user_id.to_string(),
            room_id: room_id.to_string(),
            time_slot_id: slot_id.to_string(),
            booking_date: date(day),
            keperluan: Keperluan::Class,
            subject: Some("Databases".to_string()),
            instructor: Some("Dr. Rahman".to_string()),
            notes: None,
            status: BookingStatus::Pending,
            admin_notes: None,
            display_color: "#10B981".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn seeded() -> (TempDir, SqliteStore) {
        let (temp, store) = open();
        user(&store, "u-a", "Alice");
        user(&store, "u-b", "Budi");
        room(&store, "r-1", "R1");
        room(&store, "r-2", "R2");
        slot(&store, "s-1", "09:00", "10:00");
        slot(&store, "s-2", "10:00", "11:00");
        (temp, store)
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = open();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in ["users", "tokens", "rooms", "time_slots", "bookings"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_temp, store) = open();
        store.initialize().unwrap();
    }

    #[test]
    fn test_room_crud_and_unique_name() {
        let (_temp, store) = open();
        room(&store, "r-1", "Lab Komputer");

        let fetched = store.get_room("r-1").unwrap().unwrap();
        assert_eq!(fetched.name, "Lab Komputer");
        assert_eq!(fetched.facilities.as_deref(), Some("Projector"));
        assert!(store.get_room_by_name("Lab Komputer").unwrap().is_some());

        let now = Utc::now();
        let duplicate = Room {
            id: "r-2".to_string(),
            name: "Lab Komputer".to_string(),
            capacity: 10,
            facilities: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            store.create_room(&duplicate),
            Err(Error::AlreadyExists)
        ));

        let mut updated = fetched.clone();
        updated.is_active = false;
        store.update_room(&updated).unwrap();
        assert!(store.list_rooms(true).unwrap().is_empty());
        assert_eq!(store.list_rooms(false).unwrap().len(), 1);

        assert!(store.delete_room("r-1").unwrap());
        assert!(store.get_room("r-1").unwrap().is_none());
    }

    #[test]
    fn test_time_slots_listed_by_start_time() {
        let (_temp, store) = open();
        slot(&store, "late", "13:00", "14:00");
        slot(&store, "early", "07:30", "09:00");

        let slots = store.list_time_slots(false).unwrap();
        let ids: Vec<&str> = slots.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(slots[0].label, "07:30 - 09:00");
    }

    #[test]
    fn test_second_approval_for_slot_is_slot_conflict() {
        let (_temp, store) = seeded();
        store
            .create_booking(&booking("b-1", "u-a", "r-1", "s-1", "2030-01-10"))
            .unwrap();
        store
            .create_booking(&booking("b-2", "u-b", "r-1", "s-1", "2030-01-10"))
            .unwrap();

        store.approve_booking("b-1", None, Utc::now()).unwrap();
        assert!(matches!(
            store.approve_booking("b-2", Some("late"), Utc::now()),
            Err(Error::SlotConflict)
        ));

        let b2 = store.get_booking("b-2").unwrap().unwrap();
        assert_eq!(b2.status, BookingStatus::Pending);
        assert!(
            store
                .approved_booking_exists("r-1", "s-1", date("2030-01-10"), None)
                .unwrap()
        );
        assert!(
            !store
                .approved_booking_exists("r-1", "s-1", date("2030-01-10"), Some("b-1"))
                .unwrap()
        );
    }

    #[test]
    fn test_approve_twice_is_invalid_state() {
        let (_temp, store) = seeded();
        store
            .create_booking(&booking("b-1", "u-a", "r-1", "s-1", "2030-01-10"))
            .unwrap();
        store.approve_booking("b-1", None, Utc::now()).unwrap();
        assert!(matches!(
            store.approve_booking("b-1", None, Utc::now()),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            store.reject_booking("b-1", "nope", Utc::now()),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_user_cannot_hold_two_live_bookings_for_same_slot() {
        let (_temp, store) = seeded();
        store
            .create_booking(&booking("b-1", "u-a", "r-1", "s-1", "2030-01-10"))
            .unwrap();

        let other_room = booking("b-2", "u-a", "r-2", "s-1", "2030-01-10");
        assert!(matches!(
            store.create_booking(&other_room),
            Err(Error::UserConflict)
        ));
        assert!(
            store
                .live_user_booking_exists("u-a", "s-1", date("2030-01-10"))
                .unwrap()
        );

        // A rejected booking frees the user's slot again.
        store.reject_booking("b-1", "Maintenance", Utc::now()).unwrap();
        store.create_booking(&other_room).unwrap();
    }

    #[test]
    fn test_booking_with_unknown_room_is_not_found() {
        let (_temp, store) = seeded();
        assert!(matches!(
            store.create_booking(&booking("b-1", "u-a", "missing", "s-1", "2030-01-10")),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_referenced_room_cannot_be_deleted() {
        let (_temp, store) = seeded();
        store
            .create_booking(&booking("b-1", "u-a", "r-1", "s-1", "2030-01-10"))
            .unwrap();

        assert_eq!(store.count_room_bookings("r-1").unwrap(), 1);
        assert_eq!(store.count_time_slot_bookings("s-1").unwrap(), 1);
        assert!(matches!(store.delete_room("r-1"), Err(Error::Conflict(_))));
        assert!(matches!(
            store.delete_time_slot("s-1"),
            Err(Error::Conflict(_))
        ));
        assert!(store.delete_room("r-2").unwrap());
    }

    #[test]
    fn test_reject_pending_bookings_skips_decided_rows() {
        let (_temp, store) = seeded();
        store
            .create_booking(&booking("b-1", "u-a", "r-1", "s-1", "2030-01-10"))
            .unwrap();
        store
            .create_booking(&booking("b-2", "u-b", "r-2", "s-1", "2030-01-10"))
            .unwrap();
        store
            .create_booking(&booking("b-3", "u-a", "r-1", "s-2", "2030-01-10"))
            .unwrap();
        store.approve_booking("b-3", None, Utc::now()).unwrap();

        let ids = vec![
            "b-1".to_string(),
            "b-2".to_string(),
            "b-3".to_string(),
            "missing".to_string(),
        ];
        let rejected = store
            .reject_pending_bookings(&ids, "Closed for exams", Utc::now())
            .unwrap();
        assert_eq!(rejected, 2);

        let b1 = store.get_booking("b-1").unwrap().unwrap();
        assert_eq!(b1.status, BookingStatus::Rejected);
        assert_eq!(b1.admin_notes.as_deref(), Some("Closed for exams"));
        let b3 = store.get_booking("b-3").unwrap().unwrap();
        assert_eq!(b3.status, BookingStatus::Approved);

        assert_eq!(
            store.reject_pending_bookings(&[], "x", Utc::now()).unwrap(),
            0
        );
    }

    #[test]
    fn test_list_booking_details_filters_and_orders() {
        let (_temp, store) = seeded();
        store
            .create_booking(&booking("b-1", "u-a", "r-1", "s-1", "2030-01-10"))
            .unwrap();
        let mut meeting = booking("b-2", "u-b", "r-2", "s-1", "2030-01-11");
        meeting.keperluan = Keperluan::Meeting;
        meeting.subject = None;
        meeting.instructor = None;
        store.create_booking(&meeting).unwrap();
        store.approve_booking("b-2", None, Utc::now()).unwrap();

        let all = store
            .list_booking_details(&BookingFilter::default(), BookingOrder::Newest, 0, None)
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|d| d.booking.id.as_str()).collect();
        assert_eq!(ids, vec!["b-2", "b-1"]);
        assert_eq!(all[0].user_name, "Budi");
        assert_eq!(all[0].room.name, "R2");
        assert_eq!(all[0].time_slot.label, "09:00 - 10:00");

        let chronological = store
            .list_booking_details(&BookingFilter::default(), BookingOrder::Chronological, 0, Some(1))
            .unwrap();
        assert_eq!(chronological.len(), 1);
        assert_eq!(chronological[0].booking.id, "b-1");

        let approved = BookingFilter {
            status: Some(BookingStatus::Approved),
            date: Some(date("2030-01-11")),
            ..Default::default()
        };
        let found = store
            .list_booking_details(&approved, BookingOrder::Newest, 0, None)
            .unwrap();
        assert_eq!(found.len(), 1);

        let search = BookingFilter {
            search: Some("rahman".to_string()),
            ..Default::default()
        };
        let found = store
            .list_booking_details(&search, BookingOrder::Newest, 0, None)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].booking.id, "b-1");

        let ranged = BookingFilter {
            date_from: Some(date("2030-01-11")),
            date_to: Some(date("2030-01-31")),
            room_id: Some("r-2".to_string()),
            ..Default::default()
        };
        assert_eq!(
            store
                .list_booking_details(&ranged, BookingOrder::Newest, 0, None)
                .unwrap()
                .len(),
            1
        );

        let skipped = store
            .list_booking_details(&BookingFilter::default(), BookingOrder::Newest, 1, Some(10))
            .unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].booking.id, "b-1");
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let (_temp, store) = seeded();
        let mut exam = booking("b-1", "u-a", "r-1", "s-1", "2030-01-10");
        exam.subject = Some("Score 100% review".to_string());
        store.create_booking(&exam).unwrap();
        let mut lecture = booking("b-2", "u-b", "r-2", "s-1", "2030-01-10");
        lecture.subject = Some("Room 1000 lecture".to_string());
        store.create_booking(&lecture).unwrap();

        let search = |term: &str| {
            let filter = BookingFilter {
                search: Some(term.to_string()),
                ..Default::default()
            };
            store
                .list_booking_details(&filter, BookingOrder::Newest, 0, None)
                .unwrap()
                .into_iter()
                .map(|d| d.booking.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(search("100%"), vec!["b-1"]);
        assert!(search("_").is_empty());
        assert!(search("\\").is_empty());
        assert_eq!(search("1000").len(), 1);
    }

    #[test]
    fn test_booking_stats() {
        let (_temp, store) = seeded();
        assert_eq!(store.booking_stats().unwrap(), BookingStats::default());

        store
            .create_booking(&booking("b-1", "u-a", "r-1", "s-1", "2030-01-10"))
            .unwrap();
        store
            .create_booking(&booking("b-2", "u-b", "r-2", "s-1", "2030-01-10"))
            .unwrap();
        store.approve_booking("b-1", None, Utc::now()).unwrap();

        let stats = store.booking_stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.rejected, 0);
    }

    #[test]
    fn test_update_content_requires_pending() {
        let (_temp, store) = seeded();
        let mut b = booking("b-1", "u-a", "r-1", "s-1", "2030-01-10");
        store.create_booking(&b).unwrap();

        b.keperluan = Keperluan::Other;
        b.subject = None;
        b.notes = Some("Student council".to_string());
        store.update_booking_content(&b).unwrap();
        let stored = store.get_booking("b-1").unwrap().unwrap();
        assert_eq!(stored.keperluan, Keperluan::Other);
        assert_eq!(stored.notes.as_deref(), Some("Student council"));

        store.approve_booking("b-1", None, Utc::now()).unwrap();
        assert!(matches!(
            store.update_booking_content(&b),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = seeded();

        let token1 = Token {
            id: "token-1".to_string(),
            token_hash: "hash1".to_string(),
            token_lookup: "lookup12".to_string(),
            user_id: "u-a".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token1).unwrap();

        let token2 = Token {
            id: "token-2".to_string(),
            token_hash: "hash2".to_string(),
            token_lookup: "lookup12".to_string(), // Same lookup
            user_id: "u-b".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        let result = store.create_token(&token2);
        assert!(matches!(result, Err(Error::TokenLookupCollision)));

        let fetched = store.get_token_by_lookup("lookup12").unwrap().unwrap();
        assert_eq!(fetched.user_id, "u-a");
        store.update_token_last_used("token-1").unwrap();
        assert!(
            store
                .get_token_by_lookup("lookup12")
                .unwrap()
                .unwrap()
                .last_used_at
                .is_some()
        );
    }

    #[test]
    fn test_duplicate_email_and_admin_detection() {
        let (_temp, store) = seeded();
        assert!(!store.has_admin_user().unwrap());

        let now = Utc::now();
        let admin = User {
            id: "admin".to_string(),
            name: "Admin".to_string(),
            email: "u-a@campus.test".to_string(),
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(store.create_user(&admin), Err(Error::AlreadyExists)));

        let admin = User {
            email: "admin@campus.test".to_string(),
            ..admin
        };
        store.create_user(&admin).unwrap();
        assert!(store.has_admin_user().unwrap());
        assert_eq!(
            store
                .get_user_by_email("admin@campus.test")
                .unwrap()
                .unwrap()
                .role,
            Role::Admin
        );
        assert_eq!(store.list_users("", 10).unwrap().len(), 3);
    }
}
