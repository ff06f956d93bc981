pub const SCHEMA: &str = r#"
-- People who can sign in; role decides what they may do
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials; every token belongs to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Bookable rooms
CREATE TABLE IF NOT EXISTS rooms (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    capacity INTEGER NOT NULL CHECK (capacity BETWEEN 1 AND 1000),
    facilities TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Daily time slots, "HH:MM" times of day. Writes check overlap inside an IMMEDIATE transaction
CREATE TABLE IF NOT EXISTS time_slots (
    id TEXT PRIMARY KEY,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    label TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    CHECK (end_time > start_time)
);

-- Booking requests for one (room, time slot, date)
CREATE TABLE IF NOT EXISTS bookings (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE RESTRICT,
    time_slot_id TEXT NOT NULL REFERENCES time_slots(id) ON DELETE RESTRICT,
    booking_date TEXT NOT NULL,        -- YYYY-MM-DD

    keperluan TEXT NOT NULL CHECK (keperluan IN ('class', 'meeting', 'other')),
    subject TEXT,                      -- required when keperluan = class
    instructor TEXT,
    notes TEXT,                        -- required when keperluan = other

    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
    admin_notes TEXT,
    display_color TEXT NOT NULL,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_bookings_date_status ON bookings(booking_date, status);
CREATE INDEX IF NOT EXISTS idx_bookings_slot ON bookings(room_id, time_slot_id, booking_date);
CREATE INDEX IF NOT EXISTS idx_bookings_user ON bookings(user_id);

-- At most one approved booking per (room, time slot, date)
CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_approved_slot
    ON bookings(room_id, time_slot_id, booking_date) WHERE status = 'approved';

-- At most one live booking per user per (time slot, date), whatever the room
CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_user_slot
    ON bookings(user_id, time_slot_id, booking_date) WHERE status IN ('pending', 'approved');
"#;
