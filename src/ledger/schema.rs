//! SQLite schema and seed data.

use crate::course::DEFAULT_COURSES;
use crate::error::Result;
use rusqlite::{params, Connection};

// Amounts are TEXT (exact decimals); instants are INTEGER milliseconds since
// the Unix epoch; calendar dates are TEXT `YYYY-MM-DD`.
const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS drivers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'inactive',
    points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
    contact TEXT
);

CREATE TABLE IF NOT EXISTS licenses (
    registration_number TEXT PRIMARY KEY,
    driver_id TEXT NOT NULL REFERENCES drivers(id),
    category TEXT NOT NULL,
    issued_on TEXT NOT NULL,
    expires_on TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vehicles (
    plate TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES drivers(id),
    model TEXT,
    color TEXT,
    year INTEGER,
    chassis TEXT UNIQUE,
    status TEXT NOT NULL DEFAULT 'active'
);

CREATE TABLE IF NOT EXISTS citations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    driver_id TEXT NOT NULL REFERENCES drivers(id),
    vehicle_plate TEXT REFERENCES vehicles(plate),
    agent_id TEXT NOT NULL,
    infraction_code TEXT NOT NULL,
    amount TEXT NOT NULL,
    base_amount TEXT NOT NULL,
    repeat_offense INTEGER NOT NULL,
    points INTEGER NOT NULL CHECK (points >= 0),
    occurred_at INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
);

CREATE INDEX IF NOT EXISTS idx_citations_recidivism
    ON citations(driver_id, infraction_code, occurred_at);

CREATE INDEX IF NOT EXISTS idx_citations_agent
    ON citations(agent_id);

CREATE TABLE IF NOT EXISTS payments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    driver_id TEXT NOT NULL REFERENCES drivers(id),
    citation_id INTEGER UNIQUE REFERENCES citations(id),
    service_code TEXT,
    amount TEXT NOT NULL,
    paid_at INTEGER NOT NULL,
    CHECK ((citation_id IS NULL) <> (service_code IS NULL))
);

CREATE TABLE IF NOT EXISTS staff_members (
    member_id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    role TEXT NOT NULL,
    driver_id TEXT REFERENCES drivers(id)
);

CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    theory_hours INTEGER NOT NULL,
    practice_hours INTEGER NOT NULL,
    requirements TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS enrollments (
    driver_id TEXT NOT NULL REFERENCES drivers(id),
    course_id INTEGER NOT NULL REFERENCES courses(id),
    enrolled_on TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'in_progress',
    PRIMARY KEY (driver_id, course_id)
);
";

/// Creates missing tables and seeds the default courses. Safe to run on an
/// existing database.
pub(super) fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let mut seed = conn.prepare(
        "INSERT OR IGNORE INTO courses (name, theory_hours, practice_hours, requirements)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (name, theory, practice, requirements) in DEFAULT_COURSES {
        seed.execute(params![name, theory, practice, requirements])?;
    }

    Ok(())
}
