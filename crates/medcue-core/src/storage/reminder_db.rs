//! SQLite-backed reminder store.
//!
//! The persistence contract the pipeline needs is small: list on load,
//! create returning a generated id, delete by id. Datetimes are stored as
//! RFC 3339 text, window dates as ISO dates.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::data_dir;
use crate::error::{CoreError, StorageError};
use crate::reminder::{NewReminder, Reminder};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct ReminderDb {
    conn: Connection,
}

impl ReminderDb {
    /// Open (or create) the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open the store at its default location in the data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = data_dir()?;
        Self::open(dir.join("reminders.db"))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reminders (
                id             TEXT PRIMARY KEY,
                medicine_name  TEXT NOT NULL,
                dosage         TEXT NOT NULL,
                scheduled_time TEXT NOT NULL,
                start_date     TEXT,
                end_date       TEXT,
                enabled        INTEGER NOT NULL DEFAULT 1,
                created_at     TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Create a reminder, assigning it a fresh id.
    pub fn create(&self, new: NewReminder) -> Result<Reminder, CoreError> {
        new.validate()?;

        let reminder = Reminder {
            id: Uuid::new_v4().to_string(),
            medicine_name: new.medicine_name,
            dosage: new.dosage,
            scheduled_time: new.scheduled_time,
            start_date: new.start_date,
            end_date: new.end_date,
            enabled: true,
            created_at: Utc::now(),
        };

        self.conn
            .execute(
                "INSERT INTO reminders
                 (id, medicine_name, dosage, scheduled_time, start_date, end_date, enabled, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    reminder.id,
                    reminder.medicine_name,
                    reminder.dosage,
                    reminder.scheduled_time.to_rfc3339(),
                    reminder.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    reminder.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    reminder.enabled as i64,
                    reminder.created_at.to_rfc3339(),
                ],
            )
            .map_err(StorageError::from)?;

        debug!(id = %reminder.id, medicine = %reminder.medicine_name, "reminder created");
        Ok(reminder)
    }

    /// List all reminders, oldest first.
    pub fn list(&self) -> Result<Vec<Reminder>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, medicine_name, dosage, scheduled_time, start_date, end_date, enabled, created_at
             FROM reminders ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], row_to_reminder)?;
        let mut reminders = Vec::new();
        for row in rows {
            reminders.push(row?);
        }
        Ok(reminders)
    }

    /// Fetch one reminder by id.
    pub fn get(&self, id: &str) -> Result<Option<Reminder>, StorageError> {
        let reminder = self
            .conn
            .query_row(
                "SELECT id, medicine_name, dosage, scheduled_time, start_date, end_date, enabled, created_at
                 FROM reminders WHERE id = ?1",
                params![id],
                row_to_reminder,
            )
            .optional()?;
        Ok(reminder)
    }

    /// Delete by id. Returns whether a row existed.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let affected = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
        if affected > 0 {
            debug!(id = %id, "reminder deleted");
        }
        Ok(affected > 0)
    }
}

/// Parse an RFC 3339 datetime. A malformed stored value is a corrupted row
/// and surfaces as a query error; substituting a default here would make the
/// reminder fire at the wrong instant.
fn parse_datetime(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn row_to_reminder(row: &rusqlite::Row) -> Result<Reminder, rusqlite::Error> {
    let scheduled_time: String = row.get(3)?;
    let start_date: Option<String> = row.get(4)?;
    let end_date: Option<String> = row.get(5)?;
    let enabled: i64 = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok(Reminder {
        id: row.get(0)?,
        medicine_name: row.get(1)?,
        dosage: row.get(2)?,
        scheduled_time: parse_datetime(3, &scheduled_time)?,
        start_date: parse_date(start_date),
        end_date: parse_date(end_date),
        enabled: enabled != 0,
        created_at: parse_datetime(7, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn new_reminder(name: &str) -> NewReminder {
        NewReminder {
            medicine_name: name.to_string(),
            dosage: "1 tablet".to_string(),
            scheduled_time: Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 20),
        }
    }

    #[test]
    fn create_assigns_an_id_and_round_trips() {
        let db = ReminderDb::open_in_memory().unwrap();
        let created = db.create(new_reminder("Aspirin")).unwrap();
        assert!(!created.id.is_empty());
        assert!(created.enabled);

        let listed = db.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].medicine_name, "Aspirin");
        assert_eq!(listed[0].scheduled_time, created.scheduled_time);
        assert_eq!(listed[0].start_date, created.start_date);
        assert_eq!(listed[0].end_date, created.end_date);
    }

    #[test]
    fn create_rejects_an_inverted_window() {
        let db = ReminderDb::open_in_memory().unwrap();
        let mut new = new_reminder("Aspirin");
        new.end_date = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert!(matches!(db.create(new), Err(CoreError::Validation(_))));
        assert!(db.list().unwrap().is_empty());
    }

    #[test]
    fn open_ended_window_round_trips_as_none() {
        let db = ReminderDb::open_in_memory().unwrap();
        let mut new = new_reminder("Aspirin");
        new.start_date = None;
        new.end_date = None;
        let created = db.create(new).unwrap();

        let fetched = db.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.start_date, None);
        assert_eq!(fetched.end_date, None);
    }

    #[test]
    fn get_unknown_id_is_none() {
        let db = ReminderDb::open_in_memory().unwrap();
        assert!(db.get("missing").unwrap().is_none());
    }

    #[test]
    fn delete_reports_whether_a_row_existed() {
        let db = ReminderDb::open_in_memory().unwrap();
        let created = db.create(new_reminder("Aspirin")).unwrap();
        assert!(db.delete(&created.id).unwrap());
        assert!(!db.delete(&created.id).unwrap());
        assert!(db.list().unwrap().is_empty());
    }

    #[test]
    fn malformed_stored_datetime_is_a_query_error() {
        let db = ReminderDb::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO reminders
                 (id, medicine_name, dosage, scheduled_time, enabled, created_at)
                 VALUES ('bad', 'Aspirin', '100mg', 'not-a-datetime', 1, ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .unwrap();

        assert!(matches!(db.list(), Err(StorageError::QueryFailed(_))));
        assert!(matches!(db.get("bad"), Err(StorageError::QueryFailed(_))));
    }

    #[test]
    fn store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.db");
        let id = {
            let db = ReminderDb::open(&path).unwrap();
            db.create(new_reminder("Metformin")).unwrap().id
        };
        let db = ReminderDb::open(&path).unwrap();
        assert_eq!(db.get(&id).unwrap().unwrap().medicine_name, "Metformin");
    }
}
