use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{FeedTipsError, Result};
use crate::domain::{Item, ItemRef};
use crate::store::{EventLog, RecordBackend};
use crate::tips::{InvalidationReason, TipStatus};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock();
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FeedTipsError::Migration(e.to_string()))?;

        Ok(())
    }

    // Each statement is atomic, so a poisoned connection is still consistent
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fixed-width UTC form so stored timestamps compare correctly as text.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| s.parse::<DateTime<Utc>>())
    }

    fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
    }

    fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        Self::parse_datetime(&raw).map_err(|e| Self::conversion_error(idx, e))
    }

    fn optional_datetime_column(
        row: &Row<'_>,
        idx: usize,
    ) -> rusqlite::Result<Option<DateTime<Utc>>> {
        match row.get::<_, Option<String>>(idx)? {
            Some(raw) => Self::parse_datetime(&raw)
                .map(Some)
                .map_err(|e| Self::conversion_error(idx, e)),
            None => Ok(None),
        }
    }

    fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
        Ok(Item::restore(
            ItemRef(row.get(0)?),
            Self::datetime_column(row, 1)?,
            row.get::<_, i32>(2)? != 0,
        ))
    }

    /// Expects `invalidation, last_displayed_at` in columns 0 and 1.
    fn status_from_row(row: &Row<'_>) -> rusqlite::Result<TipStatus> {
        let invalidation = match row.get::<_, Option<String>>(0)? {
            Some(raw) => Some(raw.parse::<InvalidationReason>().map_err(|e| {
                Self::conversion_error(0, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?),
            None => None,
        };

        Ok(TipStatus {
            invalidation,
            last_displayed: Self::optional_datetime_column(row, 1)?,
        })
    }
}

impl RecordBackend for SqliteStore {
    fn insert_item(&self, timestamp: DateTime<Utc>) -> Result<Item> {
        // Stored with microsecond precision; hand back what a reload would see
        let timestamp = timestamp.trunc_subsecs(6);
        let conn = self.lock();

        conn.execute(
            "INSERT INTO items (timestamp, is_favorite) VALUES (?1, 0)",
            params![Self::format_datetime(&timestamp)],
        )?;

        Ok(Item::new(ItemRef(conn.last_insert_rowid()), timestamp))
    }

    fn get_all_items(&self) -> Result<Vec<Item>> {
        let conn = self.lock();

        let mut stmt = conn.prepare("SELECT id, timestamp, is_favorite FROM items ORDER BY id")?;
        let items = stmt
            .query_map([], Self::item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn delete_item(&self, id: ItemRef) -> Result<bool> {
        let conn = self.lock();
        let deleted = conn.execute("DELETE FROM items WHERE id = ?1", params![id.0])?;
        Ok(deleted > 0)
    }

    fn set_favorite(&self, id: ItemRef, is_favorite: bool) -> Result<bool> {
        let conn = self.lock();
        let updated = conn.execute(
            "UPDATE items SET is_favorite = ?1 WHERE id = ?2",
            params![is_favorite as i32, id.0],
        )?;
        Ok(updated > 0)
    }
}

impl EventLog for SqliteStore {
    fn append_donation(&self, event_id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO event_donations (event_id, donated_at) VALUES (?1, ?2)",
            params![event_id, Self::format_datetime(&at)],
        )?;
        Ok(())
    }

    fn donations(
        &self,
        event_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.lock();

        let mut stmt = conn.prepare(
            "SELECT donated_at FROM event_donations
             WHERE event_id = ?1 AND (?2 IS NULL OR donated_at > ?2)
             ORDER BY donated_at, id",
        )?;
        let since = since.map(|dt| Self::format_datetime(&dt));
        let donations = stmt
            .query_map(params![event_id, since], |row| Self::datetime_column(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(donations)
    }

    fn all_donations(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        let conn = self.lock();

        let mut stmt =
            conn.prepare("SELECT event_id, donated_at FROM event_donations ORDER BY id")?;
        let donations = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, Self::datetime_column(row, 1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(donations)
    }

    fn clear_donations(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM event_donations", [])?;
        Ok(())
    }

    fn all_tip_statuses(&self) -> Result<Vec<(String, TipStatus)>> {
        let conn = self.lock();

        let mut stmt = conn.prepare(
            "SELECT invalidation, last_displayed_at, tip_id FROM tip_status ORDER BY tip_id",
        )?;
        let statuses = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(2)?, Self::status_from_row(row)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(statuses)
    }

    fn put_tip_status(&self, tip_id: &str, status: &TipStatus) -> Result<()> {
        let conn = self.lock();

        conn.execute(
            "INSERT INTO tip_status (tip_id, invalidation, last_displayed_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(tip_id) DO UPDATE SET invalidation = ?2, last_displayed_at = ?3",
            params![
                tip_id,
                status.invalidation.map(|r| r.as_str()),
                status.last_displayed.map(|dt| Self::format_datetime(&dt))
            ],
        )?;

        Ok(())
    }

    fn clear_tip_status(&self, tip_id: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM tip_status WHERE tip_id = ?1", params![tip_id])?;
        Ok(())
    }

    fn clear_all_tip_statuses(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM tip_status", [])?;
        Ok(())
    }
}
