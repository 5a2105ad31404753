pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Item, ItemRef};
use crate::tips::TipStatus;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Persistent record collaborator behind the record store.
///
/// Items come back from [`get_all_items`](RecordBackend::get_all_items) in
/// insertion order.
pub trait RecordBackend: Send + Sync {
    fn insert_item(&self, timestamp: DateTime<Utc>) -> Result<Item>;
    fn get_all_items(&self) -> Result<Vec<Item>>;
    /// Returns `false` when no such item exists.
    fn delete_item(&self, id: ItemRef) -> Result<bool>;
    /// Returns `false` when no such item exists.
    fn set_favorite(&self, id: ItemRef, is_favorite: bool) -> Result<bool>;
}

/// Durable event log and tip status collaborator behind the tip engine.
pub trait EventLog: Send + Sync {
    // Donations
    fn append_donation(&self, event_id: &str, at: DateTime<Utc>) -> Result<()>;
    /// Donations of one event, oldest first, optionally only those after `since`.
    fn donations(&self, event_id: &str, since: Option<DateTime<Utc>>)
        -> Result<Vec<DateTime<Utc>>>;
    fn all_donations(&self) -> Result<Vec<(String, DateTime<Utc>)>>;
    fn clear_donations(&self) -> Result<()>;

    // Tip status
    fn all_tip_statuses(&self) -> Result<Vec<(String, TipStatus)>>;
    fn put_tip_status(&self, tip_id: &str, status: &TipStatus) -> Result<()>;
    fn clear_tip_status(&self, tip_id: &str) -> Result<()>;
    fn clear_all_tip_statuses(&self) -> Result<()>;
}
