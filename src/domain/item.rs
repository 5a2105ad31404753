use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

/// Handle to an item owned by the record store.
///
/// Wraps the row id assigned by the backend on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemRef(pub i64);

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: ItemRef,
    timestamp: DateTime<Utc>,
    pub is_favorite: bool,
}

impl Item {
    pub fn new(id: ItemRef, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            timestamp,
            is_favorite: false,
        }
    }

    /// Rebuild an item from persisted fields.
    pub fn restore(id: ItemRef, timestamp: DateTime<Utc>, is_favorite: bool) -> Self {
        Self {
            id,
            timestamp,
            is_favorite,
        }
    }

    /// Creation instant. There is no setter; the timestamp is fixed once built.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Numeric date plus standard time in the local zone, e.g. `6/5/2024, 14:03:07`.
    pub fn display_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%-m/%-d/%Y, %H:%M:%S")
            .to_string()
    }

    /// Filled heart for favorites, hollow star otherwise.
    pub fn favorite_marker(&self) -> &'static str {
        if self.is_favorite {
            "♥"
        } else {
            "☆"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_item_is_not_favorite() {
        let item = Item::new(ItemRef(1), Utc::now());
        assert!(!item.is_favorite);
        assert_eq!(item.favorite_marker(), "☆");
    }

    #[test]
    fn test_favorite_marker() {
        let mut item = Item::new(ItemRef(1), Utc::now());
        item.is_favorite = true;
        assert_eq!(item.favorite_marker(), "♥");
    }

    #[test]
    fn test_restore_keeps_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();
        let item = Item::restore(ItemRef(7), ts, true);
        assert_eq!(item.id, ItemRef(7));
        assert_eq!(item.timestamp(), ts);
        assert!(item.is_favorite);
    }

    #[test]
    fn test_item_ref_display() {
        assert_eq!(ItemRef(42).to_string(), "#42");
    }
}
