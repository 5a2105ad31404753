//! In-process backend used by `--in-memory` runs and tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Item, ItemRef};
use crate::store::{EventLog, RecordBackend};
use crate::tips::TipStatus;

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    items: Vec<Item>,
    donations: Vec<(String, DateTime<Utc>)>,
    statuses: BTreeMap<String, TipStatus>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordBackend for MemoryStore {
    fn insert_item(&self, timestamp: DateTime<Utc>) -> Result<Item> {
        let mut state = self.lock();
        state.next_id += 1;
        let item = Item::new(ItemRef(state.next_id), timestamp);
        state.items.push(item.clone());
        Ok(item)
    }

    fn get_all_items(&self) -> Result<Vec<Item>> {
        Ok(self.lock().items.clone())
    }

    fn delete_item(&self, id: ItemRef) -> Result<bool> {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        Ok(state.items.len() < before)
    }

    fn set_favorite(&self, id: ItemRef, is_favorite: bool) -> Result<bool> {
        let mut state = self.lock();
        match state.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.is_favorite = is_favorite;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl EventLog for MemoryStore {
    fn append_donation(&self, event_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.lock().donations.push((event_id.to_string(), at));
        Ok(())
    }

    fn donations(
        &self,
        event_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let state = self.lock();
        let mut donations: Vec<DateTime<Utc>> = state
            .donations
            .iter()
            .filter(|(event, at)| event == event_id && since.map_or(true, |s| *at > s))
            .map(|(_, at)| *at)
            .collect();
        donations.sort();
        Ok(donations)
    }

    fn all_donations(&self) -> Result<Vec<(String, DateTime<Utc>)>> {
        Ok(self.lock().donations.clone())
    }

    fn clear_donations(&self) -> Result<()> {
        self.lock().donations.clear();
        Ok(())
    }

    fn all_tip_statuses(&self) -> Result<Vec<(String, TipStatus)>> {
        Ok(self
            .lock()
            .statuses
            .iter()
            .map(|(id, status)| (id.clone(), status.clone()))
            .collect())
    }

    fn put_tip_status(&self, tip_id: &str, status: &TipStatus) -> Result<()> {
        self.lock()
            .statuses
            .insert(tip_id.to_string(), status.clone());
        Ok(())
    }

    fn clear_tip_status(&self, tip_id: &str) -> Result<()> {
        self.lock().statuses.remove(tip_id);
        Ok(())
    }

    fn clear_all_tip_statuses(&self) -> Result<()> {
        self.lock().statuses.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_ids_keep_increasing_after_delete() {
        let store = MemoryStore::new();
        let a = store.insert_item(Utc::now()).unwrap();
        store.delete_item(a.id).unwrap();
        let b = store.insert_item(Utc::now()).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_set_favorite_missing_item() {
        let store = MemoryStore::new();
        assert!(!store.set_favorite(ItemRef(1), true).unwrap());
    }

    #[test]
    fn test_donations_since_is_exclusive() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let cutoff = now - Duration::days(7);

        store.append_donation("itemAdded", cutoff).unwrap();
        store.append_donation("itemAdded", now).unwrap();

        assert_eq!(store.donations("itemAdded", Some(cutoff)).unwrap(), vec![now]);
        assert_eq!(store.donations("itemAdded", None).unwrap().len(), 2);
    }
}
