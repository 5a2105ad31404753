//! Record store: the ordered, observable collection of feed items.
//!
//! All mutations go through one lock, so a structural change and the
//! backend write it implies are never interleaved with another mutation.
//! Mutations aimed at items that are already gone are no-ops.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::app::Result;
use crate::domain::{Item, ItemRef};
use crate::store::RecordBackend;

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Added(ItemRef),
    Deleted(Vec<ItemRef>),
    FavoriteToggled { item: ItemRef, is_favorite: bool },
}

pub struct RecordStore {
    backend: Arc<dyn RecordBackend>,
    items: Mutex<Vec<Item>>,
    changes: broadcast::Sender<StoreChange>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Result<Self> {
        let items = backend.get_all_items()?;
        debug!(count = items.len(), "Record store loaded");

        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            backend,
            items: Mutex::new(items),
            changes,
        })
    }

    // The snapshot only changes after its backend write succeeded
    fn lock(&self) -> MutexGuard<'_, Vec<Item>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: StoreChange) {
        let _ = self.changes.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Append a new item stamped with the current time.
    pub fn add_item(&self) -> Result<ItemRef> {
        let mut items = self.lock();
        let item = self.backend.insert_item(Utc::now())?;
        let id = item.id;
        items.push(item);
        drop(items);

        debug!(item = %id, "Item added");
        self.notify(StoreChange::Added(id));
        Ok(id)
    }

    /// Delete the items at `positions` of the collection as it is right now.
    ///
    /// Positions past the end are skipped. Returns how many items were removed.
    pub fn delete_items(&self, positions: &BTreeSet<usize>) -> Result<usize> {
        self.delete_selected(|items| {
            positions
                .iter()
                .filter_map(|&pos| items.get(pos).map(|item| item.id))
                .collect()
        })
    }

    /// Delete every item currently present.
    pub fn delete_all(&self) -> Result<usize> {
        self.delete_selected(|items| items.iter().map(|item| item.id).collect())
    }

    fn delete_selected<F>(&self, select: F) -> Result<usize>
    where
        F: FnOnce(&[Item]) -> Vec<ItemRef>,
    {
        let mut items = self.lock();
        let targets = select(&items);

        let mut removed = Vec::with_capacity(targets.len());
        let mut failure = None;
        for id in targets {
            match self.backend.delete_item(id) {
                Ok(_) => removed.push(id),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // Keep the snapshot in step with whatever reached the backend
        items.retain(|item| !removed.contains(&item.id));
        drop(items);

        if !removed.is_empty() {
            debug!(count = removed.len(), "Items deleted");
            self.notify(StoreChange::Deleted(removed.clone()));
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(removed.len()),
        }
    }

    /// Flip the favorite flag of `item` and return the new value.
    ///
    /// Returns `Ok(None)` when the item no longer exists.
    pub fn toggle_favorite(&self, item: ItemRef) -> Result<Option<bool>> {
        let mut items = self.lock();
        let Some(entry) = items.iter_mut().find(|i| i.id == item) else {
            debug!(item = %item, "Favorite toggle on missing item ignored");
            return Ok(None);
        };

        let is_favorite = !entry.is_favorite;
        if !self.backend.set_favorite(item, is_favorite)? {
            debug!(item = %item, "Item vanished from backend, dropping it");
            items.retain(|i| i.id != item);
            return Ok(None);
        }
        entry.is_favorite = is_favorite;
        drop(items);

        self.notify(StoreChange::FavoriteToggled { item, is_favorite });
        Ok(Some(is_favorite))
    }

    /// Snapshot of all items in insertion order.
    pub fn all_items(&self) -> Vec<Item> {
        self.lock().clone()
    }

    pub fn get(&self, item: ItemRef) -> Option<Item> {
        self.lock().iter().find(|i| i.id == item).cloned()
    }

    /// Handle of the item at `position`, if any.
    pub fn item_at(&self, position: usize) -> Option<ItemRef> {
        self.lock().get(position).map(|i| i.id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
