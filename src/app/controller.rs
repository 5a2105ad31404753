//! User actions of the feed: each one mutates the record store and donates
//! the matching tip event. The donation never affects the mutation result.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::app::Result;
use crate::domain::ItemRef;
use crate::records::RecordStore;
use crate::tips::{catalog, InvalidationReason, TipDefinition, TipEngine, TipError};

#[derive(Clone)]
pub struct FeedController {
    records: Arc<RecordStore>,
    tips: Arc<TipEngine>,
}

impl FeedController {
    pub fn new(records: Arc<RecordStore>, tips: Arc<TipEngine>) -> Self {
        Self { records, tips }
    }

    pub fn add_item(&self) -> Result<ItemRef> {
        self.tips.donate(catalog::ITEM_ADDED);
        self.records.add_item()
    }

    pub fn delete_items(&self, positions: &BTreeSet<usize>) -> Result<usize> {
        self.tips.donate(catalog::ITEM_DELETED);
        self.records.delete_items(positions)
    }

    pub fn delete_all(&self) -> Result<usize> {
        self.tips.donate(catalog::ITEM_DELETED);
        self.records.delete_all()
    }

    pub fn toggle_favorite(&self, item: ItemRef) -> Result<Option<bool>> {
        self.tips.donate(catalog::ITEM_FAVORITED);
        self.records.toggle_favorite(item)
    }

    /// Tips that should be on screen right now, in catalog order.
    pub fn visible_tips(&self) -> Vec<&TipDefinition> {
        self.tips
            .catalog()
            .iter()
            .filter(|tip| self.tips.should_display(&tip.id))
            .collect()
    }

    /// Run the action behind a tip button, then retire the tip.
    ///
    /// `add` appends an item, `remove` deletes every item and `favorite`
    /// toggles the most recently added item.
    pub fn handle_tip_action(&self, tip_id: &str, action_id: &str) -> Result<()> {
        let tip = self
            .tips
            .catalog()
            .get(tip_id)
            .ok_or_else(|| TipError::UnknownTip(tip_id.to_string()))?;
        if !tip.has_action(action_id) {
            return Err(TipError::UnknownAction {
                tip: tip_id.to_string(),
                action: action_id.to_string(),
            }
            .into());
        }

        match action_id {
            "add" => {
                self.add_item()?;
            }
            "remove" => {
                self.delete_all()?;
            }
            "favorite" => {
                let last = self.records.all_items().last().map(|i| i.id);
                if let Some(item) = last {
                    self.toggle_favorite(item)?;
                }
            }
            _ => {}
        }

        self.tips
            .invalidate(tip_id, InvalidationReason::ActionPerformed)?;
        Ok(())
    }
}
