//! Tips and events of the item feed.

use crate::tips::definition::{TipCatalog, TipDefinition};
use crate::tips::rule::Rule;
use crate::tips::TipError;

pub const ADD: &str = "add";
pub const FAVORITE: &str = "favorite";
pub const REMOVE: &str = "remove";
pub const COPY: &str = "copy";

pub const IS_PRO: &str = "isPro";

pub const ITEM_ADDED: &str = "itemAdded";
pub const ITEM_DELETED: &str = "itemDeleted";
pub const ITEM_FAVORITED: &str = "itemFavorited";

/// Feed tips. Each one is gated on the transient `isPro` parameter.
pub fn feed_tips() -> Result<TipCatalog, TipError> {
    TipCatalog::new(vec![
        pro_tip(ADD, "Add more items.")
            .message("You can add more items to the feed here.")
            .image("plus")
            .action("add", "Add"),
        pro_tip(FAVORITE, "Favorite the items")
            .message("You can favorite your items here.")
            .image("star")
            .action("favorite", "Favorite"),
        pro_tip(REMOVE, "Delete items")
            .message("You can delete items from the feed here.")
            .image("minus.circle")
            .action("remove", "Delete"),
        pro_tip(COPY, ""),
    ])
}

fn pro_tip(id: &str, title: &str) -> TipDefinition {
    TipDefinition::new(id, title)
        .parameter(IS_PRO, false)
        .rule(Rule::parameter(IS_PRO, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tips::rule::ParamValue;

    #[test]
    fn test_feed_tips_ids() {
        let catalog = feed_tips().unwrap();
        let ids: Vec<&str> = catalog.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![ADD, FAVORITE, REMOVE, COPY]);
    }

    #[test]
    fn test_every_tip_defaults_is_pro_false() {
        let catalog = feed_tips().unwrap();
        for tip in catalog.iter() {
            let decl = tip.parameter_decl(IS_PRO).unwrap();
            assert_eq!(decl.default, ParamValue::Bool(false));
            assert_eq!(tip.rules, vec![Rule::parameter(IS_PRO, true)]);
        }
    }

    #[test]
    fn test_copy_tip_has_no_content() {
        let catalog = feed_tips().unwrap();
        let copy = catalog.get(COPY).unwrap();
        assert!(copy.title.is_empty());
        assert!(copy.message.is_none());
        assert!(copy.image.is_none());
        assert!(copy.actions.is_empty());
    }
}
