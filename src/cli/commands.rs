use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;

use crate::app::{AppContext, FeedTipsError, Result};
use crate::tips::{catalog, InvalidationReason, TipDefinition, Window};

pub fn add_item(ctx: &AppContext) -> Result<()> {
    let id = ctx.controller().add_item()?;
    let item = ctx
        .records
        .get(id)
        .ok_or_else(|| FeedTipsError::ItemNotFound(id.to_string()))?;
    println!("Added item at {}", item.display_timestamp());
    Ok(())
}

pub fn delete_items(ctx: &AppContext, positions: &[usize]) -> Result<()> {
    let positions: BTreeSet<usize> = positions.iter().copied().collect();
    let removed = ctx.controller().delete_items(&positions)?;
    println!("Deleted {} items", removed);
    Ok(())
}

pub fn clear_items(ctx: &AppContext) -> Result<()> {
    let removed = ctx.controller().delete_all()?;
    println!("Deleted {} items", removed);
    Ok(())
}

pub fn toggle_favorite(ctx: &AppContext, position: usize) -> Result<()> {
    let Some(item) = ctx.records.item_at(position) else {
        println!("No item at position {}", position);
        return Ok(());
    };

    match ctx.controller().toggle_favorite(item)? {
        Some(true) => println!("Item {} is now a favorite", position),
        Some(false) => println!("Item {} is no longer a favorite", position),
        None => println!("No item at position {}", position),
    }
    Ok(())
}

pub fn list_items(ctx: &AppContext, json: bool) -> Result<()> {
    let items = ctx.records.all_items();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    for (position, item) in items.iter().enumerate() {
        println!(
            "{:>3} {} {}",
            position,
            item.favorite_marker(),
            item.display_timestamp()
        );
    }

    Ok(())
}

#[derive(Serialize)]
struct TipView<'a> {
    id: &'a str,
    title: &'a str,
    message: Option<&'a str>,
    image: Option<&'a str>,
    actions: Vec<&'a str>,
    rules: Vec<String>,
    eligible: bool,
    invalidated: bool,
    visible: bool,
}

impl<'a> TipView<'a> {
    fn new(ctx: &AppContext, tip: &'a TipDefinition) -> Self {
        Self {
            id: &tip.id,
            title: &tip.title,
            message: tip.message.as_deref(),
            image: tip.image.as_deref(),
            actions: tip.actions.iter().map(|a| a.id.as_str()).collect(),
            rules: tip.rules.iter().map(|r| r.to_string()).collect(),
            eligible: ctx.tips.is_eligible(&tip.id),
            invalidated: ctx.tips.status(&tip.id).is_invalidated(),
            visible: ctx.tips.should_display(&tip.id),
        }
    }
}

pub fn show_tips(ctx: &AppContext, all: bool, json: bool) -> Result<()> {
    let views: Vec<TipView> = ctx
        .tips
        .catalog()
        .iter()
        .map(|tip| TipView::new(ctx, tip))
        .filter(|view| all || view.visible)
        .collect();

    // Anything printed as visible counts as displayed
    for view in views.iter().filter(|v| v.visible) {
        ctx.tips.mark_displayed(view.id)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No tips to show");
        return Ok(());
    }

    for view in views {
        if all {
            let state = if view.visible {
                "visible"
            } else if view.invalidated {
                "dismissed"
            } else if view.eligible {
                "waiting"
            } else {
                "ineligible"
            };
            println!("[{}] {} ({})", state, view.id, view.rules.join(" && "));
        }
        if !view.title.is_empty() {
            println!("  {}", view.title);
        }
        if let Some(message) = view.message {
            println!("  {}", message);
        }
        if !view.actions.is_empty() {
            println!("  actions: {}", view.actions.join(", "));
        }
    }

    Ok(())
}

pub fn donate(ctx: &AppContext, event: &str) -> Result<()> {
    ctx.tips.donate(event);
    println!(
        "{} donated ({} total)",
        event,
        ctx.tips.donation_count(event)
    );
    Ok(())
}

/// Donation counts of the feed events, optionally inside a trailing window.
pub fn show_events(ctx: &AppContext, within: Option<Window>) -> Result<()> {
    let now = Utc::now();

    for event in [
        catalog::ITEM_ADDED,
        catalog::ITEM_DELETED,
        catalog::ITEM_FAVORITED,
    ] {
        let total = ctx.tips.donation_count(event);
        match within {
            None => println!("{:<14} {}", event, total),
            Some(window) => {
                let recent = ctx.tips.donation_count_within(event, window, now);
                let logged = ctx.tips.logged_donation_count_within(event, window, now)?;
                if logged == recent {
                    println!("{:<14} {} ({} in last {})", event, total, recent, window);
                } else {
                    println!(
                        "{:<14} {} ({} in last {}, {} persisted)",
                        event, total, recent, window, logged
                    );
                }
            }
        }
    }

    Ok(())
}

pub fn dismiss_tip(ctx: &AppContext, tip: &str) -> Result<()> {
    ctx.tips.invalidate(tip, InvalidationReason::Closed)?;
    println!("Dismissed tip: {}", tip);
    Ok(())
}

pub fn run_tip_action(ctx: &AppContext, tip: &str, action: &str) -> Result<()> {
    ctx.controller().handle_tip_action(tip, action)?;
    println!("Ran {} on tip {}", action, tip);
    Ok(())
}

pub fn reset_tips(ctx: &AppContext, tip: Option<&str>) -> Result<()> {
    match tip {
        Some(tip) => {
            ctx.tips.reset(tip)?;
            println!("Reset tip: {}", tip);
        }
        None => {
            ctx.tips.reset_all()?;
            println!("Reset all tips and event donations");
        }
    }
    Ok(())
}
