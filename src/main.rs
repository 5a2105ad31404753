use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedtips::app::AppContext;
use feedtips::cli::{commands, Cli, Commands};
use feedtips::config::Config;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.store.path = Some(db);
    }
    if cli.in_memory {
        config.store.in_memory = true;
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Add => commands::add_item(&ctx)?,
        Commands::Delete { positions } => commands::delete_items(&ctx, &positions)?,
        Commands::Clear => commands::clear_items(&ctx)?,
        Commands::Favorite { position } => commands::toggle_favorite(&ctx, position)?,
        Commands::List { json } => commands::list_items(&ctx, json)?,
        Commands::Tips { all, json } => commands::show_tips(&ctx, all, json)?,
        Commands::Donate { event } => commands::donate(&ctx, &event)?,
        Commands::Events { within } => commands::show_events(&ctx, within)?,
        Commands::Dismiss { tip } => commands::dismiss_tip(&ctx, &tip)?,
        Commands::Action { tip, action } => commands::run_tip_action(&ctx, &tip, &action)?,
        Commands::ResetTips { tip } => commands::reset_tips(&ctx, tip.as_deref())?,
    }

    Ok(())
}
