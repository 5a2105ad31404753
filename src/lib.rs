//! # feedtips
//!
//! A list of timestamped, favoritable items with contextual tips.
//!
//! ## Architecture
//!
//! ```text
//! user action ─┬─> RecordStore ──> RecordBackend (SQLite / memory)
//!              └─> TipEngine   ──> EventLog      (SQLite / memory)
//! ```
//!
//! The two components never share state. Each serializes its own
//! mutations and exposes a `subscribe()` hook for the presentation layer.
//!
//! ## Quick Start
//!
//! ```bash
//! feedtips add
//! feedtips favorite 0
//! feedtips list
//! feedtips tips --all
//! ```

/// Application context, user actions and error types.
///
/// [`AppContext`](app::AppContext) opens the store and wires the
/// record store and tip engine together.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/feedtips/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): timestamped, favoritable record
/// - [`ItemRef`](domain::ItemRef): handle to an item in the store
pub mod domain;

/// The ordered, observable item collection.
pub mod records;

/// Persistence collaborators.
///
/// - [`RecordBackend`](store::RecordBackend) and [`EventLog`](store::EventLog): traits
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation of both
/// - [`MemoryStore`](store::MemoryStore): in-process implementation of both
pub mod store;

/// Tip definitions, rules and the eligibility engine.
pub mod tips;
