//! # trellis-store
//!
//! SQLite persistence for the Trellis workspace.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection`, provides typed read helpers for every domain
//! model, loads a whole [`ResourceGraph`](trellis_core::ResourceGraph) and
//! implements [`Persistence`](trellis_core::Persistence) so a
//! [`Manager`](trellis_core::Manager) can commit straight into it.

pub mod database;
pub mod graph;
pub mod kanbans;
pub mod migrations;
pub mod pages;
pub mod projects;
pub mod roles;
pub mod users;

mod error;
mod rows;

pub use database::Database;
pub use error::{Result, StoreError};
