//! Collaborative project workspace: kanban boards, document trees and
//! project roles over an in-memory resource graph.

pub mod access;
pub mod archive;
pub mod audit;
pub mod config;
pub mod error;
pub mod graph;
pub mod kanban;
pub mod manager;
pub mod models;
pub mod pages;
pub mod persist;
pub mod roles;
pub mod sequence;

#[cfg(test)]
mod fixtures;

pub use access::PermissionResolver;
pub use config::CoreConfig;
pub use error::{CoreError, Result};
pub use graph::{ChangeSet, Entity, EntityKey, PageSlot, ResourceGraph, Txn};
pub use kanban::ElementDraft;
pub use manager::Manager;
pub use models::*;
pub use pages::NewPage;
pub use persist::{JournalError, MemoryJournal, Persistence};
pub use roles::NewCustomRole;
