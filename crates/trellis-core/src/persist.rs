//! The persistence collaborator seam.

use thiserror::Error;

use crate::graph::ChangeSet;

/// Durable storage for the entities an operation wrote or deleted.
///
/// `commit` receives every change of one public operation at once and must
/// apply them atomically: all or nothing.
pub trait Persistence {
    type Error: std::error::Error + Send + Sync + 'static;

    fn commit(&mut self, changes: &ChangeSet) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
#[error("Journal rejected the commit")]
pub struct JournalError;

/// In-memory persistence that records every committed change set.
///
/// Used when the graph is the system of record (embedding, tests). A failure
/// can be armed with [`MemoryJournal::fail_next_commit`].
#[derive(Debug, Default)]
pub struct MemoryJournal {
    commits: Vec<ChangeSet>,
    fail_next: bool,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> &[ChangeSet] {
        &self.commits
    }

    pub fn last_commit(&self) -> Option<&ChangeSet> {
        self.commits.last()
    }

    pub fn fail_next_commit(&mut self) {
        self.fail_next = true;
    }
}

impl Persistence for MemoryJournal {
    type Error = JournalError;

    fn commit(&mut self, changes: &ChangeSet) -> Result<(), Self::Error> {
        if std::mem::take(&mut self.fail_next) {
            return Err(JournalError);
        }
        self.commits.push(changes.clone());
        Ok(())
    }
}
