//! Maintenance commands run against a store.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use trellis_core::audit::{verify, Violation};
use trellis_core::{CoreConfig, Manager};
use trellis_store::Database;

/// Result of an invariant audit, printed as JSON.
#[derive(Debug, Serialize)]
pub struct AuditReport {
    pub checked_at: DateTime<Utc>,
    pub projects: usize,
    pub kanbans: usize,
    pub elements: usize,
    pub pages: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every ordering and page-tree invariant of the stored graph.
pub fn audit(db: &Database) -> anyhow::Result<AuditReport> {
    let graph = db.load_graph().context("loading graph for audit")?;
    let violations = verify(&graph);
    for violation in &violations {
        warn!(%violation, "invariant violated");
    }

    Ok(AuditReport {
        checked_at: Utc::now(),
        projects: graph.projects().count(),
        kanbans: graph.kanbans().count(),
        elements: graph.elements().count(),
        pages: graph.pages().count(),
        violations,
    })
}

/// Permanently delete trashed elements older than the retention period.
/// Returns how many were removed.
pub fn purge_trash(db: Database, config: CoreConfig, now: DateTime<Utc>) -> anyhow::Result<usize> {
    let graph = db.load_graph().context("loading graph for purge")?;
    let mut manager = Manager::new(graph, db, config);

    let expired = manager.expired_trash(now);
    for element in &expired {
        manager
            .final_delete(*element)
            .with_context(|| format!("deleting trashed element {element}"))?;
    }

    info!(
        removed = expired.len(),
        retention_days = manager.config().trash_retention_days,
        "trash purged"
    );
    Ok(expired.len())
}
