use std::fmt::Display;

use thiserror::Error;
use trellis_shared::{ElementStatus, ResourceKind};

/// Typed failures of a single core operation.
///
/// Permission denial is deliberately absent: it is an expected outcome and is
/// reported as `Ok(false)` / `Ok(None)` by the operations themselves.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A referenced id does not resolve.
    #[error("{0} not found: {1}")]
    NotFound(ResourceKind, String),

    /// Lifecycle transition not allowed from the element's current status.
    #[error("Cannot {action} an element with status {status}")]
    IllegalTransition {
        status: ElementStatus,
        action: &'static str,
    },

    /// Requested destination index outside the sibling set.
    #[error("Index {index} out of range for {len} siblings")]
    OutOfRange { index: u32, len: u32 },

    /// Custom role name collides with a reserved or existing name.
    #[error("Role name already taken: {0}")]
    DuplicateName(String),

    /// A grant references a resource the project does not have.
    #[error("No {kind} {id} in this project to grant")]
    MissingGrant { kind: ResourceKind, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The persistence collaborator rejected the commit; the in-memory graph
    /// has been rolled back.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl CoreError {
    pub fn not_found(kind: ResourceKind, id: impl Display) -> Self {
        Self::NotFound(kind, id.to_string())
    }

    pub fn missing_grant(kind: ResourceKind, id: impl Display) -> Self {
        Self::MissingGrant {
            kind,
            id: id.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
