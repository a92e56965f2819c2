use thiserror::Error;

/// Errors produced when decoding the textual form of shared enums.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown element status: {0}")]
    ElementStatus(String),

    #[error("Unknown search type: {0}")]
    SearchType(String),

    #[error("Unknown role type: {0}")]
    RoleType(String),

    #[error("Invalid custom role id: {0}")]
    RoleId(String),

    #[error("Custom role membership without a role id")]
    MissingRoleId,
}
