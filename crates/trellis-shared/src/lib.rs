//! # trellis-shared
//!
//! Identifier newtypes, role and status enums, and the constants shared by
//! every Trellis crate.

pub mod constants;
pub mod error;
pub mod types;

pub use error::ParseError;
pub use types::*;
