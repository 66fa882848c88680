//! FILENAME: api/src/lib.rs
//! PURPOSE: Library root for the field service boundary.
//! CONTEXT: Transports (HTTP handlers, IPC commands) hand requests to a
//! `FieldService`, either as typed structs or as a command name plus a JSON
//! payload, and get serializable responses or an `ApiError` with a kind.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{ApiError, ApiResult};
pub use service::{FieldService, COMMANDS};
pub use types::*;
