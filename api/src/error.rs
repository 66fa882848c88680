//! FILENAME: api/src/error.rs
//! PURPOSE: Errors surfaced by the field service.
//! CONTEXT: Engine errors pass through unchanged; the API adds malformed
//! payloads and unknown commands. `kind()` gives transports a stable
//! category to map onto status codes.

use field_engine::{DifferentiationError, EngineError, ValidationError};
use field_parser::GrammarError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Invalid request payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<GrammarError> for ApiError {
    fn from(e: GrammarError) -> Self {
        ApiError::Engine(e.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Engine(e.into())
    }
}

impl From<DifferentiationError> for ApiError {
    fn from(e: DifferentiationError) -> Self {
        ApiError::Engine(e.into())
    }
}

impl ApiError {
    /// "grammar", "validation", "differentiation" or "request".
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Engine(EngineError::Grammar(_)) => "grammar",
            ApiError::Engine(EngineError::Validation(_)) => "validation",
            ApiError::Engine(EngineError::Differentiation(_)) => "differentiation",
            ApiError::UnknownCommand(_) | ApiError::Payload(_) => "request",
        }
    }

    /// Token named by a grammar error, if any.
    pub fn offending_token(&self) -> Option<&str> {
        match self {
            ApiError::Engine(EngineError::Grammar(e)) => e.offending_token(),
            _ => None,
        }
    }

    /// `{"error": message, "kind": kind}`, plus `"token"` for grammar errors.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        if let Some(token) = self.offending_token() {
            body["token"] = Value::String(token.to_string());
        }
        body
    }
}
