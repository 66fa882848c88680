//! FILENAME: engine/src/error.rs
//! PURPOSE: Error taxonomy for the field engine.
//! CONTEXT: Grammar errors come from the parser crate, validation errors
//! from malformed points/domains/limits, differentiation errors from the
//! symbolic derivative builder. Floating-point trouble (division by zero,
//! sqrt of a negative) is never an error: it flows through as NaN/Infinity.

use field_parser::GrammarError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Point must be an array of 3 numbers [x, y, z], got {len}")]
    Point { len: usize },

    #[error("Point coordinates must be finite numbers")]
    NonFinitePoint,

    #[error("Invalid domain interval for {axis}: {reason}")]
    Domain { axis: &'static str, reason: String },

    #[error("Invalid resolution: {0}")]
    Resolution(String),

    #[error("Invalid/excessive number of points: {count} (max {max})")]
    TooManyPoints { count: usize, max: usize },

    #[error("Too many seeds: {count} (max {max})")]
    TooManySeeds { count: usize, max: usize },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Missing input: provide {0}")]
    MissingInput(&'static str),
}

impl ValidationError {
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DifferentiationError {
    #[error("Symbolic derivative of function '{function}' is not supported")]
    Unsupported { function: String },

    #[error("Derived expression failed to compile: {0}")]
    Compile(#[from] GrammarError),
}

/// Any failure surfaced by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Differentiation(#[from] DifferentiationError),
}

pub type EngineResult<T> = Result<T, EngineError>;
