//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the vector field engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//!
//! PIPELINE: expression --> FieldCache --> CompiledField --> {evaluate, divergence, curl, streamlines, line integrals}

pub mod cache;
pub mod compiler;
pub mod derivative;
pub mod error;
pub mod field;
pub mod grid;
pub mod limits;
pub mod line_integral;
pub mod operators;
pub mod streamline;

// Re-export commonly used types at the crate root
pub use cache::FieldCache;
pub use compiler::{compile, Evaluator};
pub use derivative::differentiate;
pub use error::{DifferentiationError, EngineError, EngineResult, ValidationError};
pub use field::CompiledField;
pub use grid::{build_grid, linspace, norm, validate_point, Domain, Grid, Point, Resolution, Vector3};
pub use limits::EngineLimits;
pub use line_integral::{line_integral, LineIntegral, ParametricCurve};
pub use operators::{curl_at, curl_batch, divergence_at, divergence_batch, DiffMethod, OperatorOptions};
pub use streamline::{
    integrate, integrate_batch, rk4_step, seed_plane, Direction, Streamline, StreamlineBatch,
    StreamlineOptions,
};
