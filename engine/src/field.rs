//! FILENAME: engine/src/field.rs
//! PURPOSE: A compiled vector field F(x, y, z) = (P, Q, R).
//! CONTEXT: Built once from the user's expression string and then shared
//! (behind an Arc in the cache) by every operation that needs it. The
//! component evaluators are compiled eagerly; derivative evaluators for
//! divergence and curl are compiled lazily on first use and remembered,
//! including a failed symbolic attempt, so fallback is decided once.

use field_parser::{sanitize, SyntaxNode, FIELD_VARIABLES};
use once_cell::sync::OnceCell;

use crate::compiler::{compile, Evaluator};
use crate::error::{DifferentiationError, ValidationError};
use crate::grid::{norm, validate_point, Point, Vector3};

pub(crate) type DerivativeSlot = OnceCell<Result<Evaluator, DifferentiationError>>;

/// Lazily compiled symbolic operators for one field.
#[derive(Debug, Default)]
pub(crate) struct DerivativeSlots {
    pub divergence: DerivativeSlot,
    /// (curl_x, curl_y, curl_z)
    pub curl: [DerivativeSlot; 3],
}

#[derive(Debug)]
pub struct CompiledField {
    expression: String,
    components: [SyntaxNode; 3],
    evaluators: [Evaluator; 3],
    pub(crate) derivatives: DerivativeSlots,
}

impl CompiledField {
    /// Sanitizes and compiles a field string such as "(-y, x, 0)".
    pub fn compile(expression: &str) -> Result<Self, field_parser::GrammarError> {
        let components = sanitize(expression)?;
        let [p, q, r] = &components;
        let evaluators = [
            compile(p, &FIELD_VARIABLES)?,
            compile(q, &FIELD_VARIABLES)?,
            compile(r, &FIELD_VARIABLES)?,
        ];
        log::trace!("[FIELD] compiled '{}'", expression);

        Ok(CompiledField {
            expression: expression.to_string(),
            components,
            evaluators,
            derivatives: DerivativeSlots::default(),
        })
    }

    /// The text this field was compiled from. Fields handed out by the
    /// cache were compiled from the normalized key, so for those this is
    /// `normalize(submitted)`: "(-y, x, 0)" comes back as "-y, x, 0".
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The sanitized component trees (P, Q, R).
    pub fn components(&self) -> &[SyntaxNode; 3] {
        &self.components
    }

    /// F at `point`. Non-finite results are returned as-is.
    pub fn evaluate(&self, point: &Point) -> Vector3 {
        let [p, q, r] = &self.evaluators;
        [p.eval(point), q.eval(point), r.eval(point)]
    }

    /// F at an unchecked coordinate list; rejects anything but three finite numbers.
    pub fn evaluate_checked(&self, values: &[f64]) -> Result<Vector3, ValidationError> {
        let point = validate_point(values)?;
        Ok(self.evaluate(&point))
    }

    /// F at every point, in order.
    pub fn evaluate_many(&self, points: &[Point]) -> Vec<Vector3> {
        points.iter().map(|p| self.evaluate(p)).collect()
    }

    /// |F| at `point`.
    pub fn speed(&self, point: &Point) -> f64 {
        norm(&self.evaluate(point))
    }
}
