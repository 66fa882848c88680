//! FILENAME: engine/src/operators.rs
//! PURPOSE: Divergence and curl of a compiled field, pointwise and in batches.
//! CONTEXT: Two ways to get the partial derivatives:
//! - Symbolic: differentiate the component trees, combine them into one
//!   expression per operator, compile once and memoize it in the field's
//!   derivative slots.
//! - Numeric: central differences of the component evaluators with step h.
//!
//! `DiffMethod::Auto` tries symbolic first and falls back to numeric when a
//! component uses a function without a derivative rule (min, max, sign).
//! `Symbolic` turns that failure into an error; `Numeric` never builds trees.

use std::fmt;
use std::str::FromStr;

use field_parser::{BinaryOperator, SyntaxNode, FIELD_VARIABLES};
use serde::{Deserialize, Serialize};

use crate::compiler::{compile, Evaluator};
use crate::derivative::differentiate;
use crate::error::{DifferentiationError, EngineResult, ValidationError};
use crate::field::{CompiledField, DerivativeSlot};
use crate::grid::{Point, Vector3};

pub const DEFAULT_FD_STEP: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMethod {
    #[default]
    Auto,
    Symbolic,
    Numeric,
}

impl FromStr for DiffMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DiffMethod::Auto),
            "symbolic" => Ok(DiffMethod::Symbolic),
            "numeric" => Ok(DiffMethod::Numeric),
            other => Err(ValidationError::parameter(
                "method",
                format!("expected auto, symbolic or numeric, got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for DiffMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffMethod::Auto => write!(f, "auto"),
            DiffMethod::Symbolic => write!(f, "symbolic"),
            DiffMethod::Numeric => write!(f, "numeric"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorOptions {
    pub method: DiffMethod,
    /// Finite-difference step, used only on the numeric path.
    pub h: f64,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        OperatorOptions {
            method: DiffMethod::Auto,
            h: DEFAULT_FD_STEP,
        }
    }
}

impl OperatorOptions {
    pub fn new(method: DiffMethod, h: f64) -> Self {
        OperatorOptions { method, h }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.h.is_finite() && self.h > 0.0 {
            Ok(())
        } else {
            Err(ValidationError::parameter(
                "h",
                format!("must be a positive finite number, got {}", self.h),
            ))
        }
    }
}

// ============================================================================
// SYMBOLIC OPERATORS
// ============================================================================

/// ∂P/∂x + ∂Q/∂y + ∂R/∂z as a single tree.
fn divergence_tree(components: &[SyntaxNode; 3]) -> Result<SyntaxNode, DifferentiationError> {
    let [p, q, r] = components;
    let sum = SyntaxNode::binary(
        SyntaxNode::binary(differentiate(p, "x")?, BinaryOperator::Add, differentiate(q, "y")?),
        BinaryOperator::Add,
        differentiate(r, "z")?,
    );
    Ok(sum)
}

/// One curl component: ∂(a)/∂(u) − ∂(b)/∂(v).
fn curl_tree(
    a: &SyntaxNode,
    u: &str,
    b: &SyntaxNode,
    v: &str,
) -> Result<SyntaxNode, DifferentiationError> {
    Ok(SyntaxNode::binary(
        differentiate(a, u)?,
        BinaryOperator::Subtract,
        differentiate(b, v)?,
    ))
}

fn curl_component_tree(
    components: &[SyntaxNode; 3],
    axis: usize,
) -> Result<SyntaxNode, DifferentiationError> {
    let [p, q, r] = components;
    match axis {
        0 => curl_tree(r, "y", q, "z"),
        1 => curl_tree(p, "z", r, "x"),
        _ => curl_tree(q, "x", p, "y"),
    }
}

/// Fills `slot` on first use. The result, including a failure, is kept.
fn symbolic_slot<'a>(
    slot: &'a DerivativeSlot,
    field: &CompiledField,
    label: &str,
    build: impl FnOnce() -> Result<SyntaxNode, DifferentiationError>,
) -> &'a Result<Evaluator, DifferentiationError> {
    slot.get_or_init(|| {
        let compiled = build().and_then(|tree| Ok(compile(&tree, &FIELD_VARIABLES)?));
        match &compiled {
            Ok(_) => log::debug!("[OPERATORS] compiled symbolic {} for '{}'", label, field.expression()),
            Err(e) => log::warn!(
                "[OPERATORS] symbolic {} unavailable for '{}': {}",
                label,
                field.expression(),
                e
            ),
        }
        compiled
    })
}

fn divergence_symbolic(field: &CompiledField) -> &Result<Evaluator, DifferentiationError> {
    symbolic_slot(&field.derivatives.divergence, field, "divergence", || {
        divergence_tree(field.components())
    })
}

fn curl_symbolic(field: &CompiledField, axis: usize) -> &Result<Evaluator, DifferentiationError> {
    let label = ["curl_x", "curl_y", "curl_z"][axis];
    symbolic_slot(&field.derivatives.curl[axis], field, label, || {
        curl_component_tree(field.components(), axis)
    })
}

// ============================================================================
// NUMERIC OPERATORS
// ============================================================================

/// Central difference of component `component` along axis `axis`.
fn partial(field: &CompiledField, point: &Point, component: usize, axis: usize, h: f64) -> f64 {
    let mut forward = *point;
    let mut backward = *point;
    forward[axis] += h;
    backward[axis] -= h;
    (field.evaluate(&forward)[component] - field.evaluate(&backward)[component]) / (2.0 * h)
}

fn divergence_numeric(field: &CompiledField, point: &Point, h: f64) -> f64 {
    (0..3).map(|i| partial(field, point, i, i, h)).sum()
}

fn curl_numeric(field: &CompiledField, point: &Point, h: f64) -> Vector3 {
    let d = |component, axis| partial(field, point, component, axis, h);
    [d(2, 1) - d(1, 2), d(0, 2) - d(2, 0), d(1, 0) - d(0, 1)]
}

// ============================================================================
// PUBLIC ENTRY POINTS
// ============================================================================

/// Picks the symbolic evaluator for `method`, or None for the numeric path.
fn resolve<'a>(
    method: DiffMethod,
    symbolic: impl FnOnce() -> &'a Result<Evaluator, DifferentiationError>,
) -> EngineResult<Option<&'a Evaluator>> {
    match method {
        DiffMethod::Numeric => Ok(None),
        DiffMethod::Auto => Ok(symbolic().as_ref().ok()),
        DiffMethod::Symbolic => match symbolic() {
            Ok(evaluator) => Ok(Some(evaluator)),
            Err(e) => Err(e.clone().into()),
        },
    }
}

/// ∇·F at `point`.
pub fn divergence_at(field: &CompiledField, point: &Point, options: &OperatorOptions) -> EngineResult<f64> {
    Ok(divergence_batch(field, std::slice::from_ref(point), options)?[0])
}

/// ∇×F at `point`.
pub fn curl_at(field: &CompiledField, point: &Point, options: &OperatorOptions) -> EngineResult<Vector3> {
    Ok(curl_batch(field, std::slice::from_ref(point), options)?[0])
}

/// ∇·F at every point, in input order.
pub fn divergence_batch(
    field: &CompiledField,
    points: &[Point],
    options: &OperatorOptions,
) -> EngineResult<Vec<f64>> {
    options.validate()?;
    let symbolic = resolve(options.method, || divergence_symbolic(field))?;
    Ok(match symbolic {
        Some(evaluator) => points.iter().map(|p| evaluator.eval(p)).collect(),
        None => points
            .iter()
            .map(|p| divergence_numeric(field, p, options.h))
            .collect(),
    })
}

/// ∇×F at every point, in input order.
pub fn curl_batch(
    field: &CompiledField,
    points: &[Point],
    options: &OperatorOptions,
) -> EngineResult<Vec<Vector3>> {
    options.validate()?;
    let mut symbolic = Vec::with_capacity(3);
    for axis in 0..3 {
        match resolve(options.method, || curl_symbolic(field, axis))? {
            Some(evaluator) => symbolic.push(evaluator),
            None => break,
        }
    }

    // All three components symbolic, or all three numeric
    Ok(match symbolic.as_slice() {
        [cx, cy, cz] => points
            .iter()
            .map(|p| [cx.eval(p), cy.eval(p), cz.eval(p)])
            .collect(),
        _ => points
            .iter()
            .map(|p| curl_numeric(field, p, options.h))
            .collect(),
    })
}
