//! FILENAME: engine/src/line_integral.rs
//! PURPOSE: Work integrals ∫ F(r(t)) · r'(t) dt along parametric curves.
//! CONTEXT: The curve is three expressions in t, checked against the same
//! allow-list as fields. Its tangent is derived symbolically per component;
//! a component whose derivative has no rule (min, max, sign) is
//! differentiated numerically instead. The integral uses the composite
//! trapezoid rule over evenly spaced parameters.

use field_parser::{sanitize_with, GrammarError, SyntaxNode, CURVE_VARIABLES};
use serde::{Deserialize, Serialize};

use crate::compiler::{compile, Evaluator};
use crate::derivative::differentiate;
use crate::error::ValidationError;
use crate::field::CompiledField;
use crate::grid::{linspace, Point, Vector3};
use crate::limits::EngineLimits;

#[derive(Debug, Clone)]
enum Tangent {
    Symbolic(Evaluator),
    /// Central difference of the position component.
    Numeric,
}

/// r(t) = (x(t), y(t), z(t)) with its tangent.
#[derive(Debug, Clone)]
pub struct ParametricCurve {
    expression: String,
    components: [SyntaxNode; 3],
    position: [Evaluator; 3],
    tangent: [Tangent; 3],
}

impl ParametricCurve {
    /// Compiles a curve such as "(cos(t), sin(t), 0)".
    pub fn compile(expression: &str) -> Result<Self, GrammarError> {
        let components = sanitize_with(expression, &CURVE_VARIABLES)?;
        let [x, y, z] = &components;
        let position = [
            compile(x, &CURVE_VARIABLES)?,
            compile(y, &CURVE_VARIABLES)?,
            compile(z, &CURVE_VARIABLES)?,
        ];
        let tangent = [tangent(x, expression)?, tangent(y, expression)?, tangent(z, expression)?];

        Ok(ParametricCurve {
            expression: expression.to_string(),
            components,
            position,
            tangent,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn components(&self) -> &[SyntaxNode; 3] {
        &self.components
    }

    /// r(t).
    pub fn position(&self, t: f64) -> Point {
        let [x, y, z] = &self.position;
        [x.eval(&[t]), y.eval(&[t]), z.eval(&[t])]
    }

    /// r'(t).
    pub fn velocity(&self, t: f64) -> Vector3 {
        let mut v = [0.0; 3];
        for (i, slot) in self.tangent.iter().enumerate() {
            v[i] = match slot {
                Tangent::Symbolic(evaluator) => evaluator.eval(&[t]),
                Tangent::Numeric => {
                    let d = 1e-6 * t.abs().max(1.0);
                    let c = &self.position[i];
                    (c.eval(&[t + d]) - c.eval(&[t - d])) / (2.0 * d)
                }
            };
        }
        v
    }
}

fn tangent(component: &SyntaxNode, expression: &str) -> Result<Tangent, GrammarError> {
    match differentiate(component, "t") {
        Ok(derivative) => Ok(Tangent::Symbolic(compile(&derivative, &CURVE_VARIABLES)?)),
        Err(e) => {
            log::warn!(
                "[LINE_INTEGRAL] numeric tangent for '{}' in '{}': {}",
                component,
                expression,
                e
            );
            Ok(Tangent::Numeric)
        }
    }
}

/// Result of a line integral, with the sampled curve for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineIntegral {
    pub value: f64,
    pub points: Vec<Point>,
    pub parameters: Vec<f64>,
}

/// ∫ F · dr along `curve` for t from `t_range[0]` to `t_range[1]`.
///
/// A reversed range integrates against the curve's orientation and
/// negates the result.
pub fn line_integral(
    field: &CompiledField,
    curve: &ParametricCurve,
    t_range: [f64; 2],
    steps: usize,
    limits: &EngineLimits,
) -> Result<LineIntegral, ValidationError> {
    let [t0, t1] = t_range;
    if !t0.is_finite() || !t1.is_finite() {
        return Err(ValidationError::parameter(
            "tRange",
            format!("bounds must be finite, got [{}, {}]", t0, t1),
        ));
    }
    if steps == 0 || steps > limits.max_line_steps {
        return Err(ValidationError::parameter(
            "steps",
            format!("must be between 1 and {}, got {}", limits.max_line_steps, steps),
        ));
    }

    let parameters = linspace(t0, t1, steps + 1);
    let dt = (t1 - t0) / steps as f64;
    let mut points = Vec::with_capacity(parameters.len());
    let mut value = 0.0;

    for (i, &t) in parameters.iter().enumerate() {
        let r = curve.position(t);
        let f = field.evaluate(&r);
        let v = curve.velocity(t);
        let integrand = f[0] * v[0] + f[1] * v[1] + f[2] * v[2];
        let weight = if i == 0 || i == steps { 0.5 } else { 1.0 };
        value += weight * integrand;
        points.push(r);
    }

    Ok(LineIntegral {
        value: value * dt,
        points,
        parameters,
    })
}
