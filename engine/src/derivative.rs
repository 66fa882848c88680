//! FILENAME: engine/src/derivative.rs
//! PURPOSE: Structural symbolic differentiation of field expressions.
//! CONTEXT: Divergence and curl are built from partial derivatives of the
//! component trees. Each rule produces a new SyntaxNode, and the small
//! constructors at the bottom fold constants (0 + a, 1 * a, 2 - 3, ...)
//! as the tree is built, so derivatives of polynomial fields collapse to
//! exact constants: d/dx(x) is 1, curl(-y, x, 0) is exactly (0, 0, 2).
//!
//! RULES:
//! - Sum, difference, product, quotient rules
//! - Power: constant exponent, constant base, and the general u^v form
//! - Chain rule for every allow-listed function except sign, min and max,
//!   which report DifferentiationError::Unsupported when they depend on
//!   the variable (callers fall back to finite differences)

use field_parser::{BinaryOperator, BuiltinFunction, SyntaxNode, UnaryOperator};

use crate::error::DifferentiationError;

type DiffResult = Result<SyntaxNode, DifferentiationError>;

/// Returns ∂node/∂var.
pub fn differentiate(node: &SyntaxNode, var: &str) -> DiffResult {
    // Anything not mentioning the variable is constant with respect to it
    if !node.references(var) {
        return Ok(constant(0.0));
    }

    match node {
        SyntaxNode::Constant(_) => Ok(constant(0.0)),
        SyntaxNode::Symbol(name) => Ok(constant(if name == var { 1.0 } else { 0.0 })),
        SyntaxNode::Parenthesis(inner) => differentiate(inner, var),
        SyntaxNode::UnaryOp { op, operand } => {
            let d = differentiate(operand, var)?;
            Ok(match op {
                UnaryOperator::Negate => neg(d),
                UnaryOperator::Plus => d,
            })
        }
        SyntaxNode::BinaryOp { left, op, right } => match op {
            BinaryOperator::Add => Ok(add(differentiate(left, var)?, differentiate(right, var)?)),
            BinaryOperator::Subtract => {
                Ok(sub(differentiate(left, var)?, differentiate(right, var)?))
            }
            BinaryOperator::Multiply => product_rule(left, right, var),
            BinaryOperator::Divide => quotient_rule(left, right, var),
            BinaryOperator::Power => power_rule(left, right, var),
        },
        SyntaxNode::FunctionCall { name, args } => {
            let func = BuiltinFunction::from_name(name).ok_or_else(|| {
                DifferentiationError::Unsupported {
                    function: name.clone(),
                }
            })?;
            differentiate_call(func, args, var)
        }
    }
}

fn product_rule(u: &SyntaxNode, v: &SyntaxNode, var: &str) -> DiffResult {
    let du = differentiate(u, var)?;
    let dv = differentiate(v, var)?;
    Ok(add(mul(du, v.clone()), mul(u.clone(), dv)))
}

fn quotient_rule(u: &SyntaxNode, v: &SyntaxNode, var: &str) -> DiffResult {
    let du = differentiate(u, var)?;
    if !v.references(var) {
        return Ok(div(du, v.clone()));
    }
    let dv = differentiate(v, var)?;
    let numerator = sub(mul(du, v.clone()), mul(u.clone(), dv));
    Ok(div(numerator, pow(v.clone(), constant(2.0))))
}

fn power_rule(base: &SyntaxNode, exponent: &SyntaxNode, var: &str) -> DiffResult {
    let base_varies = base.references(var);
    let exponent_varies = exponent.references(var);

    if !exponent_varies {
        // n * u^(n - 1) * u'
        let du = differentiate(base, var)?;
        let reduced = pow(base.clone(), sub(exponent.clone(), constant(1.0)));
        return Ok(mul(mul(exponent.clone(), reduced), du));
    }

    let dv = differentiate(exponent, var)?;
    let whole = pow(base.clone(), exponent.clone());
    if !base_varies {
        // u^v * ln(u) * v'
        return Ok(mul(mul(whole, ln(base.clone())), dv));
    }

    // u^v * (v' * ln(u) + v * u' / u)
    let du = differentiate(base, var)?;
    let inner = add(
        mul(dv, ln(base.clone())),
        div(mul(exponent.clone(), du), base.clone()),
    );
    Ok(mul(whole, inner))
}

fn differentiate_call(func: BuiltinFunction, args: &[SyntaxNode], var: &str) -> DiffResult {
    use BuiltinFunction as F;

    match (func, args) {
        (F::Pow, [base, exponent]) => return power_rule(base, exponent, var),
        (F::Subtract, [a, b]) => {
            return Ok(sub(differentiate(a, var)?, differentiate(b, var)?));
        }
        (F::Divide, [a, b]) => return quotient_rule(a, b, var),
        (F::Add, _) => {
            return args.iter().try_fold(constant(0.0), |acc, arg| {
                Ok(add(acc, differentiate(arg, var)?))
            });
        }
        (F::Multiply, [first, rest @ ..]) => {
            // Fold into a left-nested product and apply the product rule
            let product = rest.iter().fold(first.clone(), |acc, arg| {
                SyntaxNode::binary(acc, BinaryOperator::Multiply, arg.clone())
            });
            return differentiate(&product, var);
        }
        (F::Log, [value, base]) => {
            let ratio = SyntaxNode::binary(
                call(F::Ln, value.clone()),
                BinaryOperator::Divide,
                call(F::Ln, base.clone()),
            );
            return differentiate(&ratio, var);
        }
        _ => {}
    }

    let [u] = args else {
        return Err(unsupported(func));
    };
    let du = differentiate(u, var)?;
    let u = u.clone();

    let outer = match func {
        F::Sin => call(F::Cos, u),
        F::Cos => neg(call(F::Sin, u)),
        F::Tan => div(constant(1.0), pow(call(F::Cos, u), constant(2.0))),
        F::Asin => div(constant(1.0), call(F::Sqrt, sub(constant(1.0), pow(u, constant(2.0))))),
        F::Acos => neg(div(
            constant(1.0),
            call(F::Sqrt, sub(constant(1.0), pow(u, constant(2.0)))),
        )),
        F::Atan => div(constant(1.0), add(constant(1.0), pow(u, constant(2.0)))),
        F::Sinh => call(F::Cosh, u),
        F::Cosh => call(F::Sinh, u),
        F::Tanh => div(constant(1.0), pow(call(F::Cosh, u), constant(2.0))),
        F::Exp => call(F::Exp, u),
        F::Log | F::Ln => div(constant(1.0), u),
        F::Sqrt => div(constant(1.0), mul(constant(2.0), call(F::Sqrt, u))),
        F::Abs => call(F::Sign, u),
        F::Sign | F::Min | F::Max | F::Pow | F::Add | F::Subtract | F::Multiply | F::Divide => {
            return Err(unsupported(func));
        }
    };

    Ok(mul(outer, du))
}

fn unsupported(func: BuiltinFunction) -> DifferentiationError {
    DifferentiationError::Unsupported {
        function: func.name().to_string(),
    }
}

// ============================================================================
// SIMPLIFYING CONSTRUCTORS
// ============================================================================

fn constant(value: f64) -> SyntaxNode {
    SyntaxNode::Constant(value)
}

/// The numeric value of `node` if it is a literal (possibly negated or grouped).
fn as_constant(node: &SyntaxNode) -> Option<f64> {
    match node {
        SyntaxNode::Constant(c) => Some(*c),
        SyntaxNode::Parenthesis(inner) => as_constant(inner),
        SyntaxNode::UnaryOp {
            op: UnaryOperator::Negate,
            operand,
        } => as_constant(operand).map(|c| -c),
        SyntaxNode::UnaryOp {
            op: UnaryOperator::Plus,
            operand,
        } => as_constant(operand),
        _ => None,
    }
}

fn is_constant(node: &SyntaxNode, value: f64) -> bool {
    as_constant(node) == Some(value)
}

fn call(func: BuiltinFunction, arg: SyntaxNode) -> SyntaxNode {
    SyntaxNode::call(func, vec![arg])
}

fn ln(arg: SyntaxNode) -> SyntaxNode {
    call(BuiltinFunction::Ln, arg)
}

fn neg(a: SyntaxNode) -> SyntaxNode {
    if let Some(c) = as_constant(&a) {
        return constant(-c);
    }
    match a {
        SyntaxNode::UnaryOp {
            op: UnaryOperator::Negate,
            operand,
        } => *operand,
        other => SyntaxNode::unary(UnaryOperator::Negate, other),
    }
}

fn add(a: SyntaxNode, b: SyntaxNode) -> SyntaxNode {
    match (as_constant(&a), as_constant(&b)) {
        (Some(x), Some(y)) => constant(x + y),
        (Some(x), _) if x == 0.0 => b,
        (_, Some(y)) if y == 0.0 => a,
        _ => SyntaxNode::binary(a, BinaryOperator::Add, b),
    }
}

fn sub(a: SyntaxNode, b: SyntaxNode) -> SyntaxNode {
    match (as_constant(&a), as_constant(&b)) {
        (Some(x), Some(y)) => constant(x - y),
        (Some(x), _) if x == 0.0 => neg(b),
        (_, Some(y)) if y == 0.0 => a,
        _ => SyntaxNode::binary(a, BinaryOperator::Subtract, b),
    }
}

fn mul(a: SyntaxNode, b: SyntaxNode) -> SyntaxNode {
    match (as_constant(&a), as_constant(&b)) {
        (Some(x), Some(y)) => constant(x * y),
        (Some(x), _) if x == 0.0 => constant(0.0),
        (_, Some(y)) if y == 0.0 => constant(0.0),
        (Some(x), _) if x == 1.0 => b,
        (_, Some(y)) if y == 1.0 => a,
        (Some(x), _) if x == -1.0 => neg(b),
        (_, Some(y)) if y == -1.0 => neg(a),
        _ => SyntaxNode::binary(a, BinaryOperator::Multiply, b),
    }
}

fn div(a: SyntaxNode, b: SyntaxNode) -> SyntaxNode {
    match (as_constant(&a), as_constant(&b)) {
        (Some(x), Some(y)) if y != 0.0 => constant(x / y),
        (Some(x), _) if x == 0.0 => constant(0.0),
        (_, Some(y)) if y == 1.0 => a,
        _ => SyntaxNode::binary(a, BinaryOperator::Divide, b),
    }
}

fn pow(base: SyntaxNode, exponent: SyntaxNode) -> SyntaxNode {
    if is_constant(&exponent, 0.0) {
        return constant(1.0);
    }
    if is_constant(&exponent, 1.0) {
        return base;
    }
    SyntaxNode::binary(base, BinaryOperator::Power, exponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use field_parser::{parse, FIELD_VARIABLES};

    fn derive(text: &str, var: &str) -> SyntaxNode {
        differentiate(&parse(text).unwrap(), var).unwrap()
    }

    /// Evaluates d(text)/d(var) at `point` through the compiler.
    fn slope(text: &str, var: &str, point: [f64; 3]) -> f64 {
        compile(&derive(text, var), &FIELD_VARIABLES)
            .unwrap()
            .eval(&point)
    }

    #[test]
    fn test_linear_terms_fold_to_constants() {
        assert_eq!(derive("x", "x"), constant(1.0));
        assert_eq!(derive("x", "y"), constant(0.0));
        assert_eq!(derive("-y", "y"), constant(-1.0));
        assert_eq!(derive("3 * x + 2", "x"), constant(3.0));
        assert_eq!(derive("(x - 4) / 2", "x"), constant(0.5));
        assert_eq!(derive("pi * e", "x"), constant(0.0));
    }

    #[test]
    fn test_polynomials() {
        assert_eq!(derive("x^2", "x").to_string(), "2 * x");
        assert_eq!(slope("x^3 * y", "x", [2.0, 5.0, 0.0]), 60.0);
        assert_eq!(slope("x * y * z", "z", [2.0, 5.0, 7.0]), 10.0);
        assert_eq!(slope("x^-1", "x", [2.0, 0.0, 0.0]), -0.25);
    }

    #[test]
    fn test_chain_rule() {
        let at = [0.3, 0.0, 0.0];
        assert!((slope("sin(2x)", "x", at) - 2.0 * (0.6f64).cos()).abs() < 1e-12);
        assert!((slope("exp(x^2)", "x", at) - 0.6 * (0.09f64).exp()).abs() < 1e-12);
        assert!((slope("ln(x)", "x", at) - 1.0 / 0.3).abs() < 1e-12);
        assert!((slope("sqrt(x)", "x", at) - 0.5 / (0.3f64).sqrt()).abs() < 1e-12);
        assert!((slope("atan(x)", "x", at) - 1.0 / 1.09).abs() < 1e-12);
        assert!((slope("tanh(x)", "x", at) - 1.0 / (0.3f64).cosh().powi(2)).abs() < 1e-12);
        assert!((slope("asin(x)", "x", at) - 1.0 / (0.91f64).sqrt()).abs() < 1e-12);
        assert!((slope("acos(x)", "x", at) + 1.0 / (0.91f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_variable_exponents() {
        let at = [1.5, 0.0, 0.0];
        // d/dx 2^x = 2^x ln 2
        assert!((slope("2^x", "x", at) - 2f64.powf(1.5) * 2f64.ln()).abs() < 1e-12);
        // d/dx x^x = x^x (ln x + 1)
        let expected = 1.5f64.powf(1.5) * (1.5f64.ln() + 1.0);
        assert!((slope("pow(x, x)", "x", at) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_named_operator_forms() {
        assert_eq!(derive("add(x, y, x)", "x"), constant(2.0));
        assert_eq!(derive("subtract(y, x)", "x"), constant(-1.0));
        assert_eq!(slope("multiply(x, x, y)", "x", [3.0, 2.0, 0.0]), 12.0);
        assert!((slope("log(x, 10)", "x", [2.0, 0.0, 0.0]) - 1.0 / (2.0 * 10f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_unsupported_functions() {
        let err = differentiate(&parse("max(x, y)").unwrap(), "x").unwrap_err();
        assert_eq!(
            err,
            DifferentiationError::Unsupported {
                function: "max".to_string()
            }
        );
        assert!(differentiate(&parse("sign(x)").unwrap(), "x").is_err());
        // Constant with respect to x, so no rule is needed
        assert_eq!(derive("max(y, z)", "x"), constant(0.0));
    }

    #[test]
    fn test_abs_uses_sign() {
        assert_eq!(slope("abs(x)", "x", [-2.0, 0.0, 0.0]), -1.0);
        assert_eq!(slope("abs(x)", "x", [2.0, 0.0, 0.0]), 1.0);
    }
}
