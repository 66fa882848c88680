//! FILENAME: engine/src/compiler.rs
//! PURPOSE: Compiles a validated SyntaxNode into a reusable evaluator closure.
//! CONTEXT: Compilation happens once per field component (and once per
//! derivative slot); evaluation then runs per point without re-parsing or
//! re-walking names. Variables are resolved to positions at compile time,
//! pi and e are folded to their values.
//!
//! Floating-point semantics are standard IEEE: 1/0 is Infinity, sqrt(-1)
//! and log(-1) are NaN. None of these are errors.

use std::f64::consts::{E, PI};
use std::fmt;
use std::sync::Arc;

use field_parser::{
    check_arity, BinaryOperator, BuiltinFunction, GrammarError, SyntaxNode, UnaryOperator,
};

type EvalFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// A compiled scalar expression. Cheap to clone, safe to share across threads.
#[derive(Clone)]
pub struct Evaluator {
    func: Arc<EvalFn>,
    variables: Arc<[String]>,
}

impl Evaluator {
    /// Evaluates with `values[i]` bound to the i-th compiled variable.
    /// Missing values read as NaN.
    pub fn eval(&self, values: &[f64]) -> f64 {
        (self.func)(values)
    }

    /// The variable names, in binding order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

/// Compiles `node` with `variables` bound by position.
///
/// The tree is expected to have passed `field_parser::validate`; names the
/// compiler cannot resolve are still reported as GrammarErrors.
pub fn compile(node: &SyntaxNode, variables: &[&str]) -> Result<Evaluator, GrammarError> {
    let func = build(node, variables)?;
    Ok(Evaluator {
        func: Arc::from(func),
        variables: variables.iter().map(|v| v.to_string()).collect(),
    })
}

/// Boxes a closure with the evaluator signature so its argument lifetime is generic.
fn boxed<F>(f: F) -> Box<EvalFn>
where
    F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
{
    Box::new(f)
}

fn build(node: &SyntaxNode, variables: &[&str]) -> Result<Box<EvalFn>, GrammarError> {
    match node {
        SyntaxNode::Constant(c) => {
            let c = *c;
            Ok(boxed(move |_| c))
        }
        SyntaxNode::Symbol(name) => build_symbol(name, variables),
        SyntaxNode::Parenthesis(inner) => build(inner, variables),
        SyntaxNode::UnaryOp { op, operand } => {
            let operand = build(operand, variables)?;
            Ok(match op {
                UnaryOperator::Negate => boxed(move |v| -operand(v)),
                UnaryOperator::Plus => operand,
            })
        }
        SyntaxNode::BinaryOp { left, op, right } => {
            let l = build(left, variables)?;
            let r = build(right, variables)?;
            Ok(match op {
                BinaryOperator::Add => boxed(move |v| l(v) + r(v)),
                BinaryOperator::Subtract => boxed(move |v| l(v) - r(v)),
                BinaryOperator::Multiply => boxed(move |v| l(v) * r(v)),
                BinaryOperator::Divide => boxed(move |v| l(v) / r(v)),
                BinaryOperator::Power => boxed(move |v| l(v).powf(r(v))),
            })
        }
        SyntaxNode::FunctionCall { name, args } => {
            let func = BuiltinFunction::from_name(name)
                .ok_or_else(|| GrammarError::DisallowedFunction(name.clone()))?;
            check_arity(func, args.len())?;
            let args = args
                .iter()
                .map(|arg| build(arg, variables))
                .collect::<Result<Vec<_>, _>>()?;
            build_call(func, args)
        }
    }
}

fn build_symbol(name: &str, variables: &[&str]) -> Result<Box<EvalFn>, GrammarError> {
    if let Some(index) = variables.iter().position(|v| *v == name) {
        return Ok(boxed(move |v| v.get(index).copied().unwrap_or(f64::NAN)));
    }
    match name {
        "pi" => Ok(boxed(|_| PI)),
        "e" => Ok(boxed(|_| E)),
        _ => Err(GrammarError::DisallowedSymbol(name.to_string())),
    }
}

fn build_call(func: BuiltinFunction, args: Vec<Box<EvalFn>>) -> Result<Box<EvalFn>, GrammarError> {
    match func {
        BuiltinFunction::Sin => unary(func, args, f64::sin),
        BuiltinFunction::Cos => unary(func, args, f64::cos),
        BuiltinFunction::Tan => unary(func, args, f64::tan),
        BuiltinFunction::Asin => unary(func, args, f64::asin),
        BuiltinFunction::Acos => unary(func, args, f64::acos),
        BuiltinFunction::Atan => unary(func, args, f64::atan),
        BuiltinFunction::Sinh => unary(func, args, f64::sinh),
        BuiltinFunction::Cosh => unary(func, args, f64::cosh),
        BuiltinFunction::Tanh => unary(func, args, f64::tanh),
        BuiltinFunction::Abs => unary(func, args, f64::abs),
        BuiltinFunction::Sign => unary(func, args, sign),
        BuiltinFunction::Sqrt => unary(func, args, f64::sqrt),
        BuiltinFunction::Exp => unary(func, args, f64::exp),
        BuiltinFunction::Ln => unary(func, args, f64::ln),
        BuiltinFunction::Log if args.len() == 1 => unary(func, args, f64::ln),
        BuiltinFunction::Log => {
            let [value, base] = exactly(func, args)?;
            Ok(boxed(move |v| value(v).ln() / base(v).ln()))
        }
        BuiltinFunction::Pow => {
            let [base, exponent] = exactly(func, args)?;
            Ok(boxed(move |v| base(v).powf(exponent(v))))
        }
        BuiltinFunction::Subtract => {
            let [a, b] = exactly(func, args)?;
            Ok(boxed(move |v| a(v) - b(v)))
        }
        BuiltinFunction::Divide => {
            let [a, b] = exactly(func, args)?;
            Ok(boxed(move |v| a(v) / b(v)))
        }
        BuiltinFunction::Add => Ok(boxed(move |v| args.iter().map(|a| a(v)).sum())),
        BuiltinFunction::Multiply => Ok(boxed(move |v| args.iter().map(|a| a(v)).product())),
        BuiltinFunction::Min => Ok(boxed(move |v| {
            args.iter().map(|a| a(v)).fold(f64::INFINITY, nan_min)
        })),
        BuiltinFunction::Max => Ok(boxed(move |v| {
            args.iter().map(|a| a(v)).fold(f64::NEG_INFINITY, nan_max)
        })),
    }
}

// f64::min/max skip NaN; a field value built from NaN must stay NaN.
fn nan_min(acc: f64, x: f64) -> f64 {
    if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.min(x) }
}

fn nan_max(acc: f64, x: f64) -> f64 {
    if acc.is_nan() || x.is_nan() { f64::NAN } else { acc.max(x) }
}

/// sign(x): -1, 0 or 1; NaN stays NaN.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x
    }
}

fn unary(
    func: BuiltinFunction,
    args: Vec<Box<EvalFn>>,
    f: fn(f64) -> f64,
) -> Result<Box<EvalFn>, GrammarError> {
    let [a] = exactly(func, args)?;
    Ok(boxed(move |v| f(a(v))))
}

fn exactly<const N: usize>(
    func: BuiltinFunction,
    args: Vec<Box<EvalFn>>,
) -> Result<[Box<EvalFn>; N], GrammarError> {
    let found = args.len();
    args.try_into().map_err(|_| GrammarError::Arity {
        function: func.name().to_string(),
        expected: N.to_string(),
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_parser::{parse, FIELD_VARIABLES};

    fn eval(text: &str, point: [f64; 3]) -> f64 {
        let node = parse(text).unwrap();
        compile(&node, &FIELD_VARIABLES).unwrap().eval(&point)
    }

    #[test]
    fn test_variables_and_constants() {
        assert_eq!(eval("x", [1.0, 2.0, 3.0]), 1.0);
        assert_eq!(eval("z", [1.0, 2.0, 3.0]), 3.0);
        assert_eq!(eval("pi", [0.0, 0.0, 0.0]), PI);
        assert_eq!(eval("e", [0.0, 0.0, 0.0]), E);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("x + y * z", [1.0, 2.0, 3.0]), 7.0);
        assert_eq!(eval("-x^2", [3.0, 0.0, 0.0]), -9.0);
        assert_eq!(eval("2^-1", [0.0, 0.0, 0.0]), 0.5);
        assert_eq!(eval("(x + 1) / 2", [3.0, 0.0, 0.0]), 2.0);
        assert_eq!(eval("3x", [2.0, 0.0, 0.0]), 6.0);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("sqrt(x)", [9.0, 0.0, 0.0]), 3.0);
        assert_eq!(eval("pow(x, 3)", [2.0, 0.0, 0.0]), 8.0);
        assert_eq!(eval("max(x, y, z)", [1.0, 5.0, 3.0]), 5.0);
        assert_eq!(eval("min(x, y, z)", [1.0, 5.0, -3.0]), -3.0);
        assert_eq!(eval("sign(x)", [-4.0, 0.0, 0.0]), -1.0);
        assert_eq!(eval("sign(x)", [0.0, 0.0, 0.0]), 0.0);
        assert_eq!(eval("add(x, y, z)", [1.0, 2.0, 3.0]), 6.0);
        assert_eq!(eval("multiply(x, y, z)", [1.0, 2.0, 3.0]), 6.0);
        assert_eq!(eval("subtract(x, y)", [1.0, 2.0, 3.0]), -1.0);
        assert_eq!(eval("divide(x, y)", [1.0, 2.0, 3.0]), 0.5);
        assert!((eval("log(x, 2)", [8.0, 0.0, 0.0]) - 3.0).abs() < 1e-12);
        assert!((eval("ln(e)", [0.0, 0.0, 0.0]) - 1.0).abs() < 1e-15);
        assert_eq!(eval("log(x)", [1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_domain_errors_flow_through_as_nan_or_inf() {
        assert!(eval("1 / x", [0.0, 0.0, 0.0]).is_infinite());
        assert!(eval("sqrt(x)", [-1.0, 0.0, 0.0]).is_nan());
        assert!(eval("log(x)", [-1.0, 0.0, 0.0]).is_nan());
        assert!(eval("max(x, y)", [f64::NAN, 1.0, 0.0]).is_nan());
    }

    #[test]
    fn test_unknown_names_fail_to_compile() {
        let node = parse("foo + 1").unwrap();
        assert_eq!(
            compile(&node, &FIELD_VARIABLES).unwrap_err(),
            GrammarError::DisallowedSymbol("foo".to_string())
        );

        let node = parse("system(1)").unwrap();
        assert!(compile(&node, &FIELD_VARIABLES).is_err());
    }

    #[test]
    fn test_custom_variable_binding() {
        let node = parse("2 * t").unwrap();
        let evaluator = compile(&node, &["t"]).unwrap();
        assert_eq!(evaluator.eval(&[1.5]), 3.0);
        assert_eq!(evaluator.variables(), &["t".to_string()]);
        assert!(evaluator.eval(&[]).is_nan());
    }
}
