//! FILENAME: parser/src/sanitize.rs
//! PURPOSE: Allow-list validation of parsed field expressions.
//! CONTEXT: Field strings come straight from users. Every node of every
//! component is checked against a fixed grammar before anything is compiled:
//! only known variables, the constants pi and e, the arithmetic operators and
//! the allow-listed functions pass. Anything else is rejected by name.

use crate::ast::{BuiltinFunction, SyntaxNode};
use crate::error::GrammarError;
use crate::parser::parse_components;

/// Variables bound by a vector field F(x, y, z).
pub const FIELD_VARIABLES: [&str; 3] = ["x", "y", "z"];

/// Variable bound by a parametric curve r(t).
pub const CURVE_VARIABLES: [&str; 1] = ["t"];

/// Named constants available in every expression.
pub const ALLOWED_CONSTANTS: [&str; 2] = ["pi", "e"];

/// Trims whitespace and one pair of enclosing parentheses.
///
/// The parentheses are only removed when the opening one at the start
/// matches the closing one at the end, so `(x + 1) * 2, y, z` is left alone.
pub fn normalize(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.starts_with('(') && trimmed.ends_with(')') && closes_at_end(trimmed) {
        return trimmed[1..trimmed.len() - 1].trim().to_string();
    }
    trimmed.to_string()
}

/// Returns true if the '(' at index 0 is closed by the final character.
fn closes_at_end(s: &str) -> bool {
    let last = s.len() - 1;
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == last;
                }
            }
            _ => {}
        }
    }
    false
}

/// Parses a field string into its three validated components (P, Q, R).
pub fn sanitize(expr: &str) -> Result<[SyntaxNode; 3], GrammarError> {
    sanitize_with(expr, &FIELD_VARIABLES)
}

/// Parses a three-component expression whose free variables are `variables`.
pub fn sanitize_with(expr: &str, variables: &[&str]) -> Result<[SyntaxNode; 3], GrammarError> {
    let normalized = normalize(expr);
    let components = parse_components(&normalized)?;

    let components: [SyntaxNode; 3] = components
        .try_into()
        .map_err(|rejected: Vec<SyntaxNode>| GrammarError::ComponentCount(rejected.len()))?;

    for component in &components {
        validate(component, variables)?;
    }

    Ok(components)
}

/// Walks every node and rejects anything outside the allow-list.
pub fn validate(node: &SyntaxNode, variables: &[&str]) -> Result<(), GrammarError> {
    match node {
        SyntaxNode::Constant(_) => Ok(()),
        SyntaxNode::Parenthesis(inner) => validate(inner, variables),
        SyntaxNode::Symbol(name) => {
            if variables.contains(&name.as_str()) || ALLOWED_CONSTANTS.contains(&name.as_str()) {
                Ok(())
            } else {
                // Function names are only meaningful in call position
                Err(GrammarError::DisallowedSymbol(name.clone()))
            }
        }
        // The operator set is closed by construction; only operands need checking
        SyntaxNode::BinaryOp { left, right, .. } => {
            validate(left, variables)?;
            validate(right, variables)
        }
        SyntaxNode::UnaryOp { operand, .. } => validate(operand, variables),
        SyntaxNode::FunctionCall { name, args } => {
            let func = BuiltinFunction::from_name(name)
                .ok_or_else(|| GrammarError::DisallowedFunction(name.clone()))?;
            check_arity(func, args.len())?;
            args.iter().try_for_each(|arg| validate(arg, variables))
        }
    }
}

/// Fails with `GrammarError::Arity` when `func` cannot take `count` arguments.
pub fn check_arity(func: BuiltinFunction, count: usize) -> Result<(), GrammarError> {
    let arity = func.arity();
    if arity.accepts(count) {
        Ok(())
    } else {
        Err(GrammarError::Arity {
            function: func.name().to_string(),
            expected: arity.to_string(),
            found: count,
        })
    }
}
