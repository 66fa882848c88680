//! FILENAME: parser/src/lib.rs
//! PURPOSE: Library root for the vector field expression parser.
//! CONTEXT: This crate exposes the lexer, parser, AST and sanitizer
//! needed to turn a user-typed field string "(P, Q, R)" into three
//! validated expression trees.
//!
//! PIPELINE: Field String --> normalize --> Lexer --> Tokens --> Parser --> AST x3 --> validate
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /, ^ (power, right-associative)
//! - Unary sign: -y, +x
//! - Variables: x, y, z (t for parametric curves), constants pi and e
//! - Functions: sin, cos, tan, asin, acos, atan, sinh, cosh, tanh, abs, sign,
//!   sqrt, exp, log, ln, pow, min, max, add, subtract, multiply, divide
//! - Parentheses for grouping, implicit products (2x, 3(x + 1), pi x, (x + 1)(y - 1))
//! - Nesting is capped at MAX_DEPTH; deeper input is a GrammarError

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod sanitize;
pub mod token;


pub use ast::{Arity, BinaryOperator, BuiltinFunction, SyntaxNode, UnaryOperator};
pub use error::GrammarError;
pub use lexer::Lexer;
pub use parser::{parse, parse_components, ParseResult, Parser, MAX_DEPTH};
pub use sanitize::{
    check_arity, normalize, sanitize, sanitize_with, validate, ALLOWED_CONSTANTS,
    CURVE_VARIABLES, FIELD_VARIABLES,
};
pub use token::Token;
