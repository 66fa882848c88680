//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for field component expressions.
//! CONTEXT: After the Lexer tokenizes a field string, the Parser converts
//! those tokens into one tree per component. The sanitizer validates each tree
//! against the allow-list, the engine compiles it into an evaluator and
//! differentiates it symbolically.
//!
//! SUPPORTED EXPRESSIONS:
//! - Constants: 3, 0.5, 1e-3
//! - Symbols: x, y, z, pi, e (t for parametric curves)
//! - Binary operations: +, -, *, /, ^
//! - Unary operations: - (negation), + (identity)
//! - Function calls: sin(x), pow(x, 2), max(x, y, z)
//! - Parentheses for grouping

use std::fmt;

/// A parsed scalar expression (one component of a vector field).
/// The node set is closed: anything the grammar does not know cannot be represented.
#[derive(Debug, PartialEq, Clone)]
pub enum SyntaxNode {
    /// A numeric literal.
    Constant(f64),

    /// A bare name. Only variables and the constants `pi` / `e` survive validation.
    Symbol(String),

    /// A binary operation: left op right (e.g. x + 1, y ^ 2).
    BinaryOp {
        left: Box<SyntaxNode>,
        op: BinaryOperator,
        right: Box<SyntaxNode>,
    },

    /// A unary operation: op operand (e.g. -y).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<SyntaxNode>,
    },

    /// A function call like sin(x) or max(x, y). The name is kept as written
    /// so that disallowed callees can be reported verbatim.
    FunctionCall { name: String, args: Vec<SyntaxNode> },

    /// An explicitly parenthesized sub-expression.
    Parenthesis(Box<SyntaxNode>),
}

/// Binary operators for expressions.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Power,    // ^ (highest precedence, right-associative)
}

/// Unary operators.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Negate, // -
    Plus,   // +
}

/// Functions callable from a field expression.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BuiltinFunction {
    // Trigonometric
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,

    // Hyperbolic
    Sinh,
    Cosh,
    Tanh,

    // Magnitude / sign
    Abs,
    Sign,

    // Powers and logarithms
    Sqrt,
    Exp,
    Log,
    Ln,
    Pow,

    // Selection
    Min,
    Max,

    // Named forms of the arithmetic operators
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// How many arguments a function accepts.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::Between(lo, hi) => (lo..=hi).contains(&count),
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::Between(lo, hi) => write!(f, "{} to {}", lo, hi),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

impl BuiltinFunction {
    pub const ALL: [BuiltinFunction; 22] = [
        BuiltinFunction::Sin,
        BuiltinFunction::Cos,
        BuiltinFunction::Tan,
        BuiltinFunction::Asin,
        BuiltinFunction::Acos,
        BuiltinFunction::Atan,
        BuiltinFunction::Sinh,
        BuiltinFunction::Cosh,
        BuiltinFunction::Tanh,
        BuiltinFunction::Abs,
        BuiltinFunction::Sign,
        BuiltinFunction::Sqrt,
        BuiltinFunction::Exp,
        BuiltinFunction::Log,
        BuiltinFunction::Ln,
        BuiltinFunction::Pow,
        BuiltinFunction::Min,
        BuiltinFunction::Max,
        BuiltinFunction::Add,
        BuiltinFunction::Subtract,
        BuiltinFunction::Multiply,
        BuiltinFunction::Divide,
    ];

    /// Looks up an allow-listed function by its (case-sensitive) name.
    pub fn from_name(name: &str) -> Option<Self> {
        BuiltinFunction::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinFunction::Sin => "sin",
            BuiltinFunction::Cos => "cos",
            BuiltinFunction::Tan => "tan",
            BuiltinFunction::Asin => "asin",
            BuiltinFunction::Acos => "acos",
            BuiltinFunction::Atan => "atan",
            BuiltinFunction::Sinh => "sinh",
            BuiltinFunction::Cosh => "cosh",
            BuiltinFunction::Tanh => "tanh",
            BuiltinFunction::Abs => "abs",
            BuiltinFunction::Sign => "sign",
            BuiltinFunction::Sqrt => "sqrt",
            BuiltinFunction::Exp => "exp",
            BuiltinFunction::Log => "log",
            BuiltinFunction::Ln => "ln",
            BuiltinFunction::Pow => "pow",
            BuiltinFunction::Min => "min",
            BuiltinFunction::Max => "max",
            BuiltinFunction::Add => "add",
            BuiltinFunction::Subtract => "subtract",
            BuiltinFunction::Multiply => "multiply",
            BuiltinFunction::Divide => "divide",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            BuiltinFunction::Log => Arity::Between(1, 2),
            BuiltinFunction::Pow | BuiltinFunction::Subtract | BuiltinFunction::Divide => {
                Arity::Exactly(2)
            }
            BuiltinFunction::Min
            | BuiltinFunction::Max
            | BuiltinFunction::Add
            | BuiltinFunction::Multiply => Arity::AtLeast(1),
            _ => Arity::Exactly(1),
        }
    }
}

impl SyntaxNode {
    pub fn constant(value: f64) -> Self {
        SyntaxNode::Constant(value)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        SyntaxNode::Symbol(name.into())
    }

    pub fn binary(left: SyntaxNode, op: BinaryOperator, right: SyntaxNode) -> Self {
        SyntaxNode::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: SyntaxNode) -> Self {
        SyntaxNode::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(func: BuiltinFunction, args: Vec<SyntaxNode>) -> Self {
        SyntaxNode::FunctionCall {
            name: func.name().to_string(),
            args,
        }
    }

    /// Returns true if `symbol` occurs anywhere in the tree.
    pub fn references(&self, symbol: &str) -> bool {
        match self {
            SyntaxNode::Constant(_) => false,
            SyntaxNode::Symbol(name) => name == symbol,
            SyntaxNode::BinaryOp { left, right, .. } => {
                left.references(symbol) || right.references(symbol)
            }
            SyntaxNode::UnaryOp { operand, .. } => operand.references(symbol),
            SyntaxNode::FunctionCall { args, .. } => args.iter().any(|a| a.references(symbol)),
            SyntaxNode::Parenthesis(inner) => inner.references(symbol),
        }
    }

    /// Binding strength used when rendering back to text.
    fn precedence(&self) -> u8 {
        match self {
            SyntaxNode::BinaryOp { op, .. } => match op {
                BinaryOperator::Add | BinaryOperator::Subtract => 1,
                BinaryOperator::Multiply | BinaryOperator::Divide => 2,
                BinaryOperator::Power => 4,
            },
            SyntaxNode::UnaryOp { .. } => 3,
            SyntaxNode::Constant(c) if c.is_sign_negative() => 3,
            _ => 5,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Power => write!(f, "^"),
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Plus => write!(f, "+"),
        }
    }
}

impl fmt::Display for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Writes `node`, wrapped in parentheses when it binds looser than `min_precedence`.
fn write_operand(f: &mut fmt::Formatter<'_>, node: &SyntaxNode, min_precedence: u8) -> fmt::Result {
    if node.precedence() < min_precedence {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

/// Renders the tree back to text that the parser accepts and that
/// evaluates to the same value. Derived trees have no Parenthesis nodes,
/// so grouping is reconstructed from operator precedence.
impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxNode::Constant(c) => write!(f, "{}", c),
            SyntaxNode::Symbol(name) => f.write_str(name),
            SyntaxNode::BinaryOp { left, op, right } => {
                let p = self.precedence();
                match op {
                    BinaryOperator::Power => {
                        write_operand(f, left, p + 1)?;
                        write!(f, " ^ ")?;
                        write_operand(f, right, 3)
                    }
                    BinaryOperator::Add | BinaryOperator::Multiply => {
                        write_operand(f, left, p)?;
                        write!(f, " {} ", op)?;
                        write_operand(f, right, p)
                    }
                    BinaryOperator::Subtract | BinaryOperator::Divide => {
                        write_operand(f, left, p)?;
                        write!(f, " {} ", op)?;
                        write_operand(f, right, p + 1)
                    }
                }
            }
            SyntaxNode::UnaryOp { op, operand } => {
                write!(f, "{}", op)?;
                // Parenthesize nested signs so "--x" never appears
                write_operand(f, operand, 4)
            }
            SyntaxNode::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            SyntaxNode::Parenthesis(inner) => write!(f, "({})", inner),
        }
    }
}
