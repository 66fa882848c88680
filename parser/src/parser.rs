//! FILENAME: parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds one SyntaxNode per comma-separated component.
//! Commas inside function calls or parentheses belong to those constructs,
//! so only top-level commas separate components.
//!
//! GRAMMAR:
//!   components     --> expression ( "," expression )*
//!   expression     --> additive
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("-" | "+") unary | power
//!   power          --> primary ( "^" unary )?
//!   primary        --> NUMBER [implicit] | IDENTIFIER [implicit] | function_call
//!                    | "(" expression ")" [implicit]
//!   implicit       --> power               // 2x, 3(x + 1), pi x, (x + 1)(y - 1)
//!   function_call  --> IDENTIFIER "(" arguments? ")"
//!   arguments      --> expression ("," expression)*
//!
//! An implicit factor must start with a name or "(". A number never starts
//! one, so "x 2" is trailing garbage rather than a product.
//!
//! Operators outside the grammar (%, ==, <, !, ...) and characters such as
//! '[' or ';' are reported as GrammarErrors naming the offending token.
//! Trees deeper than MAX_DEPTH are rejected while parsing, which keeps every
//! later recursive pass over the tree on a bounded stack.

use crate::ast::{BinaryOperator, SyntaxNode, UnaryOperator};
use crate::error::GrammarError;
use crate::lexer::Lexer;
use crate::token::Token;

pub type ParseResult<T> = Result<T, GrammarError>;

/// Maximum height of a parsed tree, counting nested groups, signs,
/// exponents and operator chains.
pub const MAX_DEPTH: usize = 128;

/// A parsed subtree together with its height.
type Parsed = (SyntaxNode, usize);

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from an input string.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
            depth: 0,
        }
    }

    /// Parses a single scalar expression.
    pub fn parse(&mut self) -> ParseResult<SyntaxNode> {
        if self.current_token == Token::EOF {
            return Err(GrammarError::syntax("Empty expression"));
        }

        let (expr, _) = self.parse_expression()?;

        if self.current_token != Token::EOF {
            return Err(self.unexpected());
        }

        Ok(expr)
    }

    /// Parses a comma-separated list of expressions (the components of a field).
    pub fn parse_components(&mut self) -> ParseResult<Vec<SyntaxNode>> {
        if self.current_token == Token::EOF {
            return Err(GrammarError::syntax("Empty expression"));
        }

        let mut components = vec![self.parse_expression()?.0];
        while self.current_token == Token::Comma {
            self.advance();
            components.push(self.parse_expression()?.0);
        }

        if self.current_token != Token::EOF {
            return Err(self.unexpected());
        }

        Ok(components)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Checks if the current token matches the expected token.
    /// If it matches, advances and returns Ok. Otherwise returns an error.
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else if matches!(self.current_token, Token::Operator(_) | Token::Illegal(_)) {
            Err(self.unexpected())
        } else {
            Err(GrammarError::syntax_at(
                format!("Expected '{}', found '{}'", expected, self.current_token),
                self.current_token.to_string(),
            ))
        }
    }

    /// Classifies the current token as the reason parsing cannot continue.
    fn unexpected(&self) -> GrammarError {
        match &self.current_token {
            Token::Operator(op) if op == "=" => GrammarError::unsupported("assignment", "="),
            Token::Operator(op) => GrammarError::DisallowedOperator(op.clone()),
            Token::Illegal(ch @ ('[' | ']')) => {
                GrammarError::unsupported("matrix literal or indexing", ch.to_string())
            }
            Token::Illegal(ch @ ('{' | '}')) => {
                GrammarError::unsupported("object literal", ch.to_string())
            }
            Token::Illegal(ch @ ';') => {
                GrammarError::unsupported("statement separator", ch.to_string())
            }
            Token::Illegal(ch @ '"') => GrammarError::unsupported("string literal", ch.to_string()),
            Token::Illegal(ch) => {
                GrammarError::unsupported(format!("character '{}'", ch), ch.to_string())
            }
            Token::EOF => GrammarError::syntax("Unexpected end of expression"),
            token => GrammarError::syntax_at(
                format!("Unexpected token '{}'", token),
                token.to_string(),
            ),
        }
    }

    // ========================================
    // DEPTH LIMIT
    // ========================================

    fn too_deep(&self) -> GrammarError {
        GrammarError::unsupported("expression nested too deeply", self.current_token.to_string())
    }

    /// Runs `parse` one nesting level down, failing once MAX_DEPTH is passed.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = parse(&mut *self);
        self.depth -= 1;
        result
    }

    /// Accepts a freshly built node unless it is taller than MAX_DEPTH.
    fn node(&self, node: SyntaxNode, height: usize) -> ParseResult<Parsed> {
        if height > MAX_DEPTH {
            return Err(self.too_deep());
        }
        Ok((node, height))
    }

    fn binary(&self, left: Parsed, op: BinaryOperator, right: Parsed) -> ParseResult<Parsed> {
        let height = 1 + left.1.max(right.1);
        self.node(SyntaxNode::binary(left.0, op, right.0), height)
    }

    // ========================================
    // PRECEDENCE LEVELS
    // ========================================

    /// Entry point for expression parsing.
    fn parse_expression(&mut self) -> ParseResult<Parsed> {
        self.parse_additive()
    }

    /// Parses additive expressions (+ and -).
    fn parse_additive(&mut self) -> ParseResult<Parsed> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(left, op, right)?;
        }

        Ok(left)
    }

    /// Parses multiplicative expressions (* and /).
    fn parse_multiplicative(&mut self) -> ParseResult<Parsed> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(left, op, right)?;
        }

        Ok(left)
    }

    /// Parses unary expressions (negation and unary plus). Every nested
    /// group, sign and exponent passes through here, so this is where the
    /// nesting depth is counted.
    fn parse_unary(&mut self) -> ParseResult<Parsed> {
        self.nested(Self::parse_signed)
    }

    fn parse_signed(&mut self) -> ParseResult<Parsed> {
        let op = match &self.current_token {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_power(),
        };

        self.advance();
        let (operand, height) = self.parse_unary()?;
        self.node(SyntaxNode::unary(op, operand), height + 1)
    }

    /// Parses power/exponentiation expressions (^). The exponent is parsed
    /// as a unary so `x^-1` works and `x^y^z` associates to the right.
    fn parse_power(&mut self) -> ParseResult<Parsed> {
        let left = self.parse_primary()?;

        if self.current_token == Token::Caret {
            self.advance();
            let right = self.parse_unary()?;
            return self.binary(left, BinaryOperator::Power, right);
        }

        Ok(left)
    }

    /// Parses primary expressions (numbers, symbols, function calls, parentheses).
    fn parse_primary(&mut self) -> ParseResult<Parsed> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.advance();
                self.implicit_product((SyntaxNode::Constant(n), 1))
            }

            Token::Identifier(name) => {
                self.advance();

                if self.current_token == Token::LParen {
                    return self.parse_function_call(name);
                }

                if self.current_token == Token::Operator("=".to_string()) {
                    return Err(GrammarError::unsupported(
                        format!("assignment to '{}'", name),
                        "=",
                    ));
                }

                self.implicit_product((SyntaxNode::Symbol(name), 1))
            }

            Token::LParen => {
                self.advance();
                let (expr, height) = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let group = self.node(SyntaxNode::Parenthesis(Box::new(expr)), height + 1)?;
                self.implicit_product(group)
            }

            _ => Err(self.unexpected()),
        }
    }

    /// Implicit multiplication: a coefficient, name or group followed by a
    /// name or group. The factor binds like a power, so 3x^2 = 3 * (x^2).
    fn implicit_product(&mut self, left: Parsed) -> ParseResult<Parsed> {
        if !matches!(self.current_token, Token::Identifier(_) | Token::LParen) {
            return Ok(left);
        }

        let factor = self.nested(Self::parse_power)?;
        self.binary(left, BinaryOperator::Multiply, factor)
    }

    /// Parses a function call like max(x, y, 1).
    fn parse_function_call(&mut self, name: String) -> ParseResult<Parsed> {
        // Consume the '('
        self.advance();

        let mut args = Vec::new();
        let mut height = 0;

        if self.current_token == Token::RParen {
            self.advance();
            return Ok((SyntaxNode::FunctionCall { name, args }, 1));
        }

        loop {
            let (arg, arg_height) = self.parse_expression()?;
            height = height.max(arg_height);
            args.push(arg);

            if self.current_token != Token::Comma {
                break;
            }
            self.advance();
        }

        self.expect(Token::RParen)?;

        self.node(SyntaxNode::FunctionCall { name, args }, height + 1)
    }
}

/// Convenience function to parse a single scalar expression.
pub fn parse(input: &str) -> ParseResult<SyntaxNode> {
    let mut parser = Parser::new(input);
    parser.parse()
}

/// Convenience function to parse comma-separated components.
pub fn parse_components(input: &str) -> ParseResult<Vec<SyntaxNode>> {
    let mut parser = Parser::new(input);
    parser.parse_components()
}
