//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans a raw field expression and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing (including exponents like 1e-3),
//! identifiers, and the multi-character operators that the grammar rejects
//! (==, <=, &&, .* ...) so they can be reported by name.
//!
//! SUPPORTED OPERATORS:
//! - Allowed: + - * / ^ ( ) ,
//! - Recognized but disallowed: % ! = == != < <= > >= & && | || ~ ? : ' .* ./ .^

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('^') => Token::Caret,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,

            // Comparison, logical and bitwise operators: lexed whole, rejected later
            Some(ch @ ('=' | '!' | '<' | '>')) => self.read_operator(ch, &['=']),
            Some(ch @ '&') => self.read_operator(ch, &['&']),
            Some(ch @ '|') => self.read_operator(ch, &['|']),
            Some(ch @ ('%' | '~' | '?' | ':' | '\'')) => Token::Operator(ch.to_string()),

            // '.' starts a number (.5) or an element-wise operator (.*)
            Some('.') => match self.input.peek() {
                Some(ch) if ch.is_ascii_digit() => self.read_number('.'),
                Some(&ch) if matches!(ch, '*' | '/' | '^') => {
                    self.input.next();
                    Token::Operator(format!(".{}", ch))
                }
                _ => Token::Illegal('.'),
            },

            Some(ch) if ch.is_ascii_digit() => self.read_number(ch),

            Some(ch) if is_letter(ch) => self.read_identifier(ch),

            None => Token::EOF,

            // Brackets, braces, quotes, semicolons, ...
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Reads a one- or two-character operator: `first` optionally followed by
    /// one of `seconds` (e.g. `<` / `<=`, `&` / `&&`).
    fn read_operator(&mut self, first: char, seconds: &[char]) -> Token {
        let mut op = String::from(first);
        if let Some(&next) = self.input.peek() {
            if seconds.contains(&next) {
                op.push(next);
                self.input.next();
            }
        }
        Token::Operator(op)
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        // Exponent only when 'e' is followed by digits (optionally signed);
        // otherwise `2e` is the number 2 followed by the constant e.
        if matches!(self.input.peek(), Some('e' | 'E')) && self.exponent_follows() {
            if let Some(e) = self.input.next() {
                number_str.push(e);
            }
            if let Some(&sign) = self.input.peek() {
                if sign == '+' || sign == '-' {
                    number_str.push(sign);
                    self.input.next();
                }
            }
            while let Some(&ch) = self.input.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                number_str.push(ch);
                self.input.next();
            }
        }

        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Illegal(first_char),
        }
    }

    /// Looks past the 'e' currently under the cursor without consuming it.
    fn exponent_follows(&self) -> bool {
        let mut ahead = self.input.clone();
        ahead.next();
        match ahead.next() {
            Some(ch) if ch.is_ascii_digit() => true,
            Some('+' | '-') => matches!(ahead.next(), Some(ch) if ch.is_ascii_digit()),
            _ => false,
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if is_letter(ch) || ch.is_ascii_digit() {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        // Symbols are case-sensitive: `x` is a variable, `X` is not.
        Token::Identifier(ident)
    }
}

/// Returns true if `ch` can start or continue an identifier.
fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}
