//! FILENAME: parser/src/error.rs
//! PURPOSE: Error type for rejected field expressions.

use thiserror::Error;

/// Why a field expression was rejected. Always surfaced verbatim to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    #[error("Syntax error: {message}")]
    Syntax { message: String, token: Option<String> },

    #[error("Symbol not allowed: {0}")]
    DisallowedSymbol(String),

    #[error("Operator not allowed: {0}")]
    DisallowedOperator(String),

    #[error("Function not allowed: {0}")]
    DisallowedFunction(String),

    #[error("Unsupported expression construct: {description}")]
    UnsupportedConstruct { description: String, token: String },

    #[error("Field must contain exactly three components (P, Q, R), found {0}")]
    ComponentCount(usize),

    #[error("Function {function} expects {expected} argument(s), found {found}")]
    Arity {
        function: String,
        expected: String,
        found: usize,
    },
}

impl GrammarError {
    pub fn syntax(message: impl Into<String>) -> Self {
        GrammarError::Syntax {
            message: message.into(),
            token: None,
        }
    }

    pub fn syntax_at(message: impl Into<String>, token: impl Into<String>) -> Self {
        GrammarError::Syntax {
            message: message.into(),
            token: Some(token.into()),
        }
    }

    pub fn unsupported(description: impl Into<String>, token: impl Into<String>) -> Self {
        GrammarError::UnsupportedConstruct {
            description: description.into(),
            token: token.into(),
        }
    }

    /// The token that triggered the rejection, when there is one.
    pub fn offending_token(&self) -> Option<&str> {
        match self {
            GrammarError::Syntax { token, .. } => token.as_deref(),
            GrammarError::DisallowedSymbol(name)
            | GrammarError::DisallowedOperator(name)
            | GrammarError::DisallowedFunction(name) => Some(name),
            GrammarError::UnsupportedConstruct { token, .. } => Some(token),
            GrammarError::Arity { function, .. } => Some(function),
            GrammarError::ComponentCount(_) => None,
        }
    }
}
