//! Error types for expression compilation and evaluation

use thiserror::Error;

/// Result type for expression operations
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while compiling or evaluating an expression
#[derive(Error, Debug)]
pub enum ExprError {
    /// Expression text failed to parse
    #[error("syntax error at offset {offset} in: {text}")]
    Syntax {
        /// The full source text of the offending expression
        text: String,
        /// Byte offset of the first unparsable position
        offset: usize,
    },

    /// Well-formed but disallowed construct, or a type violation during
    /// evaluation
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// Value-level failure during evaluation or assignment
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl ExprError {
    /// Shorthand for a syntax error over `text` at `offset`
    pub fn syntax(text: impl Into<String>, offset: usize) -> Self {
        ExprError::Syntax {
            text: text.into(),
            offset,
        }
    }

    /// Render a two-line caret diagnostic for syntax errors, pointing at
    /// the offending position; `None` for the other error kinds
    #[must_use]
    pub fn caret_diagnostic(&self) -> Option<String> {
        match self {
            ExprError::Syntax { text, offset } => {
                let column = text
                    .char_indices()
                    .take_while(|(i, _)| *i < *offset)
                    .count();
                Some(format!("{text}\n{}^", " ".repeat(column)))
            }
            _ => None,
        }
    }
}
