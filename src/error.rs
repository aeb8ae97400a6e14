use thiserror::Error;

use crate::parser::Rule;

pub type Result<T> = std::result::Result<T, ExpandError>;

/// Everything that can stop an expansion. None of these are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    /// A `"` that does not start a terminated string literal
    #[error("parse error at {line}:{column}: unexpected '\"'")]
    StrayQuote { line: usize, column: usize },

    #[error("parse error: {0}")]
    Grammar(String),

    /// Closer at the top level, or one that does not match the open structure
    #[error("parse error at {line}:{column}: unexpected '{token}'")]
    UnexpectedCloser {
        token: String,
        line: usize,
        column: usize,
    },

    /// Input ended inside the structure opened at `line:column`
    #[error("parse error: expected '{expected}', got EOF (opened at {line}:{column})")]
    Unterminated {
        expected: char,
        line: usize,
        column: usize,
    },

    #[error("parse error at {line}:{column}: nesting deeper than {limit} levels")]
    NestingTooDeep {
        limit: usize,
        line: usize,
        column: usize,
    },
}

impl From<pest::error::Error<Rule>> for ExpandError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ExpandError::Grammar(err.to_string())
    }
}
