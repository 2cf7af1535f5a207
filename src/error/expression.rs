//! This module contains errors produced by the symbolic expression algebra,
//! both while parsing textual operands and while folding concrete
//! subexpressions.

use thiserror::Error;

/// Errors that occur while parsing or evaluating symbolic expressions.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Mismatched parentheses in expression {text:?}")]
    MismatchedParentheses { text: String },

    #[error("Unexpected token {token:?} in expression")]
    UnexpectedToken { token: String },

    #[error("No operator to split the expression {text:?} on")]
    MissingOperator { text: String },

    #[error("Expected an operand but the expression ended")]
    MissingOperand,

    #[error("Division by zero while folding a concrete expression")]
    DivisionByZero,
}

/// The result type for the expression algebra.
pub type Result<T> = std::result::Result<T, Error>;
