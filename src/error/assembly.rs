//! This module contains errors pertaining to reading μAsm assembly text.

use thiserror::Error;

/// Errors that occur while parsing μAsm assembly text into a program.
///
/// These errors are located by source line, not by instruction address, as
/// they occur before any address has been assigned.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Line {line}: {text:?} is not a label, an assignment, or an instruction")]
    MalformedLine { line: usize, text: String },

    #[error("Line {line}: label name is empty")]
    EmptyLabel { line: usize },
}

/// The result type for the assembly text parser.
pub type Result<T> = std::result::Result<T, Error>;
