//! This module contains errors pertaining to loop unrolling.

use thiserror::Error;

/// Errors that occur while unrolling loops in a program.
///
/// These are raised before the enumerator is ever invoked, and are always
/// fatal to the transformation.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The unroll bound must be positive, got {bound}")]
    InvalidBound { bound: usize },

    #[error("Cannot unroll an empty program")]
    EmptyProgram,

    #[error("The loop at block {selected} is entangled with the loop at block {other}")]
    NestedLoops { selected: usize, other: usize },
}

/// The result type for the loop unroller.
pub type Result<T> = std::result::Result<T, Error>;
