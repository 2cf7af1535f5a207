//! This module contains errors pertaining to the symbolic execution of μAsm
//! programs.

use thiserror::Error;

use crate::{error::container, expr::Expr};

/// Errors that occur during the execution of a program by the step semantics
/// or the enumerator in [`crate::vm`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("The instruction {mnemonic:?} is not part of the μAsm dialect")]
    UnsupportedInstruction { mnemonic: String },

    #[error("{mnemonic} requires {expected} operands, got {actual}")]
    WrongOperandCount {
        mnemonic: String,
        expected: usize,
        actual:   usize,
    },

    #[error("The jump target {target} does not evaluate to a concrete address")]
    JumpTargetNotConcrete { target: String },

    #[error("The jump target {value} is not a valid instruction address")]
    JumpTargetOutOfRange { value: i64 },

    #[error("The memory address {operand:?} evaluates to the non-concrete {value}")]
    AddressNotConcrete { operand: String, value: Expr },

    #[error("No value is mapped at memory address {address}")]
    AddressNotMapped { address: i64 },

    #[error("Execution exceeded the budget of {max_steps} steps")]
    StepLimitExceeded { max_steps: usize },

    /// Errors raised by the expression algebra while an operand was being
    /// parsed or evaluated, located at the instruction that supplied the
    /// operand.
    #[error(transparent)]
    Expression(#[from] crate::error::expression::Error),
}

/// An execution error with the address of the instruction that caused it.
pub type LocatedError = container::Located<Error>;

/// A container of execution errors used for aggregation during enumeration.
pub type Errors = container::Errors<LocatedError>;

/// The result type for methods that may have execution errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach instruction addresses to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, address: u32) -> Self::Located {
        container::Located {
            location: address,
            payload:  self,
        }
    }
}
