//! This module contains constants that are needed throughout the codebase.

/// The default number of instructions a mispredicted branch is allowed to
/// execute transiently before the enumerator rolls the path back.
pub const DEFAULT_SPECULATIVE_WINDOW: i64 = 5;

/// The default budget for iterations of the enumerator's outer loop.
///
/// Exceeding it aborts the whole enumeration, as the budget is the only
/// guard against programs that jump in circles.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// The default number of times each loop body is replicated when unrolling.
pub const DEFAULT_UNROLL_BOUND: usize = 2;

/// The label bound to the address one past the final instruction of an
/// unrolled program.
///
/// Every replicated loop body ends in a jump to this label so that the last
/// iteration's failure to loop falls through cleanly.
pub const PROGRAM_END_LABEL: &str = "programEnd";

/// The character that introduces a comment in μAsm assembly text.
pub const COMMENT_CHAR: char = '%';
