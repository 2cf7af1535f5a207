//! This library implements a symbolic executor for μAsm — a tiny
//! register/memory assembly dialect — specialized to expose the
//! side-channel-observable behavior a program has under _speculative_
//! execution. Given a program and a partial initial machine state, it
//! enumerates every feasible execution path, including the transient paths
//! an out-of-order CPU would pursue after mispredicting a conditional
//! branch, and emits one observation trace per path. The traces are ground
//! truth against which downstream tooling can check non-interference
//! properties such as Spectre-style leakage.
//!
//! # How it Works
//!
//! From a very high level, trace extraction proceeds as follows:
//!
//! 1. Assembly text is read into an [`assembly::Program`] — densely
//!    addressed instructions plus a label map — and, when it contains
//!    loops, rewritten by [`cfg::unroll`] into a loop-free program that
//!    replicates each loop body a bounded number of times.
//! 2. Label operands are resolved to address literals with
//!    [`assembly::Program::resolve_labels`].
//! 3. The [`vm::VM`] explores the program as a worklist of execution
//!    paths. Conditional branches are always mispredicted: each branch
//!    opens a speculative frame holding the saved pre-branch state, the
//!    transient continuation runs for a bounded window of instructions,
//!    and the path is then rolled back to the architecturally correct
//!    successor with the transient observations kept in its trace.
//! 4. Each path that runs off the end of the program yields a terminal
//!    [`vm::state::Configuration`]: final registers and memory, the
//!    ordered observations, and the accumulated path condition.
//!
//! Path conditions are recorded, never solved; deciding their feasibility
//! is left to external tooling.
//!
//! # Basic Usage
//!
//! ```
//! use transient_trace_extractor::{
//!     assembly::{Opcode, Program},
//!     vm::{state::Configuration, Config, VM},
//! };
//!
//! // beqz r1, 3 ; add r2, r2, 1 ; add r3, r3, 1
//! let program = Program::from_opcodes(vec![
//!     Opcode::new("beqz", &["r1", "3"]),
//!     Opcode::new("add", &["r2", "r2", "1"]),
//!     Opcode::new("add", &["r3", "r3", "1"]),
//! ]);
//!
//! let mut vm = VM::new(program, Configuration::default(), Config::default());
//! vm.execute().expect("enumeration failed");
//!
//! // One terminal per assumed direction of the symbolic branch, each
//! // carrying the observations made while the branch was mispredicted.
//! let result = vm.consume();
//! assert_eq!(result.terminals.len(), 2);
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod assembly;
pub mod cfg;
pub mod compare;
pub mod constant;
pub mod error;
pub mod expr;
pub mod vm;

use error::container::Locatable;

// Re-exports to provide the library interface.
pub use cfg::unroll::unroll;
pub use expr::Expr;
pub use vm::{Config, ExecutionResult, VM};

/// Extracts the observation traces of the μAsm program in `source`: parses
/// it, unrolls its first loop `unroll_bound` times, resolves labels, and
/// enumerates every execution path from `initial` under always-mispredict
/// speculation.
///
/// This is the convenience front door; the individual stages are all public
/// for callers that need to intervene between them.
///
/// # Errors
///
/// Returns [`Err`] if the source fails to parse (located at the offending
/// source line), if unrolling fails (located at address 0, as the
/// transformation concerns the whole program), or if enumeration fails as
/// described on [`VM::execute`].
pub fn extract(
    source: &str,
    unroll_bound: usize,
    initial: vm::state::Configuration,
    config: Config,
) -> error::Result<ExecutionResult> {
    let program = assembly::parser::parse(source).map_err(|e| {
        let line = match e {
            error::assembly::Error::MalformedLine { line, .. }
            | error::assembly::Error::EmptyLabel { line } => line,
        };
        let line = u32::try_from(line).unwrap_or(u32::MAX);
        error::Error::from(e).locate(line)
    })?;

    let unrolled = unroll(&program, unroll_bound).map_err(|e| error::Error::from(e).locate(0))?;
    let resolved = unrolled.resolve_labels();

    let mut vm = VM::new(resolved, initial, config);
    match vm.execute() {
        Ok(()) => Ok(vm.consume()),
        Err(errors) => Err(errors.into()),
    }
}
