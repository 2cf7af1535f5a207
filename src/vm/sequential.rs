//! A plain, non-speculative path enumerator over the sequential step
//! semantics.
//!
//! This executor knows nothing about misprediction: it exists as a
//! reference point for what a program does architecturally, and as an
//! oracle against which the speculative machine's rolled-back end states
//! can be compared in tests.

use std::collections::VecDeque;

use crate::{
    assembly::Program,
    error::execution::Result,
    vm::{state::Configuration, step::step},
};

/// Enumerates every architectural execution path of `program` from
/// `initial`, returning the configurations of paths that ran off the end
/// of the program.
///
/// The step budget is tracked per path; a path exceeding `max_steps`
/// retired steps is silently discarded rather than reported, so a program
/// with an infinite loop on one branch still yields the terminals of its
/// other branches.
///
/// # Errors
///
/// Returns [`Err`] on the first step-level error any path encounters.
pub fn execute(
    program: &Program,
    initial: Configuration,
    max_steps: usize,
) -> Result<Vec<Configuration>> {
    let mut queue: VecDeque<Configuration> = VecDeque::new();
    queue.push_back(initial);
    let mut terminals = Vec::new();

    while let Some(current) = queue.pop_front() {
        if current.step_count >= max_steps {
            log::debug!("discarding a path after {} steps", current.step_count);
            continue;
        }

        if current.pc as usize >= program.len() {
            terminals.push(current);
            continue;
        }

        let instruction = program
            .instruction_at(current.pc)
            .expect("The program counter was bounds-checked above");
        queue.extend(step(instruction, &current)?);
    }

    Ok(terminals)
}
