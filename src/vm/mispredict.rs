//! The always-mispredict step semantics.
//!
//! Identical to the sequential semantics for every mnemonic except `beqz`,
//! which is forced down the branch direction a real CPU would only reach by
//! mispredicting. The successor list keeps the same condition order as
//! [`crate::vm::step::step`] — the successor whose path condition is
//! `r == 0` first — so the enumerator can pair each transient continuation
//! with the architecturally correct one when it opens a speculative frame.

use crate::{
    assembly::Instruction,
    error::execution::Result,
    expr::{Expr, Operator},
    vm::{
        state::{Configuration, Observation},
        step::{self, branch_parts, expect_operands, observe_branch, successor},
    },
};

/// Executes `instruction` on `conf`, forcing misprediction on conditional
/// branches, and reports whether the retired step entered speculation.
///
/// For a concrete `beqz` condition there is one successor taking the
/// opposite of the architectural outcome; for a symbolic condition there
/// are two, one transient continuation per assumed direction. In both
/// cases the recorded path condition and `pc` observation are those of the
/// direction actually (mis)taken. Non-branch instructions behave exactly
/// as in the sequential semantics and never speculate.
///
/// # Errors
///
/// As for [`crate::vm::step::step`]; errors abort only the offending path.
pub fn mispredict_step(
    instruction: &Instruction,
    conf: &Configuration,
) -> Result<(Vec<Configuration>, bool)> {
    if instruction.opcode.mnemonic != "beqz" {
        return step::step(instruction, conf).map(|successors| (successors, false));
    }

    expect_operands(instruction, 2)?;
    let address = instruction.address;
    let (condition, target) = branch_parts(instruction, conf)?;

    match condition.as_concrete() {
        Some(value) => {
            // The architectural direction is known, so the transient path
            // is the single opposite one.
            let mut next = successor(conf);
            let comparison = if value == 0 {
                next.pc = conf.pc + 1;
                Operator::Ne
            } else {
                next.pc = target;
                Operator::Eq
            };
            observe_branch(&mut next, address, comparison, condition);
            Ok((vec![next], true))
        }
        None => {
            // A path that assumes `r == 0` would architecturally take the
            // branch, so its transient continuation falls through; the twin
            // is symmetric.
            let assumed_taken = transient(
                conf,
                conf.pc + 1,
                Operator::Eq,
                Operator::Ne,
                &condition,
                address,
            );
            let assumed_fall_through = transient(
                conf,
                target,
                Operator::Ne,
                Operator::Eq,
                &condition,
                address,
            );

            Ok((vec![assumed_taken, assumed_fall_through], true))
        }
    }
}

/// Builds one transient continuation: the path assumes `assumed` of the
/// branch condition, while execution visibly goes the `observed` way.
fn transient(
    conf: &Configuration,
    pc: u32,
    assumed: Operator,
    observed: Operator,
    condition: &Expr,
    address: u32,
) -> Configuration {
    let mut next = successor(conf);
    next.pc = pc;
    next.trace
        .constrain(Expr::binary(assumed, condition.clone(), Expr::Concrete(0)));
    next.trace.observations.push(Observation::pc(
        address,
        Expr::binary(observed, condition.clone(), Expr::Concrete(0)),
    ));
    next
}
