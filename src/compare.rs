//! Structural comparison of expressions, observations, traces, and
//! configurations, with human-readable diffs for test failures.
//!
//! Each function returns [`None`] when the two values are structurally
//! equal — no field is ignored — and otherwise a report pinpointing the
//! first place the values diverge, phrased as "got the actual, want the
//! expected".

use itertools::Itertools;

use crate::{
    expr::Expr,
    vm::state::{Configuration, Observation, Trace},
};

/// Compares two expressions, reporting where they diverge.
#[must_use]
pub fn expr_diff(want: &Expr, got: &Expr) -> Option<String> {
    if want == got {
        None
    } else {
        Some(format!("expression differs: got {got}, want {want}"))
    }
}

/// Compares two optional expressions (such as path conditions).
#[must_use]
pub fn optional_expr_diff(want: Option<&Expr>, got: Option<&Expr>) -> Option<String> {
    match (want, got) {
        (None, None) => None,
        (Some(want), Some(got)) => expr_diff(want, got),
        (Some(want), None) => Some(format!("expression differs: got none, want {want}")),
        (None, Some(got)) => Some(format!("expression differs: got {got}, want none")),
    }
}

/// Compares two observations field by field.
#[must_use]
pub fn observation_diff(want: &Observation, got: &Observation) -> Option<String> {
    if want == got {
        None
    } else {
        Some(format!("observation differs:\n  got  {got}\n  want {want}"))
    }
}

/// Compares two traces: observation counts, then each observation in
/// sequence, then the path conditions.
#[must_use]
pub fn trace_diff(want: &Trace, got: &Trace) -> Option<String> {
    if want.observations.len() != got.observations.len() {
        let rendered_got = got.observations.iter().join("\n    ");
        let rendered_want = want.observations.iter().join("\n    ");
        return Some(format!(
            "observation count differs: got {}, want {}\n  got:\n    {rendered_got}\n  want:\n    \
             {rendered_want}",
            got.observations.len(),
            want.observations.len(),
        ));
    }

    for (index, (want_obs, got_obs)) in
        want.observations.iter().zip(&got.observations).enumerate()
    {
        if let Some(diff) = observation_diff(want_obs, got_obs) {
            return Some(format!("at observation {index}: {diff}"));
        }
    }

    optional_expr_diff(want.path_condition.as_ref(), got.path_condition.as_ref())
        .map(|diff| format!("in the path condition: {diff}"))
}

/// Compares two configurations: program counter, registers, memory, step
/// count, and the full trace.
#[must_use]
pub fn configuration_diff(want: &Configuration, got: &Configuration) -> Option<String> {
    if want.pc != got.pc {
        return Some(format!("pc differs: got {}, want {}", got.pc, want.pc));
    }

    if want.registers != got.registers {
        let render = |conf: &Configuration| {
            conf.registers
                .iter()
                .map(|(name, value)| format!("{name} = {value}"))
                .join(", ")
        };
        return Some(format!(
            "registers differ:\n  got  {{{}}}\n  want {{{}}}",
            render(got),
            render(want),
        ));
    }

    if want.memory != got.memory {
        let render = |conf: &Configuration| {
            conf.memory
                .iter()
                .map(|(address, value)| format!("{address} = {value}"))
                .join(", ")
        };
        return Some(format!(
            "memory differs:\n  got  {{{}}}\n  want {{{}}}",
            render(got),
            render(want),
        ));
    }

    if want.step_count != got.step_count {
        return Some(format!(
            "step count differs: got {}, want {}",
            got.step_count, want.step_count
        ));
    }

    trace_diff(&want.trace, &got.trace)
}
