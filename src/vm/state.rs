//! This module contains the machine-state snapshot types: configurations,
//! traces, and the observations that make up a trace.
//!
//! # Ownership
//!
//! A configuration owns every part of its state. Cloning one — at a branch
//! fork, a speculative-frame open, or a rollback — produces fully
//! independent register and memory maps and an independent observation
//! list, so no write on one path can ever become visible on a sibling
//! path.

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use itertools::Itertools;
use serde::Serialize;

use crate::expr::{Expr, Operator};

/// A full machine state: program counter, register file, memory, the trace
/// accumulated so far, and the number of steps retired on the owning path.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Configuration {
    /// The program counter.
    pub pc: u32,

    /// The register file. Registers absent from the map have never been
    /// written; reading one introduces a free symbol named after it.
    pub registers: BTreeMap<String, Expr>,

    /// The memory, keyed by concrete address.
    pub memory: BTreeMap<i64, Expr>,

    /// The observations and path condition accumulated along this path.
    pub trace: Trace,

    /// The number of steps retired on this path.
    pub step_count: usize,
}

impl Configuration {
    /// Sets the register `name` to `value`, consuming and returning the
    /// configuration for chained construction.
    #[must_use]
    pub fn with_register(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.registers.insert(name.into(), value);
        self
    }

    /// Sets the memory cell at `address` to `value`, consuming and
    /// returning the configuration for chained construction.
    #[must_use]
    pub fn with_memory(mut self, address: i64, value: Expr) -> Self {
        self.memory.insert(address, value);
        self
    }
}

impl Display for Configuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pc = {}, steps = {}", self.pc, self.step_count)?;
        for (name, value) in &self.registers {
            writeln!(f, "  reg {name} = {value}")?;
        }
        for (address, value) in &self.memory {
            writeln!(f, "  mem {address} = {value}")?;
        }
        write!(f, "{}", self.trace)
    }
}

/// The observation sequence and path condition of one execution path.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Trace {
    /// The observations, in retirement order.
    pub observations: Vec<Observation>,

    /// The conjunction of the conditions under which the path's branches
    /// were taken. [`None`] is the empty condition, interpreted as true.
    pub path_condition: Option<Expr>,
}

impl Trace {
    /// Conjoins `condition` onto the path condition.
    pub fn constrain(&mut self, condition: Expr) {
        self.path_condition = Some(match self.path_condition.take() {
            None => condition,
            Some(existing) => Expr::binary(Operator::And, existing, condition),
        });
    }
}

impl Display for Trace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = self.observations.iter().join("; ");
        match &self.path_condition {
            Some(condition) => write!(f, "  trace [{rendered}] if {condition}"),
            None => write!(f, "  trace [{rendered}]"),
        }
    }
}

/// A side-channel-relevant event, stamped with the program counter of the
/// configuration it was observed at.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Observation {
    /// The program counter at the instant just before the generating step
    /// retired. Rollback observations instead carry the rollback target's
    /// program counter.
    pub pc: u32,

    /// What was observed.
    pub event: Event,
}

impl Observation {
    /// Observes a memory read of `value` at the concrete `address`.
    #[must_use]
    pub fn load(pc: u32, address: i64, value: Expr) -> Self {
        Self {
            pc,
            event: Event::Load { address, value },
        }
    }

    /// Observes a write of `value` to `address` — a memory cell, or the
    /// `var(register)` marker for register writes.
    #[must_use]
    pub fn store(pc: u32, address: Expr, value: Expr) -> Self {
        Self {
            pc,
            event: Event::Store { address, value },
        }
    }

    /// Observes a control-flow transfer decided by `condition`.
    #[must_use]
    pub fn pc(pc: u32, condition: Expr) -> Self {
        Self {
            pc,
            event: Event::Pc { condition },
        }
    }

    /// Observes the opening of the speculative frame `frame`.
    #[must_use]
    pub fn start(pc: u32, frame: usize) -> Self {
        Self {
            pc,
            event: Event::SpeculationStart { frame },
        }
    }

    /// Observes the rollback of the speculative frame `frame`.
    #[must_use]
    pub fn rollback(pc: u32, frame: usize) -> Self {
        Self {
            pc,
            event: Event::Rollback { frame },
        }
    }
}

impl Display for Observation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.event {
            Event::Load { address, value } => {
                write!(f, "load@{} {address} -> {value}", self.pc)
            }
            Event::Store { address, value } => {
                write!(f, "store@{} {address} <- {value}", self.pc)
            }
            Event::Pc { condition } => write!(f, "pc@{} {condition}", self.pc),
            Event::SpeculationStart { frame } => write!(f, "start@{} {frame}", self.pc),
            Event::Rollback { frame } => write!(f, "rollback@{} {frame}", self.pc),
            Event::Commit { frame } => write!(f, "commit@{} {frame}", self.pc),
        }
    }
}

/// The kinds of observable event.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Event {
    /// A memory read at a concrete address.
    Load { address: i64, value: Expr },

    /// A write, to a memory cell or (via the `var` marker) to a register.
    Store { address: Expr, value: Expr },

    /// A control-flow transfer, carrying the branch condition or the `jmp`
    /// marker.
    Pc { condition: Expr },

    /// The opening of a speculative frame.
    SpeculationStart { frame: usize },

    /// The rollback of a speculative frame.
    Rollback { frame: usize },

    /// The commitment of a speculative frame.
    ///
    /// Architectural agreement is modeled implicitly by restoring the saved
    /// state on window expiry, so nothing emits this today; it remains for
    /// executors that model an explicit commit pipeline.
    Commit { frame: usize },
}

#[cfg(test)]
mod test {
    use crate::{
        expr::{Expr, Operator},
        vm::state::{Configuration, Observation, Trace},
    };

    #[test]
    fn constrain_starts_with_the_bare_condition() {
        let mut trace = Trace::default();
        let condition = Expr::binary(Operator::Eq, Expr::symbol("x"), Expr::Concrete(0));
        trace.constrain(condition.clone());

        assert_eq!(trace.path_condition, Some(condition));
    }

    #[test]
    fn constrain_chains_with_conjunction() {
        let mut trace = Trace::default();
        let first = Expr::binary(Operator::Eq, Expr::symbol("x"), Expr::Concrete(0));
        let second = Expr::binary(Operator::Ne, Expr::symbol("y"), Expr::Concrete(0));
        trace.constrain(first.clone());
        trace.constrain(second.clone());

        assert_eq!(
            trace.path_condition,
            Some(Expr::binary(Operator::And, first, second))
        );
    }

    #[test]
    fn cloned_configurations_are_independent() {
        let original = Configuration::default()
            .with_register("r1", Expr::Concrete(1))
            .with_memory(0, Expr::Concrete(2));
        let mut copy = original.clone();

        copy.registers.insert("r1".to_string(), Expr::Concrete(9));
        copy.memory.insert(0, Expr::Concrete(9));
        copy.trace.observations.push(Observation::pc(0, Expr::jump(0)));

        assert_eq!(original.registers.get("r1"), Some(&Expr::Concrete(1)));
        assert_eq!(original.memory.get(&0), Some(&Expr::Concrete(2)));
        assert!(original.trace.observations.is_empty());
    }
}
