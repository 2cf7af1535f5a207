//! This module contains the representation of μAsm programs: instructions
//! with dense addresses, a label map, and the resolution step that rewrites
//! label operands into address literals before execution.
//!
//! # Address Density
//!
//! Instruction addresses always start at 0 and increase by exactly one;
//! labels occupy no address of their own and instead bind a name to the
//! address of the instruction that follows them (or to one past the final
//! instruction, for trailing labels).

pub mod emitter;
pub mod parser;

use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
};

use itertools::Itertools;
use serde::Serialize;

/// A single μAsm operation: a short mnemonic together with its textual
/// operands.
///
/// Operands stay as source-level strings until an executor evaluates them;
/// an operand may be an integer literal, a register name, a label name, or
/// a small infix expression.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Opcode {
    /// The operation's mnemonic.
    pub mnemonic: String,

    /// The operands, in source order.
    pub operands: Vec<String>,
}

impl Opcode {
    /// Constructs a new opcode from the `mnemonic` and its `operands`.
    pub fn new(mnemonic: impl Into<String>, operands: &[&str]) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            operands: operands.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.operands.is_empty() {
            write!(f, "{}", self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, self.operands.iter().join(", "))
        }
    }
}

/// An opcode pinned to its address in a program.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Instruction {
    /// The instruction's address.
    pub address: u32,

    /// The operation at that address.
    pub opcode: Opcode,
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.address, self.opcode)
    }
}

/// A complete μAsm program: a densely addressed instruction sequence plus
/// the mapping from label names to addresses.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Program {
    /// The instructions, ordered by address.
    pub instructions: Vec<Instruction>,

    /// The mapping from label name to instruction address.
    pub labels: BTreeMap<String, u32>,
}

impl Program {
    /// Constructs a program from a sequence of opcodes, assigning dense
    /// addresses starting at 0 and no labels.
    #[must_use]
    pub fn from_opcodes(opcodes: Vec<Opcode>) -> Self {
        let instructions = opcodes
            .into_iter()
            .enumerate()
            .map(|(address, opcode)| Instruction {
                address: u32::try_from(address).expect("Program length exceeds u32::MAX"),
                opcode,
            })
            .collect();
        Self {
            instructions,
            labels: BTreeMap::new(),
        }
    }

    /// Adds the label `name` at `address`, consuming and returning the
    /// program for chained construction.
    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, address: u32) -> Self {
        self.labels.insert(name.into(), address);
        self
    }

    /// Gets the number of instructions in the program.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Checks whether the program contains no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Gets the instruction at `address`, if the address is in range.
    #[must_use]
    pub fn instruction_at(&self, address: u32) -> Option<&Instruction> {
        self.instructions.get(address as usize)
    }

    /// Produces a copy of the program in which every operand naming a known
    /// label has been rewritten into the decimal string of the label's
    /// address.
    ///
    /// Integer literals pass through untouched, as do identifiers that name
    /// no label (they are registers or free symbols). Executors consume
    /// programs in this resolved form, where all control-flow operands are
    /// integer literals.
    #[must_use]
    pub fn resolve_labels(&self) -> Self {
        let mut resolved = self.clone();
        for instruction in &mut resolved.instructions {
            for operand in &mut instruction.opcode.operands {
                if operand.parse::<i64>().is_ok() {
                    continue;
                }
                if let Some(address) = self.labels.get(operand.as_str()) {
                    *operand = address.to_string();
                }
            }
        }

        resolved
    }
}
