//! The μAsm assembly text writer, the inverse of [`crate::assembly::parser`].
//!
//! Emitting a freshly parsed program reproduces the source text modulo
//! whitespace and comment lines.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::assembly::{parser::ASSIGN_MNEMONIC, Opcode, Program};

/// Renders the `program` as μAsm assembly text.
///
/// Labels are written on their own line immediately before the instruction
/// they address (sorted by name when several share an address), and labels
/// addressing past the final instruction are written at the end.
#[must_use]
pub fn emit(program: &Program) -> String {
    let mut labels_by_address: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for (name, address) in &program.labels {
        labels_by_address.entry(*address).or_default().push(name.as_str());
    }

    let mut out = String::new();
    for instruction in &program.instructions {
        if let Some(names) = labels_by_address.get(&instruction.address) {
            for name in names {
                out.push_str(name);
                out.push_str(":\n");
            }
        }
        out.push_str(&render(&instruction.opcode));
        out.push('\n');
    }

    // Anything addressing past the final instruction still has to appear.
    let end = u32::try_from(program.len()).expect("Program length exceeds u32::MAX");
    for (_, names) in labels_by_address.range(end..) {
        for name in names {
            out.push_str(name);
            out.push_str(":\n");
        }
    }

    out
}

/// Renders a single opcode in its source form.
fn render(opcode: &Opcode) -> String {
    if opcode.mnemonic == ASSIGN_MNEMONIC && opcode.operands.len() == 2 {
        return format!("{} <- {}", opcode.operands[0], opcode.operands[1]);
    }

    if opcode.operands.is_empty() {
        opcode.mnemonic.clone()
    } else {
        format!("{} {}", opcode.mnemonic, opcode.operands.iter().join(", "))
    }
}
