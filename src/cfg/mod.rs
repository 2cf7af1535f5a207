//! This module contains the control-flow graph over μAsm programs: maximal
//! basic blocks connected by jump, branch, and fall-through edges. The
//! graph exists to serve loop detection and unrolling; it is not consulted
//! during execution.

pub mod loops;
pub mod unroll;

use std::collections::BTreeSet;

use crate::assembly::{Instruction, Program};

/// A maximal single-entry, single-exit run of instructions.
///
/// A block begins at the program start, immediately after a label, or
/// immediately after a branch or jump; it ends at a branch or jump or just
/// before the next label.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicBlock {
    /// The address of the block's first instruction.
    pub start: u32,

    /// The address of the block's last instruction.
    pub end: u32,

    /// The instructions making up the block.
    pub instructions: Vec<Instruction>,

    /// The indices of the blocks control can transfer to from here, sorted
    /// ascending.
    pub successors: Vec<usize>,
}

/// The control-flow graph of a program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ControlFlowGraph {
    /// The basic blocks, ordered by start address.
    pub blocks: Vec<BasicBlock>,
}

impl ControlFlowGraph {
    /// Builds the control-flow graph of `program`.
    ///
    /// Branch and jump targets may be label names or integer literals; a
    /// target that addresses no block start contributes no edge.
    #[must_use]
    pub fn build(program: &Program) -> Self {
        let mut blocks = partition(program);
        connect(&mut blocks, program);
        Self { blocks }
    }
}

/// Splits the program into maximal basic blocks.
fn partition(program: &Program) -> Vec<BasicBlock> {
    let label_addresses: BTreeSet<u32> = program.labels.values().copied().collect();
    let mut blocks = Vec::new();
    let mut current: Vec<Instruction> = Vec::new();

    for instruction in &program.instructions {
        if label_addresses.contains(&instruction.address) && !current.is_empty() {
            blocks.push(block_from(std::mem::take(&mut current)));
        }

        let ends_block = is_control_flow(instruction);
        current.push(instruction.clone());

        if ends_block {
            blocks.push(block_from(std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        blocks.push(block_from(current));
    }

    blocks
}

/// Wraps a non-empty instruction run into a block with no successors yet.
fn block_from(instructions: Vec<Instruction>) -> BasicBlock {
    let start = instructions.first().expect("Blocks are never empty").address;
    let end = instructions.last().expect("Blocks are never empty").address;
    BasicBlock {
        start,
        end,
        instructions,
        successors: Vec::new(),
    }
}

/// Fills in the successor edges of every block.
fn connect(blocks: &mut [BasicBlock], program: &Program) {
    let starts: Vec<u32> = blocks.iter().map(|block| block.start).collect();

    for index in 0..blocks.len() {
        let last = blocks[index]
            .instructions
            .last()
            .expect("Blocks are never empty")
            .clone();
        let mut successors = Vec::new();

        if is_control_flow(&last) {
            if let Some(target) = target_address(&last, program) {
                if let Some(successor) = starts.iter().position(|start| *start == target) {
                    successors.push(successor);
                }
            }
        }

        // Everything except an unconditional jump falls through.
        if last.opcode.mnemonic != "jmp" && index + 1 < blocks.len() {
            successors.push(index + 1);
        }

        successors.sort_unstable();
        successors.dedup();
        blocks[index].successors = successors;
    }
}

/// Checks whether an instruction transfers control explicitly.
fn is_control_flow(instruction: &Instruction) -> bool {
    matches!(instruction.opcode.mnemonic.as_str(), "jmp" | "beqz")
}

/// Resolves the control-flow target of a branch or jump: the last operand,
/// read as a label name or an address literal.
fn target_address(instruction: &Instruction, program: &Program) -> Option<u32> {
    let operand = instruction.opcode.operands.last()?;
    program
        .labels
        .get(operand.as_str())
        .copied()
        .or_else(|| operand.parse().ok())
}
