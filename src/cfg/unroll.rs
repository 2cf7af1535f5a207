//! Loop unrolling: the transformation that lets the path enumerator — which
//! has no fixpoint reasoning — terminate on programs with loops.
//!
//! The first detected loop's body is replicated a fixed number of times,
//! with the labels inside the body renamed per replica so every back edge
//! leads into the next copy instead of backwards. A synthetic
//! `jmp programEnd` closes each replica, so the final iteration's failure
//! to loop falls through cleanly off the end of the program.

use crate::{
    assembly::{Instruction, Opcode, Program},
    cfg::{loops, ControlFlowGraph},
    constant::PROGRAM_END_LABEL,
    error::unroll::{Error, Result},
};

/// Unrolls the first loop of `program` `bound` times.
///
/// Programs without loops are returned unchanged. Instruction addresses in
/// the result remain dense and start at zero, and every label — original,
/// per-replica, and `programEnd` — maps into `[0, len]`.
///
/// # Errors
///
/// Returns [`Err`] if `bound` is zero, the program is empty, or a second
/// detected loop overlaps the selected one (a nested loop, which this
/// transformation deliberately refuses to handle).
pub fn unroll(program: &Program, bound: usize) -> Result<Program> {
    if bound == 0 {
        return Err(Error::InvalidBound { bound });
    }
    if program.is_empty() {
        return Err(Error::EmptyProgram);
    }

    let cfg = ControlFlowGraph::build(program);
    let detected = loops::detect(&cfg);
    let Some(selected) = detected.first() else {
        return Ok(program.clone());
    };

    for other in &detected[1..] {
        if other.iter().any(|block| selected.contains(block)) {
            return Err(Error::NestedLoops {
                selected: selected[0],
                other:    other[0],
            });
        }
    }

    let start = cfg.blocks[selected[0]].start;
    let loop_end = cfg.blocks[*selected.last().expect("Loops are never empty")].end;
    log::debug!("unrolling the loop over addresses {start}..={loop_end} {bound} times");

    // The body is the whole instruction suffix from the loop entry,
    // terminated by a synthetic jump past the (eventual) program end.
    let end_address = u32::try_from(program.len()).expect("Program length exceeds u32::MAX");
    let mut body: Vec<Instruction> = program.instructions[start as usize..].to_vec();
    body.push(Instruction {
        address: end_address,
        opcode:  Opcode::new("jmp", &[PROGRAM_END_LABEL]),
    });
    let body_len = u32::try_from(body.len()).expect("Program length exceeds u32::MAX");

    // Labels addressing into the loop get renamed per replica; everything
    // else passes through untouched.
    let inner_labels: Vec<(String, u32)> = program
        .labels
        .iter()
        .filter(|(_, address)| (start..=loop_end).contains(*address))
        .map(|(name, address)| (name.clone(), *address))
        .collect();

    let mut unrolled = Program {
        instructions: program.instructions[..start as usize].to_vec(),
        labels: program.labels.clone(),
    };

    for replica in 0..bound {
        for (offset, template) in body.iter().enumerate() {
            let address = u32::try_from(unrolled.instructions.len())
                .expect("Program length exceeds u32::MAX");
            let original_position = start + u32::try_from(offset).expect("Body exceeds u32::MAX");

            let mut opcode = template.opcode.clone();
            for operand in &mut opcode.operands {
                let Some((_, label_address)) = inner_labels
                    .iter()
                    .find(|(name, _)| name == operand)
                else {
                    continue;
                };

                // A reference at or after its label is a back edge and must
                // lead into the next replica; a forward reference stays
                // within the current one.
                if original_position >= *label_address {
                    *operand = format!("{operand}_{replica}");
                } else if replica > 0 {
                    *operand = format!("{operand}_{}", replica - 1);
                }
            }

            unrolled.instructions.push(Instruction { address, opcode });
        }

        for (name, label_address) in &inner_labels {
            let renamed = format!("{name}_{replica}");
            let target = start
                + body_len * (u32::try_from(replica).expect("Bound exceeds u32::MAX") + 1)
                + (label_address - start);
            unrolled.labels.insert(renamed, target);
        }
    }

    let new_end = u32::try_from(unrolled.instructions.len()).expect("Program length exceeds u32::MAX");
    unrolled.labels.insert(PROGRAM_END_LABEL.to_string(), new_end);

    Ok(unrolled)
}
