//! The sequential (architectural) step semantics: one instruction in, one
//! or two successor configurations out.
//!
//! Every successor is a fresh clone of the input configuration advanced by
//! one instruction; the caller must not continue using the input after the
//! call. A symbolic `beqz` condition is the only source of two successors,
//! and they are always ordered with the taken (`== 0`) successor first —
//! the always-mispredict semantics in [`crate::vm::mispredict`] enumerates
//! its successors in the same condition order, and the enumerator pairs the
//! two lists positionally when it opens speculative frames.

use crate::{
    assembly::Instruction,
    error::{
        container::Locatable,
        execution::{Error, Result},
    },
    expr::{Expr, Operator},
    vm::{
        eval,
        state::{Configuration, Observation},
    },
};

/// Executes `instruction` on `conf` under the standard semantics, returning
/// the successor configurations.
///
/// # Errors
///
/// Returns [`Err`] if the mnemonic is unknown, the operand count is wrong,
/// an operand fails to parse or evaluate, a jump target is not a concrete
/// address, or a memory access misses. The error is located at the
/// instruction's address and aborts only the path that retired it.
pub fn step(instruction: &Instruction, conf: &Configuration) -> Result<Vec<Configuration>> {
    let address = instruction.address;
    let opcode = &instruction.opcode;

    match opcode.mnemonic.as_str() {
        "mov" | "<-" => {
            expect_operands(instruction, 2)?;
            let value = evaluate_operand(&opcode.operands[1], conf, address)?;
            Ok(vec![assign(conf, address, &opcode.operands[0], value)])
        }

        "add" => {
            expect_operands(instruction, 3)?;
            let lhs = evaluate_operand(&opcode.operands[1], conf, address)?;
            let rhs = evaluate_operand(&opcode.operands[2], conf, address)?;
            let sum = Expr::binary(Operator::Add, lhs, rhs);
            let value = eval::evaluate(&sum, conf).map_err(Error::from).locate(address)?;
            Ok(vec![assign(conf, address, &opcode.operands[0], value)])
        }

        "beqz" => {
            expect_operands(instruction, 2)?;
            let (condition, target) = branch_parts(instruction, conf)?;

            match condition.as_concrete() {
                Some(value) => {
                    let mut next = successor(conf);
                    let comparison = if value == 0 {
                        next.pc = target;
                        Operator::Eq
                    } else {
                        next.pc = conf.pc + 1;
                        Operator::Ne
                    };
                    observe_branch(&mut next, address, comparison, condition);
                    Ok(vec![next])
                }
                None => {
                    let mut taken = successor(conf);
                    taken.pc = target;
                    observe_branch(&mut taken, address, Operator::Eq, condition.clone());

                    let mut fall_through = successor(conf);
                    fall_through.pc = conf.pc + 1;
                    observe_branch(&mut fall_through, address, Operator::Ne, condition);

                    Ok(vec![taken, fall_through])
                }
            }
        }

        "jmp" => {
            expect_operands(instruction, 1)?;
            let target = concrete_target(&opcode.operands[0], conf, address)?;
            let mut next = successor(conf);
            next.pc = target;
            next.trace
                .observations
                .push(Observation::pc(address, Expr::jump(i64::from(target))));
            Ok(vec![next])
        }

        "load" => {
            expect_operands(instruction, 2)?;
            let cell = memory_address(&opcode.operands[1], conf, address)?;
            let value = conf
                .memory
                .get(&cell)
                .cloned()
                .ok_or(Error::AddressNotMapped { address: cell })
                .locate(address)?;

            let mut next = successor(conf);
            next.registers.insert(opcode.operands[0].clone(), value.clone());
            next.trace.observations.push(Observation::load(address, cell, value));
            next.pc = conf.pc + 1;
            Ok(vec![next])
        }

        "store" => {
            expect_operands(instruction, 2)?;
            let value = evaluate_operand(&opcode.operands[0], conf, address)?;
            let cell = memory_address(&opcode.operands[1], conf, address)?;

            let mut next = successor(conf);
            next.memory.insert(cell, value.clone());
            next.trace
                .observations
                .push(Observation::store(address, Expr::Concrete(cell), value));
            next.pc = conf.pc + 1;
            Ok(vec![next])
        }

        "spbarr" => {
            expect_operands(instruction, 0)?;
            let mut next = successor(conf);
            next.pc = conf.pc + 1;
            Ok(vec![next])
        }

        other => Err(Error::UnsupportedInstruction {
            mnemonic: other.to_string(),
        }
        .locate(address)),
    }
}

/// Evaluates a `beqz` instruction's register and target operands.
///
/// Shared with the always-mispredict semantics so the two stay in
/// agreement about what a branch observes.
pub(crate) fn branch_parts(
    instruction: &Instruction,
    conf: &Configuration,
) -> Result<(Expr, u32)> {
    let address = instruction.address;
    let condition = evaluate_operand(&instruction.opcode.operands[0], conf, address)?;
    let target = concrete_target(&instruction.opcode.operands[1], conf, address)?;
    Ok((condition, target))
}

/// Appends the branch observation and path-condition conjunct for taking
/// the `comparison` direction of a branch on `condition`.
pub(crate) fn observe_branch(
    next: &mut Configuration,
    address: u32,
    comparison: Operator,
    condition: Expr,
) {
    let recorded = Expr::binary(comparison, condition, Expr::Concrete(0));
    next.trace.constrain(recorded.clone());
    next.trace.observations.push(Observation::pc(address, recorded));
}

/// Clones `conf` as a successor with one more retired step.
pub(crate) fn successor(conf: &Configuration) -> Configuration {
    let mut next = conf.clone();
    next.step_count += 1;
    next
}

/// Checks that the instruction carries exactly `expected` operands.
pub(crate) fn expect_operands(instruction: &Instruction, expected: usize) -> Result<()> {
    let actual = instruction.opcode.operands.len();
    if actual == expected {
        Ok(())
    } else {
        Err(Error::WrongOperandCount {
            mnemonic: instruction.opcode.mnemonic.clone(),
            expected,
            actual,
        }
        .locate(instruction.address))
    }
}

/// Evaluates an operand, locating any expression error at `address`.
pub(crate) fn evaluate_operand(token: &str, conf: &Configuration, address: u32) -> Result<Expr> {
    eval::evaluate_operand(token, conf)
        .map_err(Error::from)
        .locate(address)
}

/// Evaluates a control-flow operand down to a concrete instruction address.
fn concrete_target(token: &str, conf: &Configuration, address: u32) -> Result<u32> {
    let value = evaluate_operand(token, conf, address)?;
    let concrete = value
        .as_concrete()
        .ok_or(Error::JumpTargetNotConcrete {
            target: token.to_string(),
        })
        .locate(address)?;
    u32::try_from(concrete)
        .map_err(|_| Error::JumpTargetOutOfRange { value: concrete })
        .locate(address)
}

/// Evaluates a memory operand down to a concrete address.
fn memory_address(token: &str, conf: &Configuration, address: u32) -> Result<i64> {
    let value = evaluate_operand(token, conf, address)?;
    value
        .as_concrete()
        .ok_or(Error::AddressNotConcrete {
            operand: token.to_string(),
            value,
        })
        .locate(address)
}

/// Clones `conf`, writes `value` into the destination register, steps the
/// program counter, and records the store observation.
fn assign(conf: &Configuration, address: u32, destination: &str, value: Expr) -> Configuration {
    let mut next = successor(conf);
    next.registers.insert(destination.to_string(), value.clone());
    next.trace
        .observations
        .push(Observation::store(address, Expr::var(destination), value));
    next.pc = conf.pc + 1;
    next
}

#[cfg(test)]
mod test {
    use crate::{
        assembly::{Instruction, Opcode},
        error::execution::Error,
        expr::{Expr, Operator},
        vm::{
            state::{Configuration, Event, Observation},
            step::step,
        },
    };

    fn instruction(address: u32, mnemonic: &str, operands: &[&str]) -> Instruction {
        Instruction {
            address,
            opcode: Opcode::new(mnemonic, operands),
        }
    }

    #[test]
    fn mov_writes_the_register_and_observes_the_store() {
        let conf = Configuration::default();
        let successors = step(&instruction(0, "mov", &["y", "1"]), &conf).expect("Step errored");

        assert_eq!(successors.len(), 1);
        let next = &successors[0];
        assert_eq!(next.pc, 1);
        assert_eq!(next.step_count, 1);
        assert_eq!(next.registers.get("y"), Some(&Expr::Concrete(1)));
        assert_eq!(
            next.trace.observations,
            vec![Observation::store(0, Expr::var("y"), Expr::Concrete(1))]
        );
    }

    #[test]
    fn assignment_evaluates_its_expression_side() {
        let conf = Configuration::default().with_register("v", Expr::Concrete(0));
        let successors = step(&instruction(0, "<-", &["x", "v<y"]), &conf).expect("Step errored");

        let expected = Expr::binary(Operator::Lt, Expr::Concrete(0), Expr::symbol("y"));
        assert_eq!(successors[0].registers.get("x"), Some(&expected));
    }

    #[test]
    fn add_folds_concrete_operands() {
        let conf = Configuration::default().with_register("r1", Expr::Concrete(2));
        let successors =
            step(&instruction(0, "add", &["r1", "r1", "3"]), &conf).expect("Step errored");

        assert_eq!(successors[0].registers.get("r1"), Some(&Expr::Concrete(5)));
    }

    #[test]
    fn add_keeps_symbolic_operands_as_a_tree() {
        let conf = Configuration::default();
        let successors =
            step(&instruction(0, "add", &["r2", "r2", "1"]), &conf).expect("Step errored");

        let expected = Expr::binary(Operator::Add, Expr::symbol("r2"), Expr::Concrete(1));
        assert_eq!(successors[0].registers.get("r2"), Some(&expected));
    }

    #[test]
    fn concrete_beqz_takes_the_branch_on_zero() {
        let conf = Configuration::default().with_register("x", Expr::Concrete(0));
        let successors = step(&instruction(0, "beqz", &["x", "3"]), &conf).expect("Step errored");

        assert_eq!(successors.len(), 1);
        let next = &successors[0];
        assert_eq!(next.pc, 3);

        let condition = Expr::binary(Operator::Eq, Expr::Concrete(0), Expr::Concrete(0));
        assert_eq!(next.trace.path_condition, Some(condition.clone()));
        assert_eq!(next.trace.observations, vec![Observation::pc(0, condition)]);
    }

    #[test]
    fn concrete_beqz_falls_through_on_nonzero() {
        let conf = Configuration::default().with_register("x", Expr::Concrete(42));
        let successors = step(&instruction(0, "beqz", &["x", "3"]), &conf).expect("Step errored");

        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].pc, 1);

        let condition = Expr::binary(Operator::Ne, Expr::Concrete(42), Expr::Concrete(0));
        assert_eq!(successors[0].trace.path_condition, Some(condition));
    }

    #[test]
    fn symbolic_beqz_forks_with_the_taken_successor_first() {
        let conf = Configuration::default();
        let successors = step(&instruction(0, "beqz", &["x", "3"]), &conf).expect("Step errored");

        assert_eq!(successors.len(), 2);

        let taken = &successors[0];
        assert_eq!(taken.pc, 3);
        let eq = Expr::binary(Operator::Eq, Expr::symbol("x"), Expr::Concrete(0));
        assert_eq!(taken.trace.path_condition, Some(eq));

        let fall_through = &successors[1];
        assert_eq!(fall_through.pc, 1);
        let ne = Expr::binary(Operator::Ne, Expr::symbol("x"), Expr::Concrete(0));
        assert_eq!(fall_through.trace.path_condition, Some(ne));
    }

    #[test]
    fn beqz_requires_a_concrete_target() {
        let conf = Configuration::default();
        let result = step(&instruction(0, "beqz", &["x", "somewhere"]), &conf);

        let error = result.expect_err("Step did not error");
        assert_eq!(error.location, 0);
        assert!(matches!(error.payload, Error::JumpTargetNotConcrete { .. }));
    }

    #[test]
    fn jmp_observes_the_target() {
        let conf = Configuration::default();
        let successors = step(&instruction(2, "jmp", &["7"]), &conf).expect("Step errored");

        assert_eq!(successors[0].pc, 7);
        assert_eq!(
            successors[0].trace.observations,
            vec![Observation::pc(2, Expr::jump(7))]
        );
    }

    #[test]
    fn load_reads_mapped_memory() {
        let conf = Configuration::default()
            .with_register("v", Expr::Concrete(0))
            .with_memory(0, Expr::Concrete(9));
        let successors = step(&instruction(3, "load", &["v", "v"]), &conf).expect("Step errored");

        let next = &successors[0];
        assert_eq!(next.registers.get("v"), Some(&Expr::Concrete(9)));
        assert_eq!(
            next.trace.observations,
            vec![Observation::load(3, 0, Expr::Concrete(9))]
        );
    }

    #[test]
    fn load_fails_on_unmapped_memory() {
        let conf = Configuration::default().with_register("v", Expr::Concrete(5));
        let error = step(&instruction(0, "load", &["x", "v"]), &conf).expect_err("Step succeeded");

        assert_eq!(error.payload, Error::AddressNotMapped { address: 5 });
    }

    #[test]
    fn load_fails_on_a_symbolic_address() {
        let conf = Configuration::default();
        let error = step(&instruction(0, "load", &["x", "v"]), &conf).expect_err("Step succeeded");

        assert!(matches!(error.payload, Error::AddressNotConcrete { .. }));
    }

    #[test]
    fn store_writes_memory_and_observes_the_concrete_address() {
        let conf = Configuration::default();
        let successors =
            step(&instruction(0, "store", &["x", "4"]), &conf).expect("Step errored");

        let next = &successors[0];
        assert_eq!(next.memory.get(&4), Some(&Expr::symbol("x")));
        match &next.trace.observations[0].event {
            Event::Store { address, .. } => assert_eq!(address, &Expr::Concrete(4)),
            other => panic!("Expected a store observation, got {other:?}"),
        }
    }

    #[test]
    fn spbarr_only_advances_the_program_counter() {
        let conf = Configuration::default();
        let successors = step(&instruction(2, "spbarr", &[]), &conf).expect("Step errored");

        assert_eq!(successors[0].pc, 3);
        assert!(successors[0].trace.observations.is_empty());
    }

    #[test]
    fn unknown_mnemonics_are_unsupported() {
        let conf = Configuration::default();
        let error = step(&instruction(0, "frob", &["x"]), &conf).expect_err("Step succeeded");

        assert_eq!(
            error.payload,
            Error::UnsupportedInstruction {
                mnemonic: "frob".to_string(),
            }
        );
    }

    #[test]
    fn wrong_operand_counts_are_rejected() {
        let conf = Configuration::default();
        let error = step(&instruction(0, "mov", &["x"]), &conf).expect_err("Step succeeded");

        assert_eq!(
            error.payload,
            Error::WrongOperandCount {
                mnemonic: "mov".to_string(),
                expected: 2,
                actual:   1,
            }
        );
    }
}
