//! This module contains common testing utilities for testing this library.
#![cfg(test)]
#![allow(unused)] // Not every test file uses every helper.

use transient_trace_extractor::{
    assembly::{Opcode, Program},
    compare,
    expr::{Expr, Operator},
    vm::state::{Configuration, Trace},
};

/// Builds a program from `(mnemonic, operands)` pairs with dense addresses
/// and no labels.
pub fn program(spec: &[(&str, &[&str])]) -> Program {
    Program::from_opcodes(
        spec.iter()
            .map(|(mnemonic, operands)| Opcode::new(*mnemonic, operands))
            .collect(),
    )
}

/// A concrete machine integer.
pub fn con(value: i64) -> Expr {
    Expr::Concrete(value)
}

/// A free symbol.
pub fn sym(name: &str) -> Expr {
    Expr::symbol(name)
}

/// The branch condition `value == 0`.
pub fn eq0(value: Expr) -> Expr {
    Expr::binary(Operator::Eq, value, con(0))
}

/// The branch condition `value != 0`.
pub fn ne0(value: Expr) -> Expr {
    Expr::binary(Operator::Ne, value, con(0))
}

/// The conjunction `lhs && rhs`.
pub fn and(lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(Operator::And, lhs, rhs)
}

/// The sum `lhs + rhs`.
pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(Operator::Add, lhs, rhs)
}

/// Asserts that a terminal configuration's trace matches `want`, printing
/// the structural diff on failure.
pub fn assert_trace(want: &Trace, got: &Trace) {
    if let Some(diff) = compare::trace_diff(want, got) {
        panic!("trace mismatch: {diff}");
    }
}

/// Asserts that the registers of `got` are exactly the `want` pairs.
pub fn assert_registers(want: &[(&str, Expr)], got: &Configuration) {
    let expected = want
        .iter()
        .fold(Configuration::default(), |conf, (name, value)| {
            conf.with_register(*name, value.clone())
        });
    assert_eq!(
        expected.registers, got.registers,
        "register file mismatch at pc {}",
        got.pc
    );
}
