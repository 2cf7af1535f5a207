//! Evaluation of symbolic expressions against a configuration.
//!
//! Evaluation happens at two levels. [`evaluate_operand`] is the entry
//! point for instruction operands: it accepts the raw operand text, and its
//! identifier leaves resolve through the register file, with reads of
//! absent registers introducing free symbols instead of failing.
//! [`evaluate`] works on already-built [`Expr`] trees, where a
//! [`Expr::Symbol`] denotes a register's initial value and is therefore
//! left untouched — resolving it again would chase a register's definition
//! through its own initial value.

use crate::{
    error::expression::Result,
    expr::{parser, Expr},
    vm::state::Configuration,
};

/// Evaluates an expression against `conf`, folding every arithmetic or
/// comparison node whose operands are both concrete.
///
/// Concrete values and symbols are returned unchanged, making evaluation
/// idempotent: evaluating an already-evaluated tree produces the same tree.
///
/// # Errors
///
/// Returns [`Err`] if concrete folding divides by zero.
pub fn evaluate(expr: &Expr, conf: &Configuration) -> Result<Expr> {
    match expr {
        Expr::Concrete(_) | Expr::Symbol(_) => Ok(expr.clone()),
        Expr::Op { op, operands } => {
            let evaluated = operands
                .iter()
                .map(|operand| evaluate(operand, conf))
                .collect::<Result<Vec<_>>>()?;
            fold(*op, evaluated)
        }
    }
}

/// Evaluates the textual operand `token` against `conf`.
///
/// An integer literal becomes a [`Expr::Concrete`]; an identifier resolves
/// to the named register's current value, or to a fresh [`Expr::Symbol`]
/// when the register has never been written; any other text is parsed as an
/// infix expression whose identifier leaves resolve the same way.
///
/// # Errors
///
/// Returns [`Err`] if the operand text fails to parse or if concrete
/// folding divides by zero.
pub fn evaluate_operand(token: &str, conf: &Configuration) -> Result<Expr> {
    if let Ok(value) = token.trim().parse::<i64>() {
        return Ok(Expr::Concrete(value));
    }

    let parsed = parser::parse(token)?;
    resolve(&parsed, conf)
}

/// Resolves the identifier leaves of a freshly parsed operand tree through
/// the register file, then folds.
fn resolve(expr: &Expr, conf: &Configuration) -> Result<Expr> {
    match expr {
        Expr::Concrete(_) => Ok(expr.clone()),
        Expr::Symbol(name) => match conf.registers.get(name) {
            Some(value) => evaluate(value, conf),
            None => Ok(expr.clone()),
        },
        Expr::Op { op, operands } => {
            let resolved = operands
                .iter()
                .map(|operand| resolve(operand, conf))
                .collect::<Result<Vec<_>>>()?;
            fold(*op, resolved)
        }
    }
}

/// Rebuilds an operator node from evaluated operands, collapsing it to a
/// concrete value where the operator permits.
fn fold(op: crate::expr::Operator, operands: Vec<Expr>) -> Result<Expr> {
    if op.is_foldable() && operands.len() == 2 {
        if let (Some(lhs), Some(rhs)) = (operands[0].as_concrete(), operands[1].as_concrete()) {
            return Ok(Expr::Concrete(op.apply(lhs, rhs)?));
        }
    }

    Ok(Expr::Op { op, operands })
}

#[cfg(test)]
mod test {
    use crate::{
        error::expression::Error,
        expr::{Expr, Operator},
        vm::{
            eval::{evaluate, evaluate_operand},
            state::Configuration,
        },
    };

    #[test]
    fn integer_tokens_are_concrete() {
        let conf = Configuration::default();
        assert_eq!(evaluate_operand("42", &conf), Ok(Expr::Concrete(42)));
        assert_eq!(evaluate_operand("-3", &conf), Ok(Expr::Concrete(-3)));
    }

    #[test]
    fn unassigned_registers_become_symbols() {
        let conf = Configuration::default();
        assert_eq!(evaluate_operand("r1", &conf), Ok(Expr::symbol("r1")));
    }

    #[test]
    fn assigned_registers_resolve_to_their_value() {
        let conf = Configuration::default().with_register("x", Expr::Concrete(7));
        assert_eq!(evaluate_operand("x", &conf), Ok(Expr::Concrete(7)));
    }

    #[test]
    fn expressions_fold_through_register_values() {
        let conf = Configuration::default().with_register("x", Expr::Concrete(4));
        assert_eq!(evaluate_operand("10+x*2", &conf), Ok(Expr::Concrete(18)));
    }

    #[test]
    fn partially_concrete_expressions_stay_symbolic() {
        let conf = Configuration::default().with_register("v", Expr::Concrete(0));
        let result = evaluate_operand("v<y", &conf).expect("Evaluation errored");

        assert_eq!(
            result,
            Expr::binary(Operator::Lt, Expr::Concrete(0), Expr::symbol("y"))
        );
    }

    #[test]
    fn symbols_inside_stored_values_are_initial_values() {
        // x was previously updated from its own initial value; reading it
        // again must not chase the symbol around the loop.
        let stored = Expr::binary(Operator::Add, Expr::symbol("x"), Expr::Concrete(1));
        let conf = Configuration::default().with_register("x", stored.clone());

        assert_eq!(evaluate_operand("x", &conf), Ok(stored));
    }

    #[test]
    fn evaluation_is_idempotent_on_concrete_trees() {
        let conf = Configuration::default();
        let expr = Expr::Concrete(13);
        assert_eq!(evaluate(&expr, &conf), Ok(expr));
    }

    #[test]
    fn evaluation_is_idempotent_on_symbol_only_trees() {
        let conf = Configuration::default().with_register("a", Expr::Concrete(1));
        // Symbols denote initial values even when a register of the same
        // name has since been written.
        let expr = Expr::binary(Operator::Add, Expr::symbol("a"), Expr::symbol("b"));
        assert_eq!(evaluate(&expr, &conf), Ok(expr.clone()));
        assert_eq!(
            evaluate(&evaluate(&expr, &conf).unwrap(), &conf),
            Ok(expr)
        );
    }

    #[test]
    fn symbol_free_trees_fold_completely() {
        let conf = Configuration::default();
        let expr = Expr::binary(
            Operator::Mul,
            Expr::binary(Operator::Add, Expr::Concrete(2), Expr::Concrete(3)),
            Expr::Concrete(4),
        );
        assert_eq!(evaluate(&expr, &conf), Ok(Expr::Concrete(20)));
    }

    #[test]
    fn division_by_zero_fails() {
        let conf = Configuration::default();
        let expr = Expr::binary(Operator::Div, Expr::Concrete(1), Expr::Concrete(0));
        assert_eq!(evaluate(&expr, &conf), Err(Error::DivisionByZero));
    }

    #[test]
    fn conjunction_does_not_fold() {
        let conf = Configuration::default();
        let expr = Expr::binary(Operator::And, Expr::Concrete(1), Expr::Concrete(1));
        assert_eq!(evaluate(&expr, &conf), Ok(expr));
    }
}
