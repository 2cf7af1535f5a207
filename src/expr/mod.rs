//! This module contains the definition of [`Expr`], the symbolic expression
//! tree threaded through register files, memories, observations, and path
//! conditions, together with its operator vocabulary.
//!
//! # Concrete Folding
//!
//! Expressions are kept maximally folded: evaluation (see
//! [`crate::vm::eval`]) collapses any arithmetic or comparison operator
//! whose operands are both concrete into a single [`Expr::Concrete`] node.
//! The trees stored in a configuration are therefore irreducible with
//! respect to the values known on that path.

pub mod parser;

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use serde::Serialize;

use crate::error::expression::{Error, Result};

/// A symbolic expression.
///
/// Reads of registers and memory cells that are absent from the initial
/// configuration introduce [`Expr::Symbol`] leaves rather than failing, so
/// any value can be partially concrete and partially free.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum Expr {
    /// A machine integer.
    Concrete(i64),

    /// A free variable, named after the register or cell it was read from.
    Symbol(String),

    /// An operator applied to subexpressions.
    Op { op: Operator, operands: Vec<Expr> },
}

impl Expr {
    /// Constructs a symbol from anything string-like.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Constructs the application of the binary operator `op` to `lhs` and
    /// `rhs` without folding.
    #[must_use]
    pub fn binary(op: Operator, lhs: Expr, rhs: Expr) -> Self {
        Self::Op {
            op,
            operands: vec![lhs, rhs],
        }
    }

    /// Constructs the `var(name)` marker used as the address of register
    /// store observations.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Op {
            op:       Operator::Var,
            operands: vec![Expr::Symbol(name.into())],
        }
    }

    /// Constructs the `jmp(target)` marker recorded when an unconditional
    /// jump retires.
    #[must_use]
    pub fn jump(target: i64) -> Self {
        Self::Op {
            op:       Operator::Jmp,
            operands: vec![Expr::Concrete(target)],
        }
    }

    /// Gets the machine integer held by this expression, if it is concrete.
    #[must_use]
    pub fn as_concrete(&self) -> Option<i64> {
        match self {
            Self::Concrete(value) => Some(*value),
            _ => None,
        }
    }

    /// Checks whether this expression is a concrete machine integer.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.as_concrete().is_some()
    }
}

/// Expressions display as they would be written in an operand: concrete
/// integers and symbols bare, binary operators infix and parenthesised, and
/// the trace markers in call form.
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concrete(value) => write!(f, "{value}"),
            Self::Symbol(name) => write!(f, "{name}"),
            Self::Op { op, operands } => match (op, operands.as_slice()) {
                (Operator::Var | Operator::Jmp, [only]) => write!(f, "{op}({only})"),
                (_, [lhs, rhs]) => write!(f, "({lhs} {op} {rhs})"),
                _ => write!(f, "{op}({})", operands.iter().join(", ")),
            },
        }
    }
}

/// The operators that may appear at [`Expr::Op`] nodes.
///
/// The set is closed: arithmetic and comparisons fold when concrete,
/// [`Operator::And`] chains path conditions, and [`Operator::Var`] and
/// [`Operator::Jmp`] only ever appear inside trace observations.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Var,
    Jmp,
}

impl Operator {
    /// Gets the source-level token for this operator.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Var => "var",
            Self::Jmp => "jmp",
        }
    }

    /// Checks whether this operator folds to a concrete value when both of
    /// its operands are concrete.
    #[must_use]
    pub fn is_foldable(self) -> bool {
        !matches!(self, Self::And | Self::Var | Self::Jmp)
    }

    /// Applies the operator's primitive function to two machine integers.
    ///
    /// Comparisons produce `1` for true and `0` for false. Arithmetic wraps
    /// on overflow, and division truncates toward zero.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the operator divides by zero.
    pub fn apply(self, lhs: i64, rhs: i64) -> Result<i64> {
        let result = match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div => {
                if rhs == 0 {
                    return Err(Error::DivisionByZero);
                }
                lhs.wrapping_div(rhs)
            }
            Self::Lt => i64::from(lhs < rhs),
            Self::Gt => i64::from(lhs > rhs),
            Self::Le => i64::from(lhs <= rhs),
            Self::Ge => i64::from(lhs >= rhs),
            Self::Eq => i64::from(lhs == rhs),
            Self::Ne => i64::from(lhs != rhs),
            Self::And | Self::Var | Self::Jmp => {
                unreachable!("{self:?} is not foldable; this is a programmer bug")
            }
        };

        Ok(result)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

#[cfg(test)]
mod test {
    use crate::expr::{Expr, Operator};

    #[test]
    fn displays_leaves_bare() {
        assert_eq!(Expr::Concrete(42).to_string(), "42");
        assert_eq!(Expr::Concrete(-7).to_string(), "-7");
        assert_eq!(Expr::symbol("r1").to_string(), "r1");
    }

    #[test]
    fn displays_binary_operators_infix() {
        let sum = Expr::binary(Operator::Add, Expr::symbol("r2"), Expr::Concrete(1));
        assert_eq!(sum.to_string(), "(r2 + 1)");

        let nested = Expr::binary(Operator::Eq, sum, Expr::Concrete(0));
        assert_eq!(nested.to_string(), "((r2 + 1) == 0)");
    }

    #[test]
    fn displays_trace_markers_in_call_form() {
        assert_eq!(Expr::var("r2").to_string(), "var(r2)");
        assert_eq!(Expr::jump(7).to_string(), "jmp(7)");
    }

    #[test]
    fn folds_comparisons_to_zero_or_one() {
        assert_eq!(Operator::Lt.apply(1, 2), Ok(1));
        assert_eq!(Operator::Ge.apply(1, 2), Ok(0));
        assert_eq!(Operator::Eq.apply(3, 3), Ok(1));
        assert_eq!(Operator::Ne.apply(3, 3), Ok(0));
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(Operator::Div.apply(7, 2), Ok(3));
        assert_eq!(Operator::Div.apply(-7, 2), Ok(-3));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(Operator::Div.apply(1, 0).is_err());
    }
}
