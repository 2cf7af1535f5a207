//! A small parser turning textual operands such as `10+x*2`, `v<y`, or
//! `in>=bound` into [`Expr`] trees.
//!
//! Comparisons bind loosest, then additive operators, then multiplicative
//! ones; binary operators associate left and parentheses group. The parser
//! performs no name resolution: identifiers become [`Expr::Symbol`] leaves
//! for [`crate::vm::eval`] to resolve against a configuration.

use crate::{
    error::expression::{Error, Result},
    expr::{Expr, Operator},
};

/// Parses the operand `text` into an expression tree.
///
/// # Errors
///
/// Returns [`Err`] if the text contains mismatched parentheses, tokens that
/// are neither integers, identifiers, nor operators, or is otherwise not a
/// well-formed infix expression.
pub fn parse(text: &str) -> Result<Expr> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(Error::MissingOperand);
    }
    parse_tokens(&tokens, text)
}

/// A lexical token of the operand language.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    LParen,
    RParen,
    Op(Operator),
    Int(i64),
    Ident(String),
}

/// Splits `text` into tokens, rejecting characters outside the operand
/// language.
fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_ascii_whitespace() => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '+' => tokens.push(Token::Op(Operator::Add)),
            '-' => tokens.push(Token::Op(Operator::Sub)),
            '*' => tokens.push(Token::Op(Operator::Mul)),
            '/' => tokens.push(Token::Op(Operator::Div)),
            '<' | '>' | '=' | '!' => {
                let followed_by_eq = chars.peek() == Some(&'=');
                if followed_by_eq {
                    chars.next();
                }
                let op = match (c, followed_by_eq) {
                    ('<', false) => Operator::Lt,
                    ('<', true) => Operator::Le,
                    ('>', false) => Operator::Gt,
                    ('>', true) => Operator::Ge,
                    ('=', true) => Operator::Eq,
                    ('!', true) => Operator::Ne,
                    _ => {
                        return Err(Error::UnexpectedToken {
                            token: c.to_string(),
                        });
                    }
                };
                tokens.push(Token::Op(op));
            }
            c if c.is_ascii_digit() => {
                let mut literal = c.to_string();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    literal.push(*d);
                    chars.next();
                }
                let value = literal.parse().map_err(|_| Error::UnexpectedToken {
                    token: literal.clone(),
                })?;
                tokens.push(Token::Int(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = c.to_string();
                while let Some(d) = chars.peek().filter(|d| d.is_alphanumeric() || **d == '_') {
                    name.push(*d);
                    chars.next();
                }
                tokens.push(Token::Ident(name));
            }
            other => {
                return Err(Error::UnexpectedToken {
                    token: other.to_string(),
                });
            }
        }
    }

    Ok(tokens)
}

/// Recursively parses a token slice by splitting at the loosest-binding
/// operator outside any parentheses.
fn parse_tokens(tokens: &[Token], source: &str) -> Result<Expr> {
    match tokens {
        [] => Err(Error::MissingOperand),
        [Token::Int(value)] => Ok(Expr::Concrete(*value)),
        [Token::Ident(name)] => Ok(Expr::symbol(name.as_str())),
        [only] => Err(Error::UnexpectedToken {
            token: format!("{only:?}"),
        }),
        _ => {
            if wrapped_in_parens(tokens) {
                return parse_tokens(&tokens[1..tokens.len() - 1], source);
            }

            let split = split_point(tokens, source)?;
            let Token::Op(op) = &tokens[split] else {
                unreachable!("The split point is always an operator; this is a programmer bug")
            };
            let lhs = parse_tokens(&tokens[..split], source)?;
            let rhs = parse_tokens(&tokens[split + 1..], source)?;
            Ok(Expr::binary(*op, lhs, rhs))
        }
    }
}

/// Checks whether the first and last tokens are parentheses that match each
/// other, rather than closing and opening separate groups.
fn wrapped_in_parens(tokens: &[Token]) -> bool {
    if tokens.first() != Some(&Token::LParen) || tokens.last() != Some(&Token::RParen) {
        return false;
    }

    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return i == tokens.len() - 1;
                }
            }
            _ => {}
        }
    }

    false
}

/// Finds the index of the operator the expression should be split at: the
/// rightmost operator of lowest precedence outside all parentheses.
fn split_point(tokens: &[Token], source: &str) -> Result<usize> {
    let mut depth = 0i64;
    let mut best: Option<(u8, usize)> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth < 0 {
                    return Err(Error::MismatchedParentheses {
                        text: source.to_string(),
                    });
                }
            }
            Token::Op(op) if depth == 0 => {
                let prec = precedence(*op);
                if best.map_or(true, |(best_prec, _)| prec <= best_prec) {
                    best = Some((prec, i));
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(Error::MismatchedParentheses {
            text: source.to_string(),
        });
    }

    best.map(|(_, i)| i).ok_or(Error::MissingOperator {
        text: source.to_string(),
    })
}

/// The binding strength of each operator the parser accepts; larger binds
/// tighter.
fn precedence(op: Operator) -> u8 {
    match op {
        Operator::Mul | Operator::Div => 2,
        Operator::Add | Operator::Sub => 1,
        _ => 0,
    }
}
