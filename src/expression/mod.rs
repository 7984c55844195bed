//! Fully-parenthesized expression evaluation.
//!
//! Expressions arrive from the evaluator service as whitespace-separated
//! tokens where every operator application sits in its own pair of
//! parentheses, e.g. `( ( 3 + 4 ) * 2 )`. Because the grouping is explicit no
//! precedence table is needed: the evaluator keeps an operand stack and an
//! operator stack and reduces whenever a group closes.
//!
//! # Operators
//!
//! | symbol | result |
//! |---|---|
//! | `+` | `a + b` |
//! | `-` | `a - b` |
//! | `*` | `a * b` |
//! | `//` | `a` divided by `b`, rounded toward negative infinity |
//! | `<<^` | `(a << 13) ^ b` |
//!
//! Integers are unbounded; the service routinely produces values wider than
//! 128 bits.
//!
//! # Example
//! ```rust
//! use exprclient::expression::{EvalError, evaluate};
//! use num_bigint::BigInt;
//!
//! assert_eq!(evaluate("( ( 3 + 4 ) * 2 )"), Ok(BigInt::from(14)));
//! assert_eq!(evaluate("( 7 // 0 )"), Err(EvalError::DivisionByZero));
//! ```
mod token;

use log::trace;
use num_bigint::BigInt;
use thiserror::Error;

pub use token::{Operator, SHIFT_XOR_BITS, Token, tokenize};

/// Reasons an expression could not be evaluated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The right operand of `//` was zero.
    #[error("division by zero")]
    DivisionByZero,

    #[error("closing parenthesis without a matching open parenthesis")]
    UnmatchedClose,

    #[error("operator '{0}' is missing an operand")]
    MissingOperand(Operator),

    #[error("expression has no value")]
    Empty,

    #[error("unbalanced expression, {operands} operands and {operators} operators left over")]
    Unbalanced { operands: usize, operators: usize },
}

impl EvalError {
    /// Whether this is an arithmetic fault the peer expects to be told about,
    /// as opposed to a malformed expression.
    pub fn is_fault(&self) -> bool {
        matches!(self, EvalError::DivisionByZero)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Open,
    Operator(Operator),
}

/// Operand and operator stacks for a single evaluation.
#[derive(Debug, Default)]
struct Stacks {
    operands: Vec<BigInt>,
    operators: Vec<Pending>,
}

impl Stacks {
    /// Pops and applies operators until an open parenthesis (left in place) or
    /// the bottom of the operator stack is reached.
    fn reduce(&mut self) -> Result<(), EvalError> {
        while let Some(&Pending::Operator(op)) = self.operators.last() {
            self.operators.pop();
            let rhs = self.operands.pop().ok_or(EvalError::MissingOperand(op))?;
            let lhs = self.operands.pop().ok_or(EvalError::MissingOperand(op))?;
            let value = op.apply(lhs, rhs)?;
            trace!("reduced '{op}' to {value}");
            self.operands.push(value);
        }

        Ok(())
    }

    fn close_group(&mut self) -> Result<(), EvalError> {
        self.reduce()?;
        match self.operators.pop() {
            Some(Pending::Open) => Ok(()),
            _ => Err(EvalError::UnmatchedClose),
        }
    }

    fn finish(mut self) -> Result<BigInt, EvalError> {
        self.reduce()?;
        if self.operators.last() == Some(&Pending::Open) {
            self.operators.pop();
        }

        let result = self.operands.pop().ok_or(EvalError::Empty)?;
        if !self.operands.is_empty() || !self.operators.is_empty() {
            return Err(EvalError::Unbalanced {
                operands: self.operands.len() + 1,
                operators: self.operators.len(),
            });
        }

        Ok(result)
    }
}

/// Evaluates a fully-parenthesized expression.
///
/// Words that are not integers, operators or parentheses are skipped. A
/// division by zero stops evaluation at once with
/// [`EvalError::DivisionByZero`].
pub fn evaluate(expression: &str) -> Result<BigInt, EvalError> {
    let mut stacks = Stacks::default();

    for token in tokenize(expression) {
        match token {
            Token::Open => stacks.operators.push(Pending::Open),
            Token::Operator(op) => stacks.operators.push(Pending::Operator(op)),
            Token::Integer(value) => stacks.operands.push(value),
            Token::Close => stacks.close_group()?,
        }
    }

    stacks.finish()
}
