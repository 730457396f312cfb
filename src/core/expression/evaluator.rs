//! Expression evaluator
//!
//! Walks a parsed AST against an [`EvalContext`]. `[Name]` references are
//! looked up in the context and resolved through the configured
//! [`MissingReferencePolicy`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::parser::{BinaryOp, Expr, UnaryOp};
use crate::config::MissingReferencePolicy;
use crate::core::context::EvalContext;

/// Why an expression produced no result
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("division by zero")]
    DivisionByZero,

    #[error("syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("reference to unknown parameter [{0}]")]
    MissingReference(String),

    #[error("parameter [{0}] has no numeric value")]
    NonNumericReference(String),

    #[error("result is not a finite number")]
    NonFinite,
}

impl EvalError {
    pub fn syntax(message: impl Into<String>, position: usize) -> Self {
        EvalError::Syntax {
            message: message.into(),
            position,
        }
    }
}

/// Evaluate an expression in the given context
pub fn evaluate(
    expr: &Expr,
    ctx: &EvalContext,
    policy: MissingReferencePolicy,
) -> Result<f64, EvalError> {
    let value = match expr {
        Expr::Number(n) => *n,

        Expr::Reference(name) => ctx.resolve(name, policy)?,

        Expr::Unary { op, operand } => {
            let v = evaluate(operand, ctx, policy)?;
            match op {
                UnaryOp::Plus => v,
                UnaryOp::Minus => -v,
            }
        }

        Expr::Binary { op, left, right } => {
            let l = evaluate(left, ctx, policy)?;
            let r = evaluate(right, ctx, policy)?;
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    l / r
                }
            }
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}
