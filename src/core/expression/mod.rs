//! Arithmetic expressions with `[Name]` parameter references
//!
//! Formulas and reference-range bounds share this syntax:
//!
//! ```text
//! [Total Cholesterol] - [HDL] - ([Triglycerides] / 5)
//! ```
//!
//! Supported: `+ - * /`, unary `-`/`+`, parentheses, decimal literals.
//! Evaluation is fallible but never panics; every failure is an [`EvalError`].

pub mod evaluator;
pub mod parser;
pub mod tokenizer;

pub use evaluator::{evaluate, EvalError};
pub use parser::Expr;

use crate::config::MissingReferencePolicy;
use crate::core::context::EvalContext;

/// Tokenize and parse an expression
pub fn compile(expression: &str) -> Result<Expr, EvalError> {
    parser::parse(tokenizer::tokenize(expression)?)
}

/// Parse and evaluate `expression` against `ctx`
pub fn evaluate_str(
    expression: &str,
    ctx: &EvalContext,
    policy: MissingReferencePolicy,
) -> Result<f64, EvalError> {
    let expr = compile(expression)?;
    evaluate(&expr, ctx, policy)
}

/// Names referenced by `expression`, in first-occurrence order
pub fn references(expression: &str) -> Result<Vec<String>, EvalError> {
    let expr = compile(expression)?;
    Ok(expr.references().into_iter().map(str::to_string).collect())
}
