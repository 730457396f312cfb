//! Core calculation engine: expressions, context, resolution, classification

pub mod classifier;
pub mod context;
pub mod diagnostic;
pub mod engine;
pub mod expression;
pub mod resolver;

pub use classifier::classify;
pub use context::{build_context, EvalContext};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use engine::{recalculate, RecalcEngine, RecalcReport};
pub use expression::{evaluate_str, EvalError};
