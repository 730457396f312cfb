//! labcalc - lab test result calculation engine
//!
//! A test is a list of named parameters. Some are entered by a
//! technician, others are derived from an arithmetic formula over other
//! parameters (`[Total Cholesterol] - [HDL]`). Every parameter may carry
//! reference-range bounds, themselves expressions, from which a
//! Low / Normal / High indicator is derived.
//!
//! # Features
//!
//! - Recursive-descent expression evaluator with `[Name]` references
//! - Legacy single-pass list-order resolution, or opt-in dependency order
//!   with cycle reporting
//! - Range classification with expression bounds
//! - Tolerant (missing reads as 0) or strict reference handling
//! - YAML/JSON case files, a CLI and an HTTP adapter
//!
//! # Example
//!
//! ```
//! use labcalc::{Parameter, RecalcEngine, Test, Indicator};
//!
//! let test = Test::new("lipid", "Lipid Profile")
//!     .with_parameter(Parameter::entered("Total Cholesterol", "200"))
//!     .with_parameter(Parameter::entered("HDL", "50"))
//!     .with_parameter(
//!         Parameter::calculated("LDL", "[Total Cholesterol] - [HDL]")
//!             .with_range(None, Some("130")),
//!     );
//!
//! let updated = RecalcEngine::default().recalculate(&[test]);
//! let ldl = updated[0].parameter("LDL").unwrap();
//! assert_eq!(ldl.value.as_deref(), Some("150.00"));
//! assert_eq!(ldl.indicator, Indicator::High);
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use config::{EngineConfig, MissingReferencePolicy, ResolutionOrder};
pub use crate::core::{
    recalculate, Diagnostic, DiagnosticKind, EvalError, RecalcEngine, RecalcReport,
};
pub use error::{LabcalcError, LabcalcResult};
pub use types::{Case, Indicator, Parameter, Test};
