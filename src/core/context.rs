//! Evaluation context: parameter name -> current numeric value
//!
//! Rebuilt from a test's parameter list at the start of every pass and
//! updated in place as calculated parameters resolve. Never persisted.

use std::collections::HashMap;

use crate::config::MissingReferencePolicy;
use crate::core::expression::EvalError;
use crate::types::{parse_numeric, Parameter};

/// Name-to-value lookup used while evaluating formulas and range bounds.
///
/// A name may be present without a number (empty or text value); the
/// missing-reference policy decides what such a lookup yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    values: HashMap<String, Option<f64>>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the context for one test. Parameters with a blank name are
    /// skipped; on duplicate names the later parameter wins.
    pub fn from_parameters(parameters: &[Parameter]) -> Self {
        let mut ctx = Self::new();
        for param in parameters.iter().filter(|p| !p.name.trim().is_empty()) {
            let value = param.value.as_deref().and_then(parse_numeric);
            ctx.values.insert(param.name.clone(), value);
        }
        ctx
    }

    /// Record a freshly computed value so later formulas see it
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), Some(value));
    }

    /// Numeric value of `name`, if present and numeric
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a `[Name]` reference under `policy`
    pub fn resolve(&self, name: &str, policy: MissingReferencePolicy) -> Result<f64, EvalError> {
        match (self.values.get(name), policy) {
            (Some(Some(value)), _) => Ok(*value),
            (_, MissingReferencePolicy::Zero) => Ok(0.0),
            (None, MissingReferencePolicy::Error) => {
                Err(EvalError::MissingReference(name.to_string()))
            }
            (Some(None), MissingReferencePolicy::Error) => {
                Err(EvalError::NonNumericReference(name.to_string()))
            }
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for EvalContext {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (name, value) in iter {
            ctx.set(name, value);
        }
        ctx
    }
}

/// Build the evaluation context for a parameter list
pub fn build_context(parameters: &[Parameter]) -> EvalContext {
    EvalContext::from_parameters(parameters)
}
