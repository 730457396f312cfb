//! Reference-range classification
//!
//! Bounds are expressions evaluated against the final context of a pass,
//! so a range may depend on other parameters (age, weight, a computed
//! companion value). A bound that fails to evaluate is treated as absent
//! for its side only.

use crate::config::MissingReferencePolicy;
use crate::core::context::EvalContext;
use crate::core::expression::{evaluate_str, EvalError};
use crate::types::Indicator;

/// Both bounds after evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRange {
    pub min: Option<Result<f64, EvalError>>,
    pub max: Option<Result<f64, EvalError>>,
}

impl ResolvedRange {
    /// Evaluate whichever bounds are present
    pub fn evaluate(
        range_min: Option<&str>,
        range_max: Option<&str>,
        ctx: &EvalContext,
        policy: MissingReferencePolicy,
    ) -> Self {
        let bound = |expr: Option<&str>| expr.map(|e| evaluate_str(e, ctx, policy));
        Self {
            min: bound(range_min),
            max: bound(range_max),
        }
    }

    pub fn min_value(&self) -> Option<f64> {
        self.min.as_ref().and_then(|r| r.as_ref().ok().copied())
    }

    pub fn max_value(&self) -> Option<f64> {
        self.max.as_ref().and_then(|r| r.as_ref().ok().copied())
    }

    /// Classify an unrounded value against the bounds that resolved
    pub fn classify(&self, value: Option<f64>) -> Indicator {
        let Some(value) = value else {
            return Indicator::None;
        };

        let min = self.min_value();
        let max = self.max_value();

        match (min, max) {
            (Some(min), _) if value < min => Indicator::Low,
            (_, Some(max)) if value > max => Indicator::High,
            (None, None) => Indicator::None,
            _ => Indicator::Normal,
        }
    }
}

/// Classify `value` against `range_min`/`range_max` evaluated in `ctx`
pub fn classify(
    value: Option<f64>,
    range_min: Option<&str>,
    range_max: Option<&str>,
    ctx: &EvalContext,
    policy: MissingReferencePolicy,
) -> Indicator {
    ResolvedRange::evaluate(range_min, range_max, ctx, policy).classify(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: MissingReferencePolicy = MissingReferencePolicy::Zero;

    fn glucose(value: f64) -> Indicator {
        classify(Some(value), Some("70"), Some("110"), &EvalContext::new(), ZERO)
    }

    #[test]
    fn test_boundary_law() {
        assert_eq!(glucose(69.99), Indicator::Low);
        assert_eq!(glucose(70.0), Indicator::Normal);
        assert_eq!(glucose(95.0), Indicator::Normal);
        assert_eq!(glucose(110.0), Indicator::Normal);
        assert_eq!(glucose(110.01), Indicator::High);
        assert_eq!(glucose(250.0), Indicator::High);
    }

    #[test]
    fn test_no_value_is_none() {
        let ctx = EvalContext::new();
        assert_eq!(classify(None, Some("70"), Some("110"), &ctx, ZERO), Indicator::None);
    }

    #[test]
    fn test_min_only_never_high() {
        let ctx = EvalContext::new();
        assert_eq!(classify(Some(1e6), Some("40"), None, &ctx, ZERO), Indicator::Normal);
        assert_eq!(classify(Some(39.0), Some("40"), None, &ctx, ZERO), Indicator::Low);
    }

    #[test]
    fn test_max_only() {
        let ctx = EvalContext::new();
        assert_eq!(classify(Some(-5.0), None, Some("130"), &ctx, ZERO), Indicator::Normal);
        assert_eq!(classify(Some(131.0), None, Some("130"), &ctx, ZERO), Indicator::High);
    }

    #[test]
    fn test_no_bounds_is_none() {
        let ctx = EvalContext::new();
        assert_eq!(classify(Some(5.0), None, None, &ctx, ZERO), Indicator::None);
    }

    #[test]
    fn test_failed_bound_treated_as_absent() {
        let ctx = EvalContext::new();
        // min is malformed, max still applies
        assert_eq!(classify(Some(5.0), Some("(70"), Some("110"), &ctx, ZERO), Indicator::Normal);
        assert_eq!(classify(Some(500.0), Some("(70"), Some("110"), &ctx, ZERO), Indicator::High);
        // both malformed
        assert_eq!(classify(Some(5.0), Some("1/0"), Some("*"), &ctx, ZERO), Indicator::None);
        // empty string bound
        assert_eq!(classify(Some(5.0), Some(""), Some(""), &ctx, ZERO), Indicator::None);
    }

    #[test]
    fn test_bounds_reference_context() {
        let ctx: EvalContext = [("Age", 60.0)].into_iter().collect();
        // upper limit grows with age
        let indicator = classify(Some(25.0), Some("0"), Some("[Age] / 2"), &ctx, ZERO);
        assert_eq!(indicator, Indicator::Normal);
        let indicator = classify(Some(25.0), Some("0"), Some("[Age] / 4"), &ctx, ZERO);
        assert_eq!(indicator, Indicator::High);
    }

    #[test]
    fn test_strict_policy_drops_bound_with_missing_reference() {
        let ctx = EvalContext::new();
        let strict = MissingReferencePolicy::Error;
        assert_eq!(
            classify(Some(5.0), Some("[Age] - 100"), None, &ctx, strict),
            Indicator::None
        );
        assert_eq!(
            classify(Some(5.0), Some("[Age] - 100"), None, &ctx, ZERO),
            Indicator::Normal
        );
    }

    #[test]
    fn test_resolved_range_keeps_errors() {
        let range = ResolvedRange::evaluate(Some("1/0"), Some("10"), &EvalContext::new(), ZERO);
        assert_eq!(range.min, Some(Err(EvalError::DivisionByZero)));
        assert_eq!(range.max_value(), Some(10.0));
    }
}
