//! Test recalculation: context -> resolver -> classifier, per test
//!
//! Called by the UI or report layer after every edit. Each call is a pure
//! function of its input: the caller's tests are never mutated and
//! nothing is kept between calls.

use tracing::debug;

use crate::config::EngineConfig;
use crate::core::classifier::ResolvedRange;
use crate::core::context::EvalContext;
use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
use crate::core::expression::EvalError;
use crate::core::resolver;
use crate::types::Test;

/// Updated snapshot plus everything that went wrong along the way
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecalcReport {
    pub tests: Vec<Test>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RecalcReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics_for<'a>(
        &'a self,
        test_id: &'a str,
        parameter: &'a str,
    ) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| d.test_id == test_id && d.parameter == parameter)
    }
}

/// Recalculates calculated values and indicators for lists of tests
#[derive(Debug, Clone, Copy, Default)]
pub struct RecalcEngine {
    config: EngineConfig,
}

impl RecalcEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recalculate every test and return the refreshed copies
    pub fn recalculate(&self, tests: &[Test]) -> Vec<Test> {
        self.recalculate_with_report(tests).tests
    }

    /// Recalculate every test, keeping per-parameter diagnostics
    pub fn recalculate_with_report(&self, tests: &[Test]) -> RecalcReport {
        let mut report = RecalcReport {
            tests: Vec::with_capacity(tests.len()),
            diagnostics: Vec::new(),
        };

        for test in tests {
            let (updated, diagnostics) = self.recalculate_test(test);
            report.tests.push(updated);
            report.diagnostics.extend(diagnostics);
        }

        report
    }

    /// Recalculate a single test
    pub fn recalculate_test(&self, test: &Test) -> (Test, Vec<Diagnostic>) {
        let mut updated = test.clone();
        let mut ctx = EvalContext::from_parameters(&updated.parameters);

        let resolution = resolver::resolve(&mut updated.parameters, &mut ctx, &self.config);
        let mut issues = resolution.issues;

        for (index, param) in updated.parameters.iter_mut().enumerate() {
            // Compare the unrounded result when this pass computed one
            let value = resolution.computed[index].or_else(|| param.numeric_value());

            let range = ResolvedRange::evaluate(
                param.range_min.as_deref(),
                param.range_max.as_deref(),
                &ctx,
                self.config.missing_reference,
            );
            param.indicator = range.classify(value);

            if let Some(Err(e)) = range.min.filter(|_| value.is_some()) {
                if e != EvalError::Empty {
                    issues.push((index, DiagnosticKind::RangeMin(e)));
                }
            }
            if let Some(Err(e)) = range.max.filter(|_| value.is_some()) {
                if e != EvalError::Empty {
                    issues.push((index, DiagnosticKind::RangeMax(e)));
                }
            }
        }

        issues.sort_by_key(|(index, _)| *index);
        let diagnostics: Vec<Diagnostic> = issues
            .into_iter()
            .map(|(index, kind)| Diagnostic {
                test_id: test.id.clone(),
                parameter: updated.parameters[index].name.clone(),
                kind,
            })
            .collect();

        debug!(
            test = %test.id,
            parameters = updated.parameters.len(),
            diagnostics = diagnostics.len(),
            "recalculated test"
        );

        (updated, diagnostics)
    }
}

/// Recalculate `tests` with the given configuration
pub fn recalculate(tests: &[Test], config: &EngineConfig) -> Vec<Test> {
    RecalcEngine::new(*config).recalculate(tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Indicator, Parameter};

    fn lipid_panel() -> Test {
        Test::new("lipid", "Lipid Profile")
            .with_parameter(Parameter::entered("HDL", "50").with_range(Some("40"), None))
            .with_parameter(Parameter::entered("Total Cholesterol", "200"))
            .with_parameter(Parameter::entered("Triglycerides", "150"))
            .with_parameter(
                Parameter::calculated("LDL", "[Total Cholesterol] - [HDL] - ([Triglycerides] / 5)")
                    .with_range(None, Some("100")),
            )
    }

    #[test]
    fn test_recalculate_lipid_panel() {
        let engine = RecalcEngine::default();
        let tests = engine.recalculate(&[lipid_panel()]);
        let test = &tests[0];

        let ldl = test.parameter("LDL").unwrap();
        assert_eq!(ldl.value.as_deref(), Some("120.00"));
        assert_eq!(ldl.indicator, Indicator::High);
        assert_eq!(test.parameter("HDL").unwrap().indicator, Indicator::Normal);
        assert_eq!(
            test.parameter("Triglycerides").unwrap().indicator,
            Indicator::None
        );
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = vec![lipid_panel()];
        let before = input.clone();
        let _ = RecalcEngine::default().recalculate(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn test_classifier_uses_unrounded_value() {
        // 100.004 displays as "100.00" but is above a max of 100
        let test = Test::new("t", "T")
            .with_parameter(Parameter::entered("A", "100.004"))
            .with_parameter(Parameter::calculated("B", "[A]").with_range(None, Some("100")));
        let out = RecalcEngine::default().recalculate(&[test]);
        let b = out[0].parameter("B").unwrap();
        assert_eq!(b.value.as_deref(), Some("100.00"));
        assert_eq!(b.indicator, Indicator::High);
    }

    #[test]
    fn test_bound_errors_reported_only_with_value() {
        let test = Test::new("t", "T")
            .with_parameter(Parameter::entered("A", "5").with_range(Some("(1"), Some("")))
            .with_parameter(Parameter {
                name: "B".to_string(),
                range_min: Some("(1".to_string()),
                ..Default::default()
            });
        let report = RecalcEngine::default().recalculate_with_report(&[test]);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].parameter, "A");
        assert_eq!(
            report.diagnostics[0].kind,
            DiagnosticKind::RangeMin(EvalError::UnbalancedParentheses)
        );
    }

    #[test]
    fn test_tests_are_independent() {
        let a = Test::new("a", "A").with_parameter(Parameter::entered("X", "7"));
        let b = Test::new("b", "B").with_parameter(Parameter::calculated("Y", "[X] + 1"));
        let out = RecalcEngine::default().recalculate(&[a, b]);
        // X belongs to another test, so Y sees 0
        assert_eq!(out[1].parameters[0].value.as_deref(), Some("1.00"));
    }
}
