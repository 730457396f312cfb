//! Engine settings
//!
//! Settings come from three places, lowest precedence first: `Default`,
//! the optional `settings:` block of a case file, and CLI flags.

use serde::{Deserialize, Serialize};

/// What a `[Name]` reference evaluates to when `Name` has no usable number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReferencePolicy {
    /// Substitute 0 so a partially filled panel still computes
    #[default]
    Zero,
    /// Fail the expression with `MissingReference` / `NonNumericReference`
    Error,
}

/// Order in which calculated parameters of one test are evaluated
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOrder {
    /// One pass in list order. A formula that references a calculated
    /// parameter listed after it sees that parameter's previous value.
    #[default]
    #[value(name = "list")]
    ListOrder,
    /// Topological order over `[Name]` references, with cycle reporting
    Dependency,
}

/// Configuration for a recalculation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub missing_reference: MissingReferencePolicy,
    pub resolution: ResolutionOrder,
    /// Decimal places of calculated display values
    pub precision: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            missing_reference: MissingReferencePolicy::Zero,
            resolution: ResolutionOrder::ListOrder,
            precision: 2,
        }
    }
}

impl EngineConfig {
    pub fn strict() -> Self {
        Self {
            missing_reference: MissingReferencePolicy::Error,
            ..Self::default()
        }
    }

    pub fn with_resolution(mut self, resolution: ResolutionOrder) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    /// Format a calculated number for display at the configured precision
    pub fn format_value(&self, value: f64) -> String {
        format_fixed(value, self.precision)
    }
}

/// Round half away from zero to `precision` decimals and render with
/// exactly that many digits. Never renders `-0.00`.
pub fn format_fixed(value: f64, precision: u32) -> String {
    let precision = precision.min(12);
    let scale = 10f64.powi(precision as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        // Too large to scale; no fractional digits to round at this size
        return format!("{:.*}", precision as usize, value);
    }
    let mut rounded = scaled.round() / scale;
    if rounded == 0.0 {
        rounded = 0.0;
    }
    format!("{:.*}", precision as usize, rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.missing_reference, MissingReferencePolicy::Zero);
        assert_eq!(config.resolution, ResolutionOrder::ListOrder);
        assert_eq!(config.precision, 2);
    }

    #[test]
    fn test_strict_config() {
        let config = EngineConfig::strict().with_resolution(ResolutionOrder::Dependency);
        assert_eq!(config.missing_reference, MissingReferencePolicy::Error);
        assert_eq!(config.resolution, ResolutionOrder::Dependency);
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(120.0, 2), "120.00");
        assert_eq!(format_fixed(1.005_000_1, 2), "1.01");
        assert_eq!(format_fixed(2.0 / 3.0, 2), "0.67");
        assert_eq!(format_fixed(-1.234, 1), "-1.2");
        assert_eq!(format_fixed(-0.001, 2), "0.00");
        assert_eq!(format_fixed(7.5, 0), "8");
    }

    #[test]
    fn test_format_fixed_huge_values() {
        let huge = format_fixed(1e307, 2);
        assert!(huge.ends_with(".00"), "{}", huge);
        assert!(!huge.contains("inf"));
        assert!(format_fixed(-f64::MAX, 12).starts_with('-'));
    }

    #[test]
    fn test_partial_settings_from_yaml() {
        let config: EngineConfig = serde_yaml::from_str("resolution: dependency\n").unwrap();
        assert_eq!(config.resolution, ResolutionOrder::Dependency);
        assert_eq!(config.missing_reference, MissingReferencePolicy::Zero);
        assert_eq!(config.precision, 2);
    }
}
