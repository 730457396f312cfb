use serde::{Deserialize, Deserializer, Serialize};

use crate::config::EngineConfig;

//==============================================================================
// Indicator
//==============================================================================

/// Classification of a parameter's value against its reference range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    /// No indicator shown (no value, or no bound resolved)
    #[default]
    None,
    Low,
    Normal,
    High,
}

impl Indicator {
    pub fn is_none(&self) -> bool {
        matches!(self, Indicator::None)
    }

    /// Short label used in reports and CLI output
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::None => "",
            Indicator::Low => "Low",
            Indicator::Normal => "Normal",
            Indicator::High => "High",
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a stored value as a finite number.
///
/// Surrounding whitespace is ignored. Text results ("Positive", "Trace"),
/// empty strings, `NaN` and infinities are not numeric.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Accept `value: 50` as well as `value: "50"` in hand-written case files.
///
/// Bare decimals are rejected: `12.50` would come back as `12.5`, and the
/// stored text is what the report shows.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Text(s)) => Ok(Some(s)),
        Some(Raw::Int(i)) => Ok(Some(i.to_string())),
        Some(Raw::Float(f)) => Err(serde::de::Error::custom(format!(
            "decimal {} must be quoted to keep its exact text, e.g. \"{}\"",
            f, f
        ))),
    }
}

//==============================================================================
// Parameter
//==============================================================================

/// A single named quantity of a lab test
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    /// Unique within its test; the key formulas refer to as `[name]`
    pub name: String,

    /// Displayed result; numeric or free text
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_calculated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Lower reference bound, itself an expression
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub range_min: Option<String>,

    /// Upper reference bound, itself an expression
    #[serde(
        default,
        deserialize_with = "text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub range_max: Option<String>,

    #[serde(default, skip_serializing_if = "Indicator::is_none")]
    pub indicator: Indicator,
}

impl Parameter {
    /// A parameter whose value is typed in by the technician
    pub fn entered(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// A parameter derived from `formula`
    pub fn calculated(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_calculated: true,
            formula: Some(formula.into()),
            ..Default::default()
        }
    }

    pub fn with_range(mut self, min: Option<&str>, max: Option<&str>) -> Self {
        self.range_min = min.map(str::to_string);
        self.range_max = max.map(str::to_string);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// The stored value as a number, if it is one
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_deref().and_then(parse_numeric)
    }

    /// Formula to evaluate, if this parameter is calculated and has one
    pub fn active_formula(&self) -> Option<&str> {
        if !self.is_calculated {
            return None;
        }
        self.formula.as_deref().filter(|f| !f.trim().is_empty())
    }

    pub fn has_range(&self) -> bool {
        self.range_min.is_some() || self.range_max.is_some()
    }
}

//==============================================================================
// Test and Case
//==============================================================================

/// A lab test: an ordered list of parameters plus identifying metadata.
///
/// Parameter order is display order; it also drives the legacy
/// list-order calculation pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub test_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Test {
    pub fn new(id: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            test_name: test_name.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Find a parameter by exact name (last one wins on duplicates,
    /// matching how the evaluation context is built)
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().rev().find(|p| p.name == name)
    }
}

/// The tests ordered for one patient visit, as stored in a case file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Case {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<EngineConfig>,
    #[serde(default)]
    pub tests: Vec<Test>,
}

impl Case {
    pub fn test(&self, id_or_name: &str) -> Option<&Test> {
        self.tests
            .iter()
            .find(|t| t.id == id_or_name)
            .or_else(|| self.tests.iter().find(|t| t.test_name == id_or_name))
    }
}
