use crate::error::{LabcalcError, LabcalcResult};
use crate::types::Case;
use std::collections::HashSet;
use std::path::Path;

/// On-disk encoding of a case file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Yaml,
    Json,
}

impl CaseFormat {
    /// `.json` is JSON; anything else is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CaseFormat::Json,
            _ => CaseFormat::Yaml,
        }
    }
}

/// Parse a case file (YAML or JSON, by extension).
///
/// # Example
/// ```no_run
/// use labcalc::parser::parse_case;
/// use std::path::Path;
///
/// let case = parse_case(Path::new("case.yaml"))?;
/// println!("Tests: {}", case.tests.len());
/// # Ok::<(), labcalc::error::LabcalcError>(())
/// ```
pub fn parse_case(path: &Path) -> LabcalcResult<Case> {
    let content = std::fs::read_to_string(path)?;
    parse_case_str(&content, CaseFormat::from_path(path))
}

/// Parse case file content
pub fn parse_case_str(content: &str, format: CaseFormat) -> LabcalcResult<Case> {
    let case: Case = match format {
        CaseFormat::Yaml => serde_yaml::from_str(content)?,
        CaseFormat::Json => serde_json::from_str(content)?,
    };

    let mut seen = HashSet::new();
    for test in &case.tests {
        if test.id.trim().is_empty() {
            return Err(LabcalcError::Validation(format!(
                "Test '{}' has no id",
                test.test_name
            )));
        }
        if !seen.insert(test.id.as_str()) {
            return Err(LabcalcError::Validation(format!(
                "Duplicate test id '{}'",
                test.id
            )));
        }
    }

    Ok(case)
}

/// Template problems that do not stop a recalculation but are worth fixing
pub fn lint_case(case: &Case) -> Vec<String> {
    let mut warnings = Vec::new();

    for test in &case.tests {
        let mut names = HashSet::new();
        for param in &test.parameters {
            if param.name.trim().is_empty() {
                warnings.push(format!("{}: parameter without a name", test.id));
                continue;
            }
            if !names.insert(param.name.as_str()) {
                warnings.push(format!(
                    "{}: duplicate parameter name '{}'",
                    test.id, param.name
                ));
            }
            if param.is_calculated && param.active_formula().is_none() {
                warnings.push(format!(
                    "{}: '{}' is calculated but has no formula",
                    test.id, param.name
                ));
            }
            if !param.is_calculated && param.formula.is_some() {
                warnings.push(format!(
                    "{}: '{}' has a formula but is not calculated; the formula is ignored",
                    test.id, param.name
                ));
            }
        }
    }

    warnings
}
