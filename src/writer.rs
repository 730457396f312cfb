use crate::error::LabcalcResult;
use crate::parser::CaseFormat;
use crate::types::Case;
use std::fs;
use std::path::{Path, PathBuf};

/// Serialize a case in the given format
pub fn case_to_string(case: &Case, format: CaseFormat) -> LabcalcResult<String> {
    Ok(match format {
        CaseFormat::Yaml => serde_yaml::to_string(case)?,
        CaseFormat::Json => {
            let mut json = serde_json::to_string_pretty(case)?;
            json.push('\n');
            json
        }
    })
}

/// Path of the backup kept next to `path` (e.g. `case.yaml.bak`)
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Write a recalculated case back to disk.
/// An existing file is first copied to its `.bak` path.
pub fn write_case(path: &Path, case: &Case) -> LabcalcResult<()> {
    let content = case_to_string(case, CaseFormat::from_path(path))?;

    if path.exists() {
        fs::copy(path, backup_path(path))?;
    }
    fs::write(path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_case, parse_case_str};
    use crate::types::{Indicator, Parameter, Test};
    use tempfile::TempDir;

    fn sample_case() -> Case {
        let mut ldl = Parameter::calculated("LDL", "[TC] - [HDL]");
        ldl.value = Some("150.00".to_string());
        ldl.indicator = Indicator::High;
        Case {
            case_id: Some("C-7".to_string()),
            settings: None,
            tests: vec![Test::new("lipid", "Lipid Profile")
                .with_parameter(Parameter::entered("TC", "200"))
                .with_parameter(Parameter::entered("HDL", "50"))
                .with_parameter(ldl)],
        }
    }

    #[test]
    fn test_yaml_output_is_compact() {
        let yaml = case_to_string(&sample_case(), CaseFormat::Yaml).unwrap();
        assert!(yaml.contains("indicator: high"));
        assert!(!yaml.contains("settings"));
        // entered parameters carry no calculated flag or indicator
        assert_eq!(yaml.matches("is_calculated").count(), 1);
    }

    #[test]
    fn test_json_output_parses_back() {
        let case = sample_case();
        let json = case_to_string(&case, CaseFormat::Json).unwrap();
        assert_eq!(parse_case_str(&json, CaseFormat::Json).unwrap(), case);
    }

    #[test]
    fn test_write_case_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("case.yaml");
        fs::write(&path, "tests: []\n").unwrap();

        write_case(&path, &sample_case()).unwrap();

        assert_eq!(
            fs::read_to_string(backup_path(&path)).unwrap(),
            "tests: []\n"
        );
        assert_eq!(parse_case(&path).unwrap(), sample_case());
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/tmp/case.yaml")),
            PathBuf::from("/tmp/case.yaml.bak")
        );
    }
}
