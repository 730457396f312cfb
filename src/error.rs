use thiserror::Error;

pub type LabcalcResult<T> = Result<T, LabcalcError>;

#[derive(Error, Debug)]
pub enum LabcalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Formula evaluation error: {0}")]
    Eval(#[from] crate::core::expression::EvalError),

    #[error("Validation error: {0}")]
    Validation(String),
}
