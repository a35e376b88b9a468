//! Common errors across the qa4sm-reader crate

use itertools::Itertools;

/// Errors related to reading variables out of a validation dataset
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("The given variables {} do not match the names in the input data (missing: {})", .requested.join(", "), .missing.join(", "))]
    MissingVariables{requested: Vec<String>, missing: Vec<String>},
    #[error("Variable '{varname}' has {got} values, expected {expected} to match the index variables")]
    LengthMismatch{varname: String, got: usize, expected: usize},
    #[error("No variables found for metric '{0}'")]
    NoVariablesForMetric(String),
    #[error("No valid values of '{0}' remain after removing missing data and subsetting")]
    NoValidData(String),
    #[error("Error reading variable '{varname}': {reason}")]
    Backend{varname: String, reason: String},
}

impl DataError {
    pub(crate) fn missing<S: AsRef<str>>(requested: &[S], missing: &[&str]) -> Self {
        Self::MissingVariables {
            requested: requested.iter().map(|s| s.as_ref().to_string()).collect_vec(),
            missing: missing.iter().map(|s| s.to_string()).collect_vec(),
        }
    }
}

/// Errors from loading a metric's variables along with their metadata
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error(transparent)]
    Parse(#[from] crate::meta::ParseError),
    #[error(transparent)]
    Data(#[from] DataError),
}
