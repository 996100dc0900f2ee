use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("failed to expand '{input}': {message}")]
    ExpansionFailed { input: String, message: String },

    #[error("failed to define macro '{name}': {message}")]
    DefinitionFailed { name: String, message: String },

    #[error("failed to reinitialize macro context: {message}")]
    ReinitFailed { message: String },
}

/// The oracle rejected a document.
///
/// Carries the diagnostic output captured from the oracle while it was
/// parsing, which is the only actionable detail the oracle produces.
#[derive(Error, Debug)]
#[error("failed to parse spec file:\n{stderr}")]
pub struct ParseError {
    /// Captured diagnostic output.
    pub stderr: String,
}

impl ParseError {
    pub fn new(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
        }
    }
}
