use crate::config::ValidationError;
use crate::runner::FailureReport;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to launch server '{}': {source}", .path.display())]
    ProcessLaunch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Server at {url} did not become ready within {waited:?}")]
    NotReady { url: String, waited: Duration },

    #[error("Cannot resolve '{url}' against base address '{base}': {source}")]
    InvalidUrl {
        base: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    MatchFailure(Box<FailureReport>),
}

/// Errors raised while loading a test specification, before any process starts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read test config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Test config '{}' is not a valid test document: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Test config '{}' has an invalid value at {field}: {source}", .path.display())]
    Shape {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Test config '{}' contains no scenarios", .path.display())]
    Empty { path: PathBuf },

    #[error("Invalid test config '{}':\n{}", .path.display(), format_violations(.errors))]
    Invalid {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

fn format_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, TesterError>;
