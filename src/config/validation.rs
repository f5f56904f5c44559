//! Test Document Validation
//!
//! Checks every scenario before anything is launched and reports all
//! violations at once, each with the location it was found at.

use super::document::TestConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detailed validation error with location information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    /// Error type/category
    pub error_type: ValidationErrorType,

    /// Human-readable error message
    pub message: String,

    /// Where in the document the error was found
    pub location: ErrorLocation,
}

/// Types of validation errors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorType {
    /// Required field absent or blank
    MissingField,

    /// A scenario without test entries
    NoEntries,

    /// Base address is not an absolute URL
    InvalidUrl,

    /// `content` does not compile as a regular expression
    InvalidRegex,

    /// Server executable does not exist
    MissingExecutable,
}

/// Location information for errors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorLocation {
    /// Scenario index (0-based) if error is in a specific scenario
    pub scenario_index: Option<usize>,

    /// Field path (e.g., "[0].testEntries[2].url")
    pub field_path: String,
}

impl ErrorLocation {
    pub fn field(scenario_index: usize, field: &str) -> Self {
        Self {
            scenario_index: Some(scenario_index),
            field_path: format!("[{}].{}", scenario_index, field),
        }
    }

    pub fn entry_field(scenario_index: usize, entry_index: usize, field: &str) -> Self {
        Self {
            scenario_index: Some(scenario_index),
            field_path: format!(
                "[{}].testEntries[{}].{}",
                scenario_index, entry_index, field
            ),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location.field_path, self.message)
    }
}

/// Validate every scenario and return all violations found.
///
/// Does not touch the filesystem; executable resolution happens in the loader.
pub fn validate_scenarios(scenarios: &[TestConfig]) -> Vec<ValidationError> {
    scenarios
        .iter()
        .enumerate()
        .flat_map(|(index, scenario)| validate_scenario(index, scenario))
        .collect()
}

fn validate_scenario(index: usize, scenario: &TestConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if scenario.server_path.to_string_lossy().trim().is_empty() {
        errors.push(ValidationError {
            error_type: ValidationErrorType::MissingField,
            message: "serverPath is required".to_string(),
            location: ErrorLocation::field(index, "serverPath"),
        });
    }

    if scenario.base_address.trim().is_empty() {
        errors.push(ValidationError {
            error_type: ValidationErrorType::MissingField,
            message: "baseAddress is required".to_string(),
            location: ErrorLocation::field(index, "baseAddress"),
        });
    } else if let Err(e) = url::Url::parse(&scenario.base_address) {
        errors.push(ValidationError {
            error_type: ValidationErrorType::InvalidUrl,
            message: format!("'{}' is not an absolute URL: {}", scenario.base_address, e),
            location: ErrorLocation::field(index, "baseAddress"),
        });
    }

    if scenario.test_entries.is_empty() {
        errors.push(ValidationError {
            error_type: ValidationErrorType::NoEntries,
            message: "testEntries must contain at least one entry".to_string(),
            location: ErrorLocation::field(index, "testEntries"),
        });
    }

    for (i, entry) in scenario.test_entries.iter().enumerate() {
        if entry.url.trim().is_empty() {
            errors.push(ValidationError {
                error_type: ValidationErrorType::MissingField,
                message: "url is required".to_string(),
                location: ErrorLocation::entry_field(index, i, "url"),
            });
        }

        if entry.is_regex {
            if let Err(e) = Regex::new(&entry.content) {
                errors.push(ValidationError {
                    error_type: ValidationErrorType::InvalidRegex,
                    message: format!("'{}' is not a valid pattern: {}", entry.content, e),
                    location: ErrorLocation::entry_field(index, i, "content"),
                });
            }
        }
    }

    errors
}
