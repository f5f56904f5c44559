//! Test Specification Document
//!
//! Defines the JSON structure describing one or more test scenarios and
//! loads it from disk.

use super::validation::{validate_scenarios, ErrorLocation, ValidationError, ValidationErrorType};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default warm-up delay before the first request is issued
pub const DEFAULT_WARMUP: Duration = Duration::from_millis(1000);

/// One end-to-end scenario: a server invocation plus the responses it must produce
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TestConfig {
    /// Optional label used in logs and failure reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Executable to launch. Absolute and canonical once loaded.
    pub server_path: PathBuf,

    /// Arguments passed to the executable, in order
    pub arguments: Vec<String>,

    /// Base URL every entry's `url` is resolved against
    pub base_address: String,

    /// Expected interactions
    pub test_entries: Vec<TestEntry>,

    /// Fixed warm-up delay in milliseconds (ignored when `ready_probe` is set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmup_ms: Option<u64>,

    /// Poll the server until it answers instead of waiting a fixed delay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_probe: Option<ReadyProbe>,

    /// Per-request timeout in milliseconds; absent means wait indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

/// One expected HTTP interaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TestEntry {
    /// Path requested relative to the scenario's base address
    pub url: String,

    /// Expected HTTP status code
    pub status_code: u16,

    /// Expected body, or a pattern when `is_regex` is set
    pub content: String,

    /// Match `content` as a regular expression anywhere in the body
    pub is_regex: bool,
}

impl Default for TestEntry {
    fn default() -> Self {
        Self {
            url: String::new(),
            status_code: 200,
            content: String::new(),
            is_regex: false,
        }
    }
}

/// Readiness probe settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadyProbe {
    /// Path probed with GET; any HTTP response counts as ready
    pub path: String,

    /// Upper bound on the whole probe
    pub timeout_ms: u64,

    /// Delay before the second attempt; doubles up to one second
    pub interval_ms: u64,
}

impl Default for ReadyProbe {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            timeout_ms: 10_000,
            interval_ms: 100,
        }
    }
}

/// Scenarios loaded from a test document, with the file they came from
#[derive(Debug, Clone)]
pub struct TestPlan {
    /// Canonical path of the document
    pub source: PathBuf,

    /// Validated scenarios, in document order
    pub scenarios: Vec<TestConfig>,
}

impl TestConfig {
    /// Label used in logs and reports
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("scenario #{}", index + 1))
    }

    /// Server invocation as it would be typed in a shell
    pub fn invocation(&self) -> String {
        let mut parts = vec![self.server_path.display().to_string()];
        parts.extend(self.arguments.iter().cloned());
        parts.join(" ")
    }

    pub fn warmup(&self) -> Duration {
        self.warmup_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_WARMUP)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl TestPlan {
    /// Load and validate a test document.
    ///
    /// Fails closed: a single invalid scenario rejects the whole document.
    /// Every `server_path` is canonicalized; nothing is spawned or requested.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = tokio::fs::canonicalize(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let content = tokio::fs::read_to_string(&source)
            .await
            .map_err(|e| ConfigError::Io {
                path: source.clone(),
                source: e,
            })?;

        Self::from_json(&content, source)
    }

    /// Parse and validate a document already in memory.
    ///
    /// Relative server paths resolve against the current directory.
    pub fn from_json(content: &str, source: PathBuf) -> Result<Self, ConfigError> {
        let mut scenarios = parse_scenarios(content, &source)?;
        if scenarios.is_empty() {
            return Err(ConfigError::Empty { path: source });
        }

        let mut errors = validate_scenarios(&scenarios);

        // Only resolve paths for otherwise well-formed scenarios
        if errors.is_empty() {
            for (index, scenario) in scenarios.iter_mut().enumerate() {
                match std::fs::canonicalize(&scenario.server_path) {
                    Ok(resolved) if resolved.is_file() => scenario.server_path = resolved,
                    Ok(resolved) => errors.push(ValidationError {
                        error_type: ValidationErrorType::MissingExecutable,
                        message: format!("'{}' is not a file", resolved.display()),
                        location: ErrorLocation::field(index, "serverPath"),
                    }),
                    Err(e) => errors.push(ValidationError {
                        error_type: ValidationErrorType::MissingExecutable,
                        message: format!(
                            "'{}' cannot be resolved: {}",
                            scenario.server_path.display(),
                            e
                        ),
                        location: ErrorLocation::field(index, "serverPath"),
                    }),
                }
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::Invalid {
                path: source,
                errors,
            });
        }

        log::debug!(
            "Loaded {} scenario(s) from {}",
            scenarios.len(),
            source.display()
        );

        Ok(Self { source, scenarios })
    }
}

/// A document is a sequence of scenarios when it opens with `[`, otherwise a single one
fn parse_scenarios(content: &str, source: &Path) -> Result<Vec<TestConfig>, ConfigError> {
    let parsed = if content.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<TestConfig>>(content)
    } else {
        serde_json::from_str::<TestConfig>(content).map(|config| vec![config])
    };

    parsed.map_err(|e| {
        let field = match e.classify() {
            Category::Data => serde_json::from_str::<Value>(content)
                .ok()
                .and_then(|document| offending_field(&document)),
            _ => None,
        };
        match field {
            Some(field) => ConfigError::Shape {
                path: source.to_path_buf(),
                field,
                source: e,
            },
            None => ConfigError::Parse {
                path: source.to_path_buf(),
                source: e,
            },
        }
    })
}

/// Field path of the first value that does not fit the document schema
fn offending_field(document: &Value) -> Option<String> {
    match document {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, item)| scenario_field(item).map(|f| format!("[{}]{}", index, f))),
        item => scenario_field(item).map(|f| format!("[0]{}", f)),
    }
}

fn scenario_field(scenario: &Value) -> Option<String> {
    let Value::Object(fields) = scenario else {
        return None;
    };

    let (key, value) = fields
        .iter()
        .find(|(key, value)| TestConfig::deserialize(&single_field(key, value)).is_err())?;

    if let ("testEntries", Value::Array(entries)) = (key.as_str(), value) {
        let nested = entries.iter().enumerate().find_map(|(index, entry)| {
            entry_field(entry).map(|f| format!(".testEntries[{}]{}", index, f))
        });
        if nested.is_some() {
            return nested;
        }
    }

    Some(format!(".{}", key))
}

fn entry_field(entry: &Value) -> Option<String> {
    let Value::Object(fields) = entry else {
        return None;
    };

    fields
        .iter()
        .find(|(key, value)| TestEntry::deserialize(&single_field(key, value)).is_err())
        .map(|(key, _)| format!(".{}", key))
}

fn single_field(key: &str, value: &Value) -> Value {
    Value::Object(Map::from_iter([(key.to_string(), value.clone())]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executable() -> String {
        // The test binary itself always exists on disk
        std::env::current_exe()
            .unwrap()
            .to_string_lossy()
            .replace('\\', "\\\\")
    }

    #[test]
    fn test_single_object_document() {
        let json = format!(
            r#"{{
                "serverPath": "{}",
                "arguments": ["-p", "5000"],
                "baseAddress": "http://127.0.0.1:5000",
                "testEntries": [{{ "url": "/index.html", "content": "hello" }}]
            }}"#,
            executable()
        );

        let plan = TestPlan::from_json(&json, PathBuf::from("single.json")).unwrap();
        assert_eq!(plan.scenarios.len(), 1);

        let scenario = &plan.scenarios[0];
        assert!(scenario.server_path.is_absolute());
        assert_eq!(scenario.arguments, vec!["-p", "5000"]);
        assert_eq!(scenario.test_entries[0].status_code, 200);
        assert!(!scenario.test_entries[0].is_regex);
        assert_eq!(scenario.warmup(), DEFAULT_WARMUP);
        assert_eq!(scenario.request_timeout(), None);
    }

    #[test]
    fn test_sequence_document() {
        let json = format!(
            r#"[
                {{ "serverPath": "{0}", "baseAddress": "http://localhost:1", "testEntries": [{{ "url": "/" }}] }},
                {{ "serverPath": "{0}", "baseAddress": "http://localhost:2", "testEntries": [{{ "url": "/a", "statusCode": 404 }}],
                   "warmupMs": 10, "requestTimeoutMs": 2500, "readyProbe": {{ "path": "/health" }} }}
            ]"#,
            executable()
        );

        let plan = TestPlan::from_json(&json, PathBuf::from("many.json")).unwrap();
        assert_eq!(plan.scenarios.len(), 2);

        let second = &plan.scenarios[1];
        assert_eq!(second.test_entries[0].status_code, 404);
        assert_eq!(second.warmup(), Duration::from_millis(10));
        assert_eq!(second.request_timeout(), Some(Duration::from_millis(2500)));

        let probe = second.ready_probe.as_ref().unwrap();
        assert_eq!(probe.path, "/health");
        assert_eq!(probe.timeout_ms, 10_000);
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let result = TestPlan::from_json("[]", PathBuf::from("empty.json"));
        assert!(matches!(result, Err(ConfigError::Empty { .. })));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = TestPlan::from_json("{ invalid json }", PathBuf::from("bad.json"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));

        let result = TestPlan::from_json(r#"[5]"#, PathBuf::from("bad.json"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_wrong_field_type_is_named() {
        let cases = [
            (r#"{"testEntries": 5}"#, "[0].testEntries"),
            (r#"{"serverPath": 5, "baseAddress": "http://localhost:1"}"#, "[0].serverPath"),
            (
                r#"[{"baseAddress": "http://localhost:1"}, {"testEntries": [{"url": "/"}, {"statusCode": "ok"}]}]"#,
                "[1].testEntries[1].statusCode",
            ),
            (r#"{"readyProbe": {"timeoutMs": -1}}"#, "[0].readyProbe"),
        ];

        for (json, expected) in cases {
            match TestPlan::from_json(json, PathBuf::from("bad.json")) {
                Err(ConfigError::Shape { field, source, .. }) => {
                    assert_eq!(field, expected, "for {}", json);
                    assert!(source.line() > 0);
                }
                other => panic!("expected Shape for {}, got {:?}", json, other),
            }
        }

        let message = TestPlan::from_json(r#"{"serverPath": 5}"#, PathBuf::from("bad.json"))
            .unwrap_err()
            .to_string();
        assert!(message.contains("[0].serverPath"), "{}", message);
        assert!(message.contains("line 1 column"), "{}", message);
    }

    #[test]
    fn test_missing_executable_rejects_whole_document() {
        let json = format!(
            r#"[
                {{ "serverPath": "{}", "baseAddress": "http://localhost:1", "testEntries": [{{ "url": "/" }}] }},
                {{ "serverPath": "/definitely/not/here/server", "baseAddress": "http://localhost:2", "testEntries": [{{ "url": "/" }}] }}
            ]"#,
            executable()
        );

        match TestPlan::from_json(&json, PathBuf::from("missing.json")) {
            Err(ConfigError::Invalid { errors, .. }) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].error_type, ValidationErrorType::MissingExecutable);
                assert_eq!(errors[0].location.scenario_index, Some(1));
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_invocation_and_names() {
        let config = TestConfig {
            server_path: PathBuf::from("/usr/bin/httpserver"),
            arguments: vec!["-d".to_string(), "www".to_string()],
            ..Default::default()
        };

        assert_eq!(config.invocation(), "/usr/bin/httpserver -d www");
        assert_eq!(config.display_name(0), "scenario #1");

        let named = TestConfig {
            name: Some("listing".to_string()),
            ..config
        };
        assert_eq!(named.display_name(3), "listing");
    }
}
