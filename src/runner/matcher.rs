//! Response Matching
//!
//! Compares one received response against the entry that requested it.

use crate::config::TestEntry;
use regex::Regex;

/// Status and fully read body of one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub body: String,
}

impl ResponseSnapshot {
    /// Consume a response, reading its body exactly once
    pub async fn read(response: reqwest::Response) -> reqwest::Result<Self> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Self { status, body })
    }
}

/// Describe every way `response` deviates from `entry`. Empty means it passed.
///
/// Status and content are checked independently, so up to two messages are returned.
/// In pattern mode the pattern may match anywhere in the body.
pub fn compare(entry: &TestEntry, response: &ResponseSnapshot) -> Vec<String> {
    let mut mismatches = Vec::new();

    if entry.status_code != response.status {
        mismatches.push(format!(
            "Status '{}' doesn't match status '{}'",
            entry.status_code, response.status
        ));
    }

    if entry.is_regex {
        match Regex::new(&entry.content) {
            Ok(pattern) if pattern.is_match(&response.body) => {}
            Ok(_) => mismatches.push(format!("Content doesn't match regex {}", entry.content)),
            Err(e) => mismatches.push(format!("Invalid regex {}: {}", entry.content, e)),
        }
    } else if response.body != entry.content {
        mismatches.push(format!("'{}' doesn't match {}", response.body, entry.content));
    }

    mismatches
}
