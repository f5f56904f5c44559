//! Failure Reports
//!
//! Everything that went wrong in one scenario, rendered as a single diagnostic.

use crate::config::TestEntry;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One entry whose response deviated from expectation
#[derive(Debug, Clone, Serialize)]
pub struct EntryFailure {
    pub entry: TestEntry,
    pub mismatches: Vec<String>,
}

/// Aggregated failures for one scenario
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    /// Test document the scenario was loaded from
    pub config_path: PathBuf,

    /// Position of the scenario in the document (0-based)
    pub scenario_index: usize,

    pub scenario_name: String,

    /// Server path followed by its arguments
    pub server_invocation: String,

    pub base_address: String,

    /// Failing entries in document order
    pub failures: Vec<EntryFailure>,
}

impl FailureReport {
    /// Number of individual mismatch lines across all entries
    pub fn mismatch_count(&self) -> usize {
        self.failures.iter().map(|f| f.mismatches.len()).sum()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario '{}' failed", self.scenario_name)?;
        writeln!(f, "For config:")?;
        writeln!(f, "  - Path: {}", self.config_path.display())?;
        writeln!(f, "  - Server: {}", self.server_invocation)?;
        writeln!(f, "  - Base URL: {}", self.base_address)?;
        write!(f, "Got the following errors:")?;

        for failure in &self.failures {
            write!(f, "\n  URL: {}", failure.entry.url)?;
            for mismatch in &failure.mismatches {
                write!(f, "\n    - {}", mismatch)?;
            }
        }

        Ok(())
    }
}

/// Totals for a run in which every scenario passed
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub scenarios: usize,
    pub entries: usize,
    pub duration: Duration,
}
