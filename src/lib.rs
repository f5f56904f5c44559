pub mod config;
pub mod error;
pub mod harness;
pub mod runner;

//  Re-export commonly used items
pub use config::{
    ReadyProbe, TestConfig, TestEntry, TestPlan, ValidationError, ValidationErrorType,
};
pub use error::{ConfigError, TesterError};
pub use harness::{ProcessLauncher, Readiness, ServerGuard, ServerHandle, ServerLauncher};
pub use runner::{
    compare, EntryFailure, FailureReport, ResponseSnapshot, RunOptions, RunSummary, TestRunner,
};
