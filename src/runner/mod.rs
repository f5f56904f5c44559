pub mod executor;
pub mod matcher;
pub mod report;

pub use executor::{RunOptions, TestRunner};
pub use matcher::{compare, ResponseSnapshot};
pub use report::{EntryFailure, FailureReport, RunSummary};
