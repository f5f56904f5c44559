pub mod document;
pub mod validation;

pub use document::{ReadyProbe, TestConfig, TestEntry, TestPlan, DEFAULT_WARMUP};
pub use validation::{validate_scenarios, ErrorLocation, ValidationError, ValidationErrorType};
