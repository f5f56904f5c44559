pub mod process;
pub mod readiness;

pub use process::{ProcessLauncher, ServerGuard, ServerHandle, ServerLauncher, STOP_TIMEOUT};
pub use readiness::Readiness;
