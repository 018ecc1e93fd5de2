//! Small helpers shared across modules.

pub mod markdown;
pub mod retry;

pub use retry::RetryPolicy;
