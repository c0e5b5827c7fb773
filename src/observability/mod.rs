//! Observability for spill operations
//!
//! - Structured logging (JSON lines)
//! - Operation scopes with elapsed time
//! - Monotonic counters
//!
//! Observability is read-only: nothing here changes the outcome of the
//! operation being observed.

mod logger;
mod metrics;
mod scope;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, SpillMetrics};
pub use scope::{ObservationScope, Timer};
