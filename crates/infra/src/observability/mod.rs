//! Observability infrastructure
//!
//! Structured logging via `tracing`. Components log with structured fields
//! (`action_id`, `kind`, `retry_count`, ...) and never print directly.

pub mod logging;

pub use logging::{build_filter, init_tracing};
