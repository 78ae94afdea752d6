//! Ambient primitives shared across the gateway: structured logging setup and a
//! redaction wrapper for secrets that might otherwise end up in a `Debug` impl or a log line.

pub mod redact;
pub mod telemetry;

pub use redact::Redacted;
pub use telemetry::{LogFormat, TelemetryConfig, init_tracing};
