//! Lightweight telemetry helpers for chatwire.
//! Provides subscriber installation, span field helpers, and counter recorders built on
//! `tracing` and the `metrics` facade.

use anyhow::Result;

mod config;
mod context;
mod counters;
mod tracing_init;

pub use config::{LogFormat, TelemetryConfig};
pub use context::TelemetryLabels;
pub use counters::record_counter;
pub use tracing_init::{init_telemetry, telemetry_enabled, with_common_fields};

/// Installs the shared subscriber configured from `RUST_LOG` and `CHATWIRE_*` variables.
pub fn install(service_name: &str) -> Result<()> {
    init_telemetry(TelemetryConfig::from_env(service_name))
}
