use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tracing::Span;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, TelemetryConfig};

static INIT: OnceLock<()> = OnceLock::new();
static METRICS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Installs the global subscriber once; later calls only refresh the metrics switch.
pub fn init_telemetry(cfg: TelemetryConfig) -> Result<()> {
    METRICS_ENABLED.store(cfg.metrics_enabled, Ordering::SeqCst);
    if INIT.get().is_some() {
        return Ok(());
    }

    let fmt_layer = match cfg.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.default_filter.as_str()));

    // A subscriber installed by the host (or a test harness) takes precedence.
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(service = %cfg.service_name, "telemetry installed");
    }

    INIT.set(()).ok();
    Ok(())
}

pub fn telemetry_enabled() -> bool {
    METRICS_ENABLED.load(Ordering::SeqCst)
}

/// Records the identifiers shared by classification and translation spans.
pub fn with_common_fields(
    span: &Span,
    platform: &str,
    account: Option<&str>,
    msg_id: Option<&str>,
) {
    span.record("platform", tracing::field::display(platform));
    if let Some(account) = account {
        span.record("account", tracing::field::display(account));
    }
    if let Some(msg_id) = msg_id {
        span.record("msg_id", tracing::field::display(msg_id));
    }
}
