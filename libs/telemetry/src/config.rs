use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_format: LogFormat,
    /// Fallback filter when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
    /// Whether counters are forwarded to the installed `metrics` recorder.
    pub metrics_enabled: bool,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_format: LogFormat::Pretty,
            default_filter: "info".into(),
            metrics_enabled: true,
        }
    }

    pub fn from_env(default_service_name: &str) -> Self {
        let service_name = env::var("CHATWIRE_SERVICE_NAME")
            .unwrap_or_else(|_| default_service_name.to_string());
        let log_format = env::var("CHATWIRE_LOG_FORMAT")
            .map(|v| parse_log_format(&v))
            .unwrap_or(LogFormat::Pretty);
        let metrics_enabled = env::var("CHATWIRE_METRICS")
            .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Self {
            service_name,
            log_format,
            default_filter: "info".into(),
            metrics_enabled,
        }
    }
}

fn parse_log_format(value: &str) -> LogFormat {
    match value.trim().to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_defaults_to_pretty() {
        assert_eq!(parse_log_format("JSON"), LogFormat::Json);
        assert_eq!(parse_log_format("text"), LogFormat::Pretty);
        assert_eq!(parse_log_format(""), LogFormat::Pretty);
    }
}
