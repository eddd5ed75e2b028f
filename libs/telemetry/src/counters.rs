use metrics::Label;

use crate::context::TelemetryLabels;
use crate::tracing_init::telemetry_enabled;

fn to_labels(labels: &TelemetryLabels) -> Vec<Label> {
    labels
        .tags()
        .into_iter()
        .map(|(key, value)| Label::new(key, value))
        .collect()
}

/// Increments a counter through the `metrics` facade; a no-op until the host installs a recorder.
pub fn record_counter(name: &'static str, value: u64, labels: &TelemetryLabels) {
    if !telemetry_enabled() {
        return;
    }
    metrics::counter!(name, to_labels(labels)).increment(value);
}
