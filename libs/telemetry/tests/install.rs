use chatwire_telemetry::{
    LogFormat, TelemetryConfig, TelemetryLabels, init_telemetry, install, record_counter,
    telemetry_enabled,
};

#[test]
fn install_is_idempotent_and_counters_follow_the_switch() {
    install("chatwire-test").unwrap();
    install("chatwire-test").unwrap();
    assert!(telemetry_enabled());
    record_counter("messages_classified", 1, &TelemetryLabels::new("whatsapp"));

    let mut quiet = TelemetryConfig::new("chatwire-test");
    quiet.log_format = LogFormat::Json;
    quiet.metrics_enabled = false;
    init_telemetry(quiet).unwrap();
    assert!(!telemetry_enabled());
    record_counter("messages_classified", 1, &TelemetryLabels::new("whatsapp"));
}
