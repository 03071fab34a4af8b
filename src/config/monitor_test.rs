use std::time::Duration;

use super::monitor::MonitorConfig;

#[test]
fn test_default_config() {
    let config = MonitorConfig::default();
    assert_eq!(config.refresh_period(), Duration::from_secs(30));
    assert_eq!(config.probe_timeout(), Duration::from_secs(5));
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_refresh_period_ms() {
    let mut config = MonitorConfig {
        probe_timeout_ms: 50,
        ..Default::default()
    };

    config.refresh_period_ms = 99;
    assert!(config.validate().is_err());

    config.refresh_period_ms = 3_600_001;
    assert!(config.validate().is_err());

    config.refresh_period_ms = 100;
    assert!(config.validate().is_ok());

    config.refresh_period_ms = 3_600_000;
    assert!(config.validate().is_ok());
}

#[test]
fn test_probe_timeout_must_fit_in_refresh_period() {
    let mut config = MonitorConfig {
        refresh_period_ms: 1000,
        ..Default::default()
    };

    config.probe_timeout_ms = 0;
    assert!(config.validate().is_err());

    config.probe_timeout_ms = 1000;
    assert!(config.validate().is_err());

    config.probe_timeout_ms = 999;
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_default_port_is_rejected() {
    let config = MonitorConfig {
        default_port: 0,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}
