use tracing_subscriber::EnvFilter;

use crate::ConnectionString;
use crate::HostAndPort;
use crate::MonitorConfig;
use crate::ProbeReply;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

pub fn host(s: &str) -> HostAndPort {
    HostAndPort::parse(s).unwrap()
}

pub fn hosts(list: &[&str]) -> Vec<HostAndPort> {
    list.iter().map(|s| host(s)).collect()
}

pub fn set_conn_str(
    set_name: &str,
    seeds: &[&str],
) -> ConnectionString {
    ConnectionString::for_replica_set(set_name, hosts(seeds))
}

/// Monitor config with a short probe timeout so failing probes settle fast
pub fn fast_monitor_config() -> MonitorConfig {
    MonitorConfig {
        refresh_period_ms: 200,
        probe_timeout_ms: 100,
        ..Default::default()
    }
}

/// Reply of a healthy primary listing `members`
pub fn primary_reply(
    set_name: &str,
    me: &str,
    members: &[&str],
) -> ProbeReply {
    ProbeReply {
        set_name: Some(set_name.to_string()),
        is_primary: true,
        is_secondary: false,
        hosts: hosts(members),
        primary: Some(host(me)),
        ..Default::default()
    }
}

/// Reply of a healthy secondary that knows about `members` and `primary`
pub fn secondary_reply(
    set_name: &str,
    primary: Option<&str>,
    members: &[&str],
) -> ProbeReply {
    ProbeReply {
        set_name: Some(set_name.to_string()),
        is_primary: false,
        is_secondary: true,
        hosts: hosts(members),
        primary: primary.map(host),
        ..Default::default()
    }
}
