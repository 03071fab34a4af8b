use std::sync::Arc;

use replset_catalog::ReadPreference;
use replset_catalog::ReplicaSetMonitorManager;
use serde_json::Map;

use crate::commons::fast_settings;
use crate::commons::host;
use crate::commons::set;
use crate::commons::wait_until;
use crate::commons::InMemoryReplicaSet;
use crate::commons::PrimaryTracker;
use crate::enable_logger;

#[test]
fn test_background_refresh_discovers_members_and_primary() {
    enable_logger();
    let rs = InMemoryReplicaSet::new("rs0", "db2:27017", &["db1:27017", "db2:27017", "db3:27017"]);
    let manager = ReplicaSetMonitorManager::new(fast_settings(), rs.clone());
    let tracker = Arc::new(PrimaryTracker::default());
    let _handle = manager.get_notifier().add_listener(tracker.clone());

    let monitor = manager.get_or_create_monitor(&set("rs0", &["db1"])).unwrap();

    assert!(wait_until(|| tracker.primary_of("rs0") == Some(host("db2"))));
    assert!(wait_until(|| monitor.hosts().len() == 3));
    assert_eq!(monitor.select_host(ReadPreference::Primary), Some(host("db2")));
    assert_eq!(
        manager.get_notifier().current_state("rs0").unwrap().conn_str.to_string(),
        "rs0/db1:27017,db2:27017,db3:27017"
    );

    let mut report = Map::new();
    manager.report(&mut report, false);
    assert_eq!(
        report["replicaSets"]["rs0"]["hosts"].as_array().unwrap().len(),
        3
    );

    manager.shutdown();
}

#[test]
fn test_failover_is_picked_up_by_next_refresh() {
    enable_logger();
    let members = ["db1:27017", "db2:27017"];
    let rs = InMemoryReplicaSet::new("rs0", "db1:27017", &members);
    let manager = ReplicaSetMonitorManager::new(fast_settings(), rs.clone());
    let tracker = Arc::new(PrimaryTracker::default());
    let _handle = manager.get_notifier().add_listener(tracker.clone());

    let monitor = manager.get_or_create_monitor(&set("rs0", &members)).unwrap();
    assert!(wait_until(|| tracker.primary_of("rs0") == Some(host("db1"))));

    rs.elect("rs0", "db2:27017", &members);
    assert!(wait_until(|| tracker.primary_of("rs0") == Some(host("db2"))));
    assert!(wait_until(|| monitor.primary() == Some(host("db2"))));

    manager.shutdown();
}
