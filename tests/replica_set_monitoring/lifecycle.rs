use std::sync::Arc;

use replset_catalog::ReplicaSetMonitorManager;

use crate::commons::fast_settings;
use crate::commons::set;
use crate::commons::wait_until;
use crate::commons::InMemoryReplicaSet;
use crate::commons::PrimaryTracker;
use crate::enable_logger;

#[test]
fn test_concurrent_callers_share_one_monitor() {
    enable_logger();
    let rs = InMemoryReplicaSet::new("rs0", "db1:27017", &["db1:27017"]);
    let manager = ReplicaSetMonitorManager::new(fast_settings(), rs);
    let cs = set("rs0", &["db1"]);

    let monitors: Vec<_> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|_| s.spawn(|| manager.get_or_create_monitor(&cs).unwrap()))
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    for monitor in &monitors {
        assert!(Arc::ptr_eq(&monitors[0], monitor));
    }

    manager.shutdown();
}

#[test]
fn test_released_monitor_winds_down() {
    enable_logger();
    let rs = InMemoryReplicaSet::new("rs0", "db1:27017", &["db1:27017"]);
    let manager = ReplicaSetMonitorManager::new(fast_settings(), rs);
    let tracker = Arc::new(PrimaryTracker::default());
    let _handle = manager.get_notifier().add_listener(tracker.clone());

    let monitor = manager.get_or_create_monitor(&set("rs0", &["db1"])).unwrap();
    assert!(wait_until(|| tracker.primary_of("rs0").is_some()));
    drop(monitor);

    // A refresh round may briefly hold the monitor; it is released afterwards
    assert!(wait_until(|| manager.get_monitor("rs0").is_none()));
    assert!(wait_until(|| tracker.dropped() == vec!["rs0".to_string()]));

    manager.shutdown();
}

#[test]
fn test_shutdown_stops_background_work_and_creation() {
    enable_logger();
    let rs = InMemoryReplicaSet::new("rs0", "db1:27017", &["db1:27017"]);
    let manager = ReplicaSetMonitorManager::new(fast_settings(), rs);

    let monitor = manager.get_or_create_monitor(&set("rs0", &["db1"])).unwrap();
    let executor = manager.get_executor().unwrap();

    manager.shutdown();
    manager.shutdown();

    assert!(manager.is_shutdown());
    assert!(executor.is_shutdown());
    let err = manager.get_or_create_monitor(&set("rs1", &["db2"])).unwrap_err();
    assert!(err.is_shutdown_in_progress());

    // Holders keep a usable monitor
    assert_eq!(monitor.name(), "rs0");
}

#[test]
fn test_remove_monitor_keeps_holder_alive() {
    enable_logger();
    let rs = InMemoryReplicaSet::new("rs0", "db1:27017", &["db1:27017"]);
    let manager = ReplicaSetMonitorManager::new(fast_settings(), rs);

    let monitor = manager.get_or_create_monitor(&set("rs0", &["db1"])).unwrap();
    manager.remove_monitor("rs0");

    assert!(manager.get_monitor("rs0").is_none());
    assert!(monitor.is_removed());
    assert_eq!(monitor.hosts().len(), 1);

    manager.shutdown();
}
