use chrono::Duration;
use gbs_runtime::{recover_device_status, OnlineRegistry};
use gbs_schemas::OnlineStatus;
use gbs_testkit::{device, fixed_now, MemoryStore, StoreFailures};

fn ttl() -> Duration {
    Duration::seconds(180)
}

#[tokio::test]
async fn stale_device_goes_offline_fresh_device_registers_off_device_untouched() {
    let now = fixed_now();
    let store = MemoryStore::new();
    store.insert_device(device("D1", OnlineStatus::On, now - ttl() - Duration::seconds(1)));
    store.insert_device(device("D2", OnlineStatus::On, now - ttl() / 2));
    store.insert_device(device("D3", OnlineStatus::Off, now - Duration::days(3)));
    let online = OnlineRegistry::new();

    let report = recover_device_status(&store, &online, now, ttl())
        .await
        .expect("devices loaded");

    assert_eq!(report.inspected, 3);
    assert_eq!(report.online, 1);
    assert_eq!(report.expired, vec!["D1".to_string()]);
    assert!(!report.offline_write_failed);

    // exactly one bulk write, exactly the expired set
    assert_eq!(store.offline_batches(), vec![vec!["D1".to_string()]]);

    assert_eq!(online.device_ids(), vec!["D2".to_string()]);
    assert_eq!(online.last_heartbeat("D2"), Some(now - ttl() / 2));

    assert_eq!(store.device("D1").unwrap().status, OnlineStatus::Off);
    assert_eq!(store.device("D2").unwrap().status, OnlineStatus::On);
    assert_eq!(store.device("D3").unwrap().status, OnlineStatus::Off);
}

#[tokio::test]
async fn nothing_expired_means_no_bulk_write() {
    let now = fixed_now();
    let store = MemoryStore::new();
    store.insert_device(device("D2", OnlineStatus::On, now));
    let online = OnlineRegistry::new();

    let report = recover_device_status(&store, &online, now, ttl()).await.unwrap();
    assert!(report.expired.is_empty());
    assert!(store.offline_batches().is_empty());
    assert!(online.contains("D2"));
}

#[tokio::test]
async fn load_failure_skips_phase_without_registering() {
    let now = fixed_now();
    let store = MemoryStore::new();
    store.insert_device(device("D2", OnlineStatus::On, now));
    store.set_failures(StoreFailures {
        load_devices: true,
        ..Default::default()
    });
    let online = OnlineRegistry::new();

    assert!(recover_device_status(&store, &online, now, ttl()).await.is_none());
    assert!(online.is_empty());
    assert!(store.offline_batches().is_empty());
}

#[tokio::test]
async fn bulk_write_failure_is_reported_not_fatal() {
    let now = fixed_now();
    let store = MemoryStore::new();
    store.insert_device(device("D1", OnlineStatus::On, now - Duration::hours(1)));
    store.insert_device(device("D2", OnlineStatus::On, now));
    store.set_failures(StoreFailures {
        update_devices_offline: true,
        ..Default::default()
    });
    let online = OnlineRegistry::new();

    let report = recover_device_status(&store, &online, now, ttl()).await.unwrap();
    assert!(report.offline_write_failed);
    assert_eq!(report.expired, vec!["D1".to_string()]);
    // the fresh device is still registered
    assert!(online.contains("D2"));
    assert!(!online.contains("D1"));
    assert_eq!(store.device("D1").unwrap().status, OnlineStatus::On);
}
