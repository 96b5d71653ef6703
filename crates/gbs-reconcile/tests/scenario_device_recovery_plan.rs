use chrono::{Duration, TimeZone, Utc};
use gbs_reconcile::*;
use gbs_schemas::{Device, OnlineStatus};

fn device(id: &str, status: OnlineStatus, last: chrono::DateTime<Utc>) -> Device {
    Device {
        device_id: id.to_string(),
        name: id.to_string(),
        transport: "UDP".to_string(),
        remote_addr: "10.0.0.8:5060".to_string(),
        manufacturer: String::new(),
        model: String::new(),
        firmware: String::new(),
        status,
        register_time: last,
        last_heartbeat: last,
    }
}

#[test]
fn scenario_expired_online_and_off_devices_are_separated() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let ttl = Duration::seconds(180);

    let devices = vec![
        device("D1", OnlineStatus::On, now - ttl - Duration::seconds(1)),
        device("D2", OnlineStatus::On, now - ttl / 2),
        device("D3", OnlineStatus::Off, now),
    ];

    let plan = plan_device_recovery(&devices, now, ttl);

    assert_eq!(plan.expired, vec!["D1".to_string()]);
    assert_eq!(plan.online.len(), 1);
    assert_eq!(plan.online.get("D2"), Some(&(now - ttl / 2)));
    assert!(!plan.online.contains_key("D1"));
    assert!(!plan.online.contains_key("D3"));
    assert_eq!(plan.skipped, 1);
    assert_eq!(plan.inspected(), 3);
}

#[test]
fn scenario_expired_ids_are_sorted_and_unique() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let old = now - Duration::hours(2);
    let devices = vec![
        device("Z9", OnlineStatus::On, old),
        device("A1", OnlineStatus::On, old),
        device("A1", OnlineStatus::On, old),
    ];

    let plan = plan_device_recovery(&devices, now, Duration::seconds(60));
    assert_eq!(plan.expired, vec!["A1".to_string(), "Z9".to_string()]);
}
