//! In-memory stand-ins for the store, the media server and the handler
//! factory, plus record fixtures. Used by the scenario tests under tests/.

mod handlers;
mod store;
mod transport;

use chrono::{DateTime, TimeZone, Utc};
use gbs_schemas::{Device, OnlineStatus, PlatformRecord, SipUaOptions, TerminalDevice};

pub use handlers::{FakeHandlerFactory, HandlerEvent, RecordingHandler};
pub use store::{MemoryStore, StoreFailures};
pub use transport::FakeTransport;

/// Fixed reference instant so scenarios don't depend on wall-clock time.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn device(device_id: &str, status: OnlineStatus, last_heartbeat: DateTime<Utc>) -> Device {
    Device {
        device_id: device_id.to_string(),
        name: format!("camera {device_id}"),
        transport: "UDP".to_string(),
        remote_addr: "192.168.1.64:5060".to_string(),
        manufacturer: "Hikvision".to_string(),
        model: "DS-2CD2T47".to_string(),
        firmware: "V5.7.3".to_string(),
        status,
        register_time: last_heartbeat,
        last_heartbeat,
    }
}

pub fn platform(server_addr: &str) -> PlatformRecord {
    PlatformRecord {
        options: SipUaOptions {
            name: format!("upstream {server_addr}"),
            username: "34020000002000000001".to_string(),
            password: "12345678".to_string(),
            server_id: "34020000002000000002".to_string(),
            server_addr: server_addr.to_string(),
            transport: "UDP".to_string(),
            register_expires_secs: 3600,
            keepalive_interval_secs: 60,
        },
        status: OnlineStatus::On,
    }
}

pub fn terminal(username: &str) -> TerminalDevice {
    TerminalDevice {
        username: username.to_string(),
        name: format!("terminal {username}"),
        server_id: "34020000002000000003".to_string(),
        server_addr: "10.0.0.9:5060".to_string(),
        transport: "TCP".to_string(),
        sim_number: username.to_string(),
        status: OnlineStatus::On,
    }
}
