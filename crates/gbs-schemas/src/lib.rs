//! gbs-schemas
//!
//! Record shapes shared by the store, the media-server client and the
//! recovery runtime. Persisted records carry a store-internal `key` that is
//! only meaningful to bulk deletes; everything else is keyed by its
//! protocol identity (device id, server address, username, session id).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OnlineStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnlineStatus {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl OnlineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnlineStatus::On => "ON",
            OnlineStatus::Off => "OFF",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ON" => Some(OnlineStatus::On),
            "OFF" => Some(OnlineStatus::Off),
            _ => None,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, OnlineStatus::On)
    }
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

/// A registered signaling device (camera, NVR, lower-level platform).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: String,
    pub name: String,
    /// "UDP" | "TCP"
    pub transport: String,
    pub remote_addr: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub firmware: String,
    pub status: OnlineStatus,
    pub register_time: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

/// Catalog fields a device reports about itself. Empty fields mean
/// "not reported" and leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub firmware: String,
}

// ---------------------------------------------------------------------------
// Cascaded platform
// ---------------------------------------------------------------------------

/// SIP user-agent options a cascaded platform handler is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipUaOptions {
    pub name: String,
    pub username: String,
    pub password: String,
    pub server_id: String,
    /// `host:port` of the upstream signaling server. Unique per platform.
    pub server_addr: String,
    pub transport: String,
    pub register_expires_secs: u32,
    pub keepalive_interval_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRecord {
    pub options: SipUaOptions,
    pub status: OnlineStatus,
}

impl PlatformRecord {
    pub fn server_addr(&self) -> &str {
        &self.options.server_addr
    }
}

// ---------------------------------------------------------------------------
// JT terminal device
// ---------------------------------------------------------------------------

/// A JT808/1078 terminal bridged into the signaling plane, keyed by username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalDevice {
    pub username: String,
    pub name: String,
    pub server_id: String,
    pub server_addr: String,
    pub transport: String,
    /// SIM card number the terminal identifies itself with on the JT side.
    pub sim_number: String,
    pub status: OnlineStatus,
}

// ---------------------------------------------------------------------------
// Media sessions (persisted mirrors)
// ---------------------------------------------------------------------------

/// Persisted ingest session. `stream_id` is the media server's source id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub key: i64,
    pub stream_id: String,
    pub protocol: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted forward sink of an ingest session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRecord {
    pub key: i64,
    pub sink_id: String,
    pub source_id: String,
    pub protocol: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Live media-server views (never persisted)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSource {
    pub id: String,
    pub protocol: String,
}

impl LiveSource {
    pub fn new(id: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            protocol: protocol.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSink {
    pub id: String,
    pub protocol: String,
}

impl LiveSink {
    pub fn new(id: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            protocol: protocol.into(),
        }
    }
}
