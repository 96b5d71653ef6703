//! Response types for the daemon's HTTP endpoints.

use gbs_runtime::StartupReport;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub online_devices: usize,
    pub platforms: usize,
    pub terminals: usize,
    /// `None` until startup recovery has completed.
    pub recovery: Option<RecoverySummary>,
}

/// Counts from the startup recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySummary {
    /// Device phase skipped (load failure) shows as 0 expired / 0 online.
    pub devices_expired: usize,
    pub devices_online: usize,
    pub invalid_streams: usize,
    pub invalid_sinks: usize,
    pub platforms_started: usize,
    pub terminals_started: usize,
}

impl From<&StartupReport> for RecoverySummary {
    fn from(r: &StartupReport) -> Self {
        let (devices_expired, devices_online) = r
            .devices
            .as_ref()
            .map(|d| (d.expired.len(), d.online))
            .unwrap_or_default();
        Self {
            devices_expired,
            devices_online,
            invalid_streams: r.sessions.streams.len(),
            invalid_sinks: r.sessions.sinks.len(),
            platforms_started: r.platforms.started.len(),
            terminals_started: r.terminals.started.len(),
        }
    }
}
