//! Shared runtime state for gbs-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The registries are the
//! same `Arc` the recovery pass and the heartbeat sweep write to.

use std::sync::Arc;

use gbs_runtime::Registries;

use crate::api_types::RecoverySummary;

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub build: BuildInfo,
    pub registries: Arc<Registries>,
    pub recovery: Option<RecoverySummary>,
}

impl AppState {
    pub fn new(registries: Arc<Registries>) -> Self {
        Self {
            build: BuildInfo {
                service: "gbs-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            registries,
            recovery: None,
        }
    }

    pub fn with_recovery(mut self, summary: RecoverySummary) -> Self {
        self.recovery = Some(summary);
        self
    }
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}
