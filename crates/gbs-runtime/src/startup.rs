use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gbs_db::RecordStore;
use gbs_media::LiveTransport;
use tracing::info;

use crate::error::RecoveryError;
use crate::handler::HandlerFactory;
use crate::recovery::{
    reactivate_platforms, reactivate_terminals, reconcile_sessions, recover_device_status,
    DeviceRecoveryReport, InvalidSessions, ReactivationReport,
};
use crate::registry::Registries;

/// Outcome of a completed startup recovery.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// `None` when the device list could not be loaded.
    pub devices: Option<DeviceRecoveryReport>,
    pub sessions: InvalidSessions,
    pub platforms: ReactivationReport,
    pub terminals: ReactivationReport,
}

/// Runs the four recovery phases once, in order, before the server accepts
/// traffic.
pub struct StartupRecovery {
    store: Arc<dyn RecordStore>,
    transport: Arc<dyn LiveTransport>,
    factory: Arc<dyn HandlerFactory>,
    registries: Arc<Registries>,
    ttl: Duration,
}

impl StartupRecovery {
    pub fn new(
        store: Arc<dyn RecordStore>,
        transport: Arc<dyn LiveTransport>,
        factory: Arc<dyn HandlerFactory>,
        registries: Arc<Registries>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            factory,
            registries,
            ttl,
        }
    }

    /// devices -> sessions -> platforms -> terminals.
    ///
    /// An `Err` means the process must not continue; handlers started before
    /// the failure are left registered for the caller's teardown.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<StartupReport, RecoveryError> {
        let store = self.store.as_ref();

        let devices = recover_device_status(store, &self.registries.online, now, self.ttl).await;
        let sessions = reconcile_sessions(store, self.transport.as_ref()).await;
        let platforms = reactivate_platforms(store, self.factory.as_ref(), &self.registries.platforms).await?;
        let terminals = reactivate_terminals(store, self.factory.as_ref(), &self.registries.terminals).await?;

        info!(
            devices_online = self.registries.online.len(),
            invalid_streams = sessions.streams.len(),
            invalid_sinks = sessions.sinks.len(),
            platforms = platforms.started.len(),
            terminals = terminals.started.len(),
            "startup recovery complete"
        );

        Ok(StartupReport {
            devices,
            sessions,
            platforms,
            terminals,
        })
    }
}
