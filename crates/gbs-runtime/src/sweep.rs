//! Steady-state liveness: heartbeats keep devices registered, a periodic
//! sweep flags the silent ones OFF.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gbs_db::RecordStore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::registry::{OnlineRegistry, Registries};

/// Persist a heartbeat and refresh the device in the online registry.
/// The registry is only touched once the store accepted the write.
pub async fn record_heartbeat(
    store: &dyn RecordStore,
    online: &OnlineRegistry,
    device_id: &str,
    now: DateTime<Utc>,
    remote_addr: &str,
) -> anyhow::Result<()> {
    store.refresh_heartbeat(device_id, now, remote_addr).await?;
    online.add(device_id, now);
    Ok(())
}

/// Drop every registered device whose heartbeat expired at `now` and flag
/// them OFF, together with any ids still queued from an earlier failed
/// write, in one bulk update. On failure the whole batch is queued again.
/// Returns the ids written (or attempted), sorted.
pub async fn sweep_expired_devices(
    store: &dyn RecordStore,
    online: &OnlineRegistry,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Vec<String> {
    let mut batch: Vec<String> = online
        .expired(now, ttl)
        .into_iter()
        .filter(|id| online.remove_if_expired(id, now, ttl))
        .collect();
    batch.extend(online.take_pending_offline());
    batch.sort();
    batch.dedup();
    if batch.is_empty() {
        return batch;
    }

    match store.update_devices_offline(&batch).await {
        Ok(()) => info!(count = batch.len(), "expired devices flagged offline"),
        Err(e) => {
            error!(devices = ?batch, error = %format!("{e:#}"), "failed to flag expired devices offline; retrying on next sweep");
            online.defer_offline(&batch);
        }
    }
    batch
}

/// Run [`sweep_expired_devices`] on a fixed interval for the life of the process.
pub fn spawn_heartbeat_sweep(
    store: Arc<dyn RecordStore>,
    registries: Arc<Registries>,
    ttl: Duration,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick fires immediately; recovery just classified everything
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_expired_devices(store.as_ref(), &registries.online, Utc::now(), ttl).await;
        }
    })
}
