use chrono::{DateTime, Duration, Utc};
use gbs_db::RecordStore;
use gbs_reconcile::plan_device_recovery;
use tracing::{error, info};

use crate::registry::OnlineRegistry;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceRecoveryReport {
    /// Devices loaded from the store.
    pub inspected: usize,
    /// Devices seeded into the online registry.
    pub online: usize,
    /// Devices flagged OFF, sorted.
    pub expired: Vec<String>,
    /// The bulk OFF write failed; `expired` was queued for the next sweep.
    pub offline_write_failed: bool,
}

/// Seed `online` with every device still within `ttl` of its last heartbeat
/// and flag the rest OFF in one bulk write. If that write fails the expired
/// ids are queued on `online` for the heartbeat sweep to retry.
///
/// Returns `None` if the device list cannot be loaded; the phase is then
/// skipped and nothing is registered.
pub async fn recover_device_status(
    store: &dyn RecordStore,
    online: &OnlineRegistry,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Option<DeviceRecoveryReport> {
    let devices = match store.load_devices().await {
        Ok(d) => d,
        Err(e) => {
            error!(error = %format!("{e:#}"), "device status recovery skipped: load failed");
            return None;
        }
    };

    let plan = plan_device_recovery(&devices, now, ttl);
    for (device_id, last_heartbeat) in &plan.online {
        online.add(device_id.clone(), *last_heartbeat);
    }

    let mut offline_write_failed = false;
    if !plan.expired.is_empty() {
        if let Err(e) = store.update_devices_offline(&plan.expired).await {
            error!(
                devices = ?plan.expired,
                error = %format!("{e:#}"),
                "failed to flag expired devices offline; retrying on next sweep"
            );
            online.defer_offline(&plan.expired);
            offline_write_failed = true;
        }
    }

    info!(
        inspected = plan.inspected(),
        online = plan.online.len(),
        expired = plan.expired.len(),
        skipped = plan.skipped,
        "device status recovered"
    );

    Some(DeviceRecoveryReport {
        inspected: plan.inspected(),
        online: plan.online.len(),
        expired: plan.expired,
        offline_write_failed,
    })
}
