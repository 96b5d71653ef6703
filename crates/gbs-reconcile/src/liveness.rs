use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use gbs_schemas::{Device, OnlineStatus};

/// Outcome of classifying one persisted device at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// Already OFF; nothing to do.
    Skip,
    /// Heartbeat is within the TTL: register it as online, leave the store alone.
    Online,
    /// Heartbeat is at or beyond the TTL: must be persisted as OFF.
    Expire,
}

/// Liveness classifier.
///
/// Total over all inputs. A heartbeat stamped in the future yields a negative
/// age and therefore counts as online.
pub fn classify(
    last_heartbeat: DateTime<Utc>,
    now: DateTime<Utc>,
    ttl: Duration,
    status: OnlineStatus,
) -> Liveness {
    if status == OnlineStatus::Off {
        return Liveness::Skip;
    }

    if now.signed_duration_since(last_heartbeat) < ttl {
        Liveness::Online
    } else {
        Liveness::Expire
    }
}

/// What device status recovery must apply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceRecoveryPlan {
    /// device_id -> last heartbeat, to seed the online registry.
    pub online: BTreeMap<String, DateTime<Utc>>,
    /// Device ids to flag OFF in a single bulk update. Sorted, unique.
    pub expired: Vec<String>,
    /// Devices that were already OFF.
    pub skipped: usize,
}

impl DeviceRecoveryPlan {
    /// Number of devices the plan classified.
    pub fn inspected(&self) -> usize {
        self.online.len() + self.expired.len() + self.skipped
    }
}

/// Classify every device once, separating online devices from expired ones.
pub fn plan_device_recovery<'a, I>(devices: I, now: DateTime<Utc>, ttl: Duration) -> DeviceRecoveryPlan
where
    I: IntoIterator<Item = &'a Device>,
{
    let mut plan = DeviceRecoveryPlan::default();
    let mut expired: BTreeSet<String> = BTreeSet::new();

    for d in devices {
        match classify(d.last_heartbeat, now, ttl, d.status) {
            Liveness::Skip => plan.skipped += 1,
            Liveness::Online => {
                plan.online.insert(d.device_id.clone(), d.last_heartbeat);
            }
            Liveness::Expire => {
                expired.insert(d.device_id.clone());
            }
        }
    }

    plan.expired = expired.into_iter().collect();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn off_is_skipped_regardless_of_timestamps() {
        let ttl = Duration::seconds(180);
        assert_eq!(classify(t0(), t0(), ttl, OnlineStatus::Off), Liveness::Skip);
        let ancient = t0() - Duration::days(365);
        assert_eq!(classify(ancient, t0(), ttl, OnlineStatus::Off), Liveness::Skip);
    }

    #[test]
    fn boundary_is_expired() {
        let ttl = Duration::seconds(180);
        let last = t0() - ttl;
        assert_eq!(classify(last, t0(), ttl, OnlineStatus::On), Liveness::Expire);

        let just_inside = last + Duration::milliseconds(1);
        assert_eq!(classify(just_inside, t0(), ttl, OnlineStatus::On), Liveness::Online);
    }

    #[test]
    fn future_heartbeat_counts_as_online() {
        let ttl = Duration::seconds(60);
        let ahead = t0() + Duration::seconds(30);
        assert_eq!(classify(ahead, t0(), ttl, OnlineStatus::On), Liveness::Online);
    }

    #[test]
    fn zero_ttl_expires_everything_on() {
        assert_eq!(
            classify(t0(), t0(), Duration::zero(), OnlineStatus::On),
            Liveness::Expire
        );
    }
}
