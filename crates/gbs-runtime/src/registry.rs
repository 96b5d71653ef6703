//! Process-wide registries.
//!
//! Written once by startup recovery, then shared with live handlers and the
//! heartbeat path for the rest of the process. Backed by `DashMap`: every
//! operation is a short shard-local critical section and no lock is held
//! across an await point or a call into a handler.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use gbs_reconcile::{classify, Liveness};
use gbs_schemas::OnlineStatus;

use crate::handler::SessionHandler;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler is already registered under this key.
    DuplicateKey { registry: &'static str, key: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey { registry, key } => {
                write!(f, "{registry} registry already holds '{key}'")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

// ---------------------------------------------------------------------------
// OnlineRegistry
// ---------------------------------------------------------------------------

/// device_id -> last heartbeat of every device currently considered online,
/// plus the offline ids whose OFF write has not landed yet.
#[derive(Debug, Default)]
pub struct OnlineRegistry {
    devices: DashMap<String, DateTime<Utc>>,
    pending_offline: DashSet<String>,
}

impl OnlineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a device's last heartbeat. A device coming back
    /// online is no longer owed an OFF write.
    pub fn add(&self, device_id: impl Into<String>, last_heartbeat: DateTime<Utc>) {
        let device_id = device_id.into();
        self.pending_offline.remove(&device_id);
        self.devices.insert(device_id, last_heartbeat);
    }

    /// Move an already-registered device's heartbeat forward. Returns false
    /// if the device is not registered.
    pub fn refresh(&self, device_id: &str, last_heartbeat: DateTime<Utc>) -> bool {
        match self.devices.get_mut(device_id) {
            Some(mut e) => {
                if last_heartbeat > *e.value() {
                    *e.value_mut() = last_heartbeat;
                }
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, device_id: &str) -> Option<DateTime<Utc>> {
        self.devices.remove(device_id).map(|(_, ts)| ts)
    }

    /// Remove the device only if its heartbeat is still expired at `now`.
    /// A heartbeat that raced in after the expiry scan keeps it registered.
    pub fn remove_if_expired(&self, device_id: &str, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.devices
            .remove_if(device_id, |_, last| {
                classify(*last, now, ttl, OnlineStatus::On) == Liveness::Expire
            })
            .is_some()
    }

    pub fn last_heartbeat(&self, device_id: &str) -> Option<DateTime<Utc>> {
        self.devices.get(device_id).map(|e| *e.value())
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Sorted snapshot of registered ids.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Sorted ids whose last heartbeat is at or beyond `ttl` at `now`.
    pub fn expired(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<String> {
        let mut ids: Vec<String> = self
            .devices
            .iter()
            .filter(|e| classify(*e.value(), now, ttl, OnlineStatus::On) == Liveness::Expire)
            .map(|e| e.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Queue ids whose OFF write failed so the next sweep retries them.
    pub fn defer_offline(&self, device_ids: &[String]) {
        for id in device_ids {
            self.pending_offline.insert(id.clone());
        }
    }

    /// Dequeue every pending id, dropping those that came back online.
    /// Sorted.
    pub fn take_pending_offline(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending_offline.iter().map(|e| e.key().clone()).collect();
        ids.retain(|id| self.pending_offline.remove(id).is_some() && !self.devices.contains_key(id));
        ids.sort();
        ids
    }

    /// Sorted snapshot of ids still owed an OFF write.
    pub fn pending_offline(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending_offline.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.devices.clear();
        self.pending_offline.clear();
    }
}

// ---------------------------------------------------------------------------
// HandlerRegistry
// ---------------------------------------------------------------------------

/// identity -> live handler. Keys are unique; a second insert under the same
/// key is rejected atomically rather than replacing the running handler.
pub struct HandlerRegistry<H: ?Sized> {
    name: &'static str,
    handlers: DashMap<String, Arc<H>>,
}

impl<H: ?Sized> HandlerRegistry<H> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn insert(&self, key: impl Into<String>, handler: Arc<H>) -> Result<(), RegistryError> {
        match self.handlers.entry(key.into()) {
            Entry::Occupied(o) => Err(RegistryError::DuplicateKey {
                registry: self.name,
                key: o.key().clone(),
            }),
            Entry::Vacant(v) => {
                v.insert(handler);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<H>> {
        self.handlers.get(key).map(|e| Arc::clone(e.value()))
    }

    pub fn remove(&self, key: &str) -> Option<Arc<H>> {
        self.handlers.remove(key).map(|(_, h)| h)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Sorted snapshot of registered keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Remove and return every entry, in key order.
    pub fn drain(&self) -> Vec<(String, Arc<H>)> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.handlers.remove(&k))
            .collect()
    }
}

impl<H: ?Sized> fmt::Debug for HandlerRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("name", &self.name)
            .field("keys", &self.keys())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

/// The three registries, created at process start and shared as
/// `Arc<Registries>` with every component that reads or writes them.
#[derive(Debug)]
pub struct Registries {
    pub online: OnlineRegistry,
    /// server address -> cascaded platform handler
    pub platforms: HandlerRegistry<dyn SessionHandler>,
    /// username -> JT terminal handler
    pub terminals: HandlerRegistry<dyn SessionHandler>,
}

impl Default for Registries {
    fn default() -> Self {
        Self::new()
    }
}

impl Registries {
    pub fn new() -> Self {
        Self {
            online: OnlineRegistry::new(),
            platforms: HandlerRegistry::new("platform"),
            terminals: HandlerRegistry::new("terminal"),
        }
    }

    /// Shutdown: stop and drop every handler, forget every online device.
    /// Returns the number of handlers stopped.
    pub fn teardown(&self) -> usize {
        let mut stopped = 0;
        for (_, h) in self.platforms.drain().into_iter().chain(self.terminals.drain()) {
            h.stop();
            stopped += 1;
        }
        self.online.clear();
        stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubHandler {
        key: String,
        stops: Arc<AtomicUsize>,
    }

    impl SessionHandler for StubHandler {
        fn key(&self) -> &str {
            &self.key
        }
        fn start(self: Arc<Self>) {}
        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn stub(key: &str, stops: &Arc<AtomicUsize>) -> Arc<dyn SessionHandler> {
        Arc::new(StubHandler {
            key: key.to_string(),
            stops: Arc::clone(stops),
        })
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn duplicate_insert_is_rejected_and_keeps_first() {
        let stops = Arc::new(AtomicUsize::new(0));
        let reg: HandlerRegistry<dyn SessionHandler> = HandlerRegistry::new("platform");
        reg.insert("10.0.0.1:5060", stub("10.0.0.1:5060", &stops)).unwrap();

        let err = reg
            .insert("10.0.0.1:5060", stub("10.0.0.1:5060", &stops))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateKey {
                registry: "platform",
                key: "10.0.0.1:5060".to_string()
            }
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn drain_returns_sorted_and_empties() {
        let stops = Arc::new(AtomicUsize::new(0));
        let reg: HandlerRegistry<dyn SessionHandler> = HandlerRegistry::new("terminal");
        reg.insert("b", stub("b", &stops)).unwrap();
        reg.insert("a", stub("a", &stops)).unwrap();

        let keys: Vec<String> = reg.drain().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert!(reg.is_empty());
    }

    #[test]
    fn teardown_stops_every_handler_and_clears_online() {
        let stops = Arc::new(AtomicUsize::new(0));
        let regs = Registries::new();
        regs.platforms.insert("p1", stub("p1", &stops)).unwrap();
        regs.terminals.insert("t1", stub("t1", &stops)).unwrap();
        regs.terminals.insert("t2", stub("t2", &stops)).unwrap();
        regs.online.add("D1", t0());

        assert_eq!(regs.teardown(), 3);
        assert_eq!(stops.load(Ordering::SeqCst), 3);
        assert!(regs.platforms.is_empty());
        assert!(regs.terminals.is_empty());
        assert!(regs.online.is_empty());
    }

    #[test]
    fn online_expired_and_conditional_remove() {
        let ttl = Duration::seconds(60);
        let reg = OnlineRegistry::new();
        reg.add("OLD", t0() - Duration::seconds(61));
        reg.add("NEW", t0() - Duration::seconds(5));

        assert_eq!(reg.expired(t0(), ttl), vec!["OLD".to_string()]);
        assert!(!reg.remove_if_expired("NEW", t0(), ttl));
        assert!(reg.remove_if_expired("OLD", t0(), ttl));
        assert_eq!(reg.device_ids(), vec!["NEW".to_string()]);
    }

    #[test]
    fn refresh_overwrites_heartbeat() {
        let reg = OnlineRegistry::new();
        reg.add("D1", t0());
        reg.add("D1", t0() + Duration::seconds(30));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.last_heartbeat("D1"), Some(t0() + Duration::seconds(30)));

        // refresh never moves backwards and never registers
        assert!(reg.refresh("D1", t0()));
        assert_eq!(reg.last_heartbeat("D1"), Some(t0() + Duration::seconds(30)));
        assert!(!reg.refresh("D9", t0()));
        assert!(!reg.contains("D9"));
    }

    #[test]
    fn pending_offline_is_dropped_when_device_returns() {
        let reg = OnlineRegistry::new();
        reg.defer_offline(&["D2".to_string(), "D1".to_string()]);
        assert_eq!(reg.pending_offline(), vec!["D1".to_string(), "D2".to_string()]);

        reg.add("D2", t0());
        assert_eq!(reg.take_pending_offline(), vec!["D1".to_string()]);
        assert!(reg.pending_offline().is_empty());
        assert!(reg.take_pending_offline().is_empty());
    }
}
