use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use gbs_db::RecordStore;
use gbs_schemas::{Device, OnlineStatus, PlatformRecord, SinkRecord, StreamRecord, TerminalDevice};

/// Which store operations fail. All false by default.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreFailures {
    pub load_devices: bool,
    pub load_platforms: bool,
    pub load_terminals: bool,
    pub load_streams: bool,
    pub load_sinks: bool,
    pub update_devices_offline: bool,
    pub update_platform_offline: bool,
    pub update_terminal_offline: bool,
    pub delete_streams: bool,
    pub delete_sinks: bool,
}

#[derive(Default)]
struct State {
    devices: BTreeMap<String, Device>,
    platforms: Vec<PlatformRecord>,
    terminals: Vec<TerminalDevice>,
    streams: Vec<StreamRecord>,
    sinks: Vec<SinkRecord>,
    next_key: i64,
    failures: StoreFailures,
    offline_batches: Vec<Vec<String>>,
}

/// `RecordStore` over plain collections. Keys are assigned in insert order.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_failures(&self, failures: StoreFailures) {
        self.state().failures = failures;
    }

    pub fn insert_device(&self, d: Device) {
        self.state().devices.insert(d.device_id.clone(), d);
    }

    pub fn insert_platform(&self, p: PlatformRecord) {
        self.state().platforms.push(p);
    }

    pub fn insert_terminal(&self, t: TerminalDevice) {
        self.state().terminals.push(t);
    }

    pub fn insert_stream(&self, stream_id: &str, protocol: &str) -> i64 {
        let mut st = self.state();
        st.next_key += 1;
        let key = st.next_key;
        st.streams.push(StreamRecord {
            key,
            stream_id: stream_id.to_string(),
            protocol: protocol.to_string(),
            created_at: Utc::now(),
        });
        key
    }

    pub fn insert_sink(&self, sink_id: &str, source_id: &str, protocol: &str) -> i64 {
        let mut st = self.state();
        st.next_key += 1;
        let key = st.next_key;
        st.sinks.push(SinkRecord {
            key,
            sink_id: sink_id.to_string(),
            source_id: source_id.to_string(),
            protocol: protocol.to_string(),
            created_at: Utc::now(),
        });
        key
    }

    pub fn device(&self, device_id: &str) -> Option<Device> {
        self.state().devices.get(device_id).cloned()
    }

    pub fn platform_status(&self, server_addr: &str) -> Option<OnlineStatus> {
        self.state()
            .platforms
            .iter()
            .find(|p| p.server_addr() == server_addr)
            .map(|p| p.status)
    }

    pub fn terminal_status(&self, username: &str) -> Option<OnlineStatus> {
        self.state()
            .terminals
            .iter()
            .find(|t| t.username == username)
            .map(|t| t.status)
    }

    /// Persisted stream ids, sorted.
    pub fn stream_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state().streams.iter().map(|s| s.stream_id.clone()).collect();
        ids.sort();
        ids
    }

    /// Persisted sink ids, sorted.
    pub fn sink_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state().sinks.iter().map(|s| s.sink_id.clone()).collect();
        ids.sort();
        ids
    }

    /// Id sets passed to every `update_devices_offline` call, failed ones included.
    pub fn offline_batches(&self) -> Vec<Vec<String>> {
        self.state().offline_batches.clone()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn load_devices(&self) -> Result<Vec<Device>> {
        let st = self.state();
        if st.failures.load_devices {
            bail!("load_devices: injected failure");
        }
        Ok(st.devices.values().cloned().collect())
    }

    async fn load_platforms(&self) -> Result<Vec<PlatformRecord>> {
        let st = self.state();
        if st.failures.load_platforms {
            bail!("load_platforms: injected failure");
        }
        Ok(st.platforms.clone())
    }

    async fn load_terminal_devices(&self) -> Result<Vec<TerminalDevice>> {
        let st = self.state();
        if st.failures.load_terminals {
            bail!("load_terminal_devices: injected failure");
        }
        Ok(st.terminals.clone())
    }

    async fn load_streams(&self) -> Result<Vec<StreamRecord>> {
        let st = self.state();
        if st.failures.load_streams {
            bail!("load_streams: injected failure");
        }
        Ok(st.streams.clone())
    }

    async fn load_forward_sinks(&self) -> Result<Vec<SinkRecord>> {
        let st = self.state();
        if st.failures.load_sinks {
            bail!("load_forward_sinks: injected failure");
        }
        Ok(st.sinks.clone())
    }

    async fn update_devices_offline(&self, device_ids: &[String]) -> Result<()> {
        let mut st = self.state();
        st.offline_batches.push(device_ids.to_vec());
        if st.failures.update_devices_offline {
            bail!("update_devices_offline: injected failure");
        }
        for id in device_ids {
            if let Some(d) = st.devices.get_mut(id) {
                d.status = OnlineStatus::Off;
            }
        }
        Ok(())
    }

    async fn update_platform_offline(&self, server_addr: &str) -> Result<()> {
        let mut st = self.state();
        if st.failures.update_platform_offline {
            bail!("update_platform_offline: injected failure");
        }
        for p in st.platforms.iter_mut().filter(|p| p.server_addr() == server_addr) {
            p.status = OnlineStatus::Off;
        }
        Ok(())
    }

    async fn update_terminal_offline(&self, username: &str) -> Result<()> {
        let mut st = self.state();
        if st.failures.update_terminal_offline {
            bail!("update_terminal_offline: injected failure");
        }
        for t in st.terminals.iter_mut().filter(|t| t.username == username) {
            t.status = OnlineStatus::Off;
        }
        Ok(())
    }

    async fn delete_streams_by_keys(&self, keys: &[i64]) -> Result<()> {
        let mut st = self.state();
        if st.failures.delete_streams {
            bail!("delete_streams_by_keys: injected failure");
        }
        st.streams.retain(|s| !keys.contains(&s.key));
        Ok(())
    }

    async fn delete_sinks_by_keys(&self, keys: &[i64]) -> Result<()> {
        let mut st = self.state();
        if st.failures.delete_sinks {
            bail!("delete_sinks_by_keys: injected failure");
        }
        st.sinks.retain(|s| !keys.contains(&s.key));
        Ok(())
    }

    async fn refresh_heartbeat(&self, device_id: &str, now: DateTime<Utc>, remote_addr: &str) -> Result<()> {
        let mut st = self.state();
        let d = st
            .devices
            .get_mut(device_id)
            .ok_or_else(|| anyhow!("refresh_heartbeat: unknown device {device_id}"))?;
        d.status = OnlineStatus::On;
        d.last_heartbeat = now;
        d.remote_addr = remote_addr.to_string();
        Ok(())
    }
}
