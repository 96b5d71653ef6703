//! Typed view over the merged config JSON.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

pub const DEFAULT_ALIVE_EXPIRES_SECS: i64 = 180;
/// Upper bound on `/sip/alive_expires`: one year.
pub const MAX_ALIVE_EXPIRES_SECS: i64 = 365 * 24 * 60 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MEDIA_SERVER_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_MEDIA_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_HTTP_LISTEN_ADDR: &str = "127.0.0.1:9000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Maximum heartbeat silence before a device is considered offline.
    pub alive_expires_secs: i64,
    pub sweep_interval: Duration,
    pub media_server_url: String,
    pub media_timeout: Duration,
    pub http_listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            alive_expires_secs: DEFAULT_ALIVE_EXPIRES_SECS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            media_server_url: DEFAULT_MEDIA_SERVER_URL.to_string(),
            media_timeout: Duration::from_secs(DEFAULT_MEDIA_TIMEOUT_SECS),
            http_listen_addr: DEFAULT_HTTP_LISTEN_ADDR.to_string(),
        }
    }
}

impl ServerSettings {
    /// Read every key in [`crate::CONSUMED_POINTERS`]; absent keys take defaults.
    pub fn from_config_json(v: &Value) -> Result<Self> {
        let d = Self::default();

        let alive_expires_secs = match v.pointer("/sip/alive_expires") {
            None | Some(Value::Null) => d.alive_expires_secs,
            Some(x) => x
                .as_i64()
                .ok_or_else(|| anyhow!("CONFIG_INVALID /sip/alive_expires must be an integer"))?,
        };
        if alive_expires_secs <= 0 {
            bail!("CONFIG_INVALID /sip/alive_expires must be > 0 (got {alive_expires_secs})");
        }
        if alive_expires_secs > MAX_ALIVE_EXPIRES_SECS {
            bail!(
                "CONFIG_INVALID /sip/alive_expires must be <= {MAX_ALIVE_EXPIRES_SECS} (got {alive_expires_secs})"
            );
        }

        let sweep_secs = read_u64(v, "/sweep/interval_secs", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_secs == 0 {
            bail!("CONFIG_INVALID /sweep/interval_secs must be > 0");
        }

        let timeout_secs = read_u64(v, "/media/timeout_secs", DEFAULT_MEDIA_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            // a zero reqwest timeout fails every request
            bail!("CONFIG_INVALID /media/timeout_secs must be > 0");
        }

        Ok(Self {
            alive_expires_secs,
            sweep_interval: Duration::from_secs(sweep_secs),
            media_server_url: read_string(v, "/media/server_url", &d.media_server_url)?,
            media_timeout: Duration::from_secs(timeout_secs),
            http_listen_addr: read_string(v, "/http/listen_addr", &d.http_listen_addr)?,
        })
    }

    /// Liveness TTL in the form the classifier takes. Clamped to the
    /// accepted range so a hand-built value cannot overflow.
    pub fn liveness_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.alive_expires_secs.clamp(1, MAX_ALIVE_EXPIRES_SECS))
    }
}

fn read_u64(v: &Value, ptr: &str, default: u64) -> Result<u64> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(default),
        Some(x) => x
            .as_u64()
            .ok_or_else(|| anyhow!("CONFIG_INVALID {ptr} must be a non-negative integer")),
    }
}

fn read_string(v: &Value, ptr: &str, default: &str) -> Result<String> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(default.to_string()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(_) => Err(anyhow!("CONFIG_INVALID {ptr} must be a non-empty string")),
    }
}
