//! Handlers the daemon reactivates when no protocol stack is plugged in.
//!
//! A standby handler validates its record at construction, then holds a
//! tokio task open until `stop()`. SIP and JT/T 808 clients replace it by
//! implementing `HandlerFactory` over the same records.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use gbs_runtime::{HandlerFactory, SessionHandler};
use gbs_schemas::{PlatformRecord, TerminalDevice};
use tokio::sync::Notify;
use tracing::info;

pub struct StandbyHandler {
    kind: &'static str,
    key: String,
    stop: Notify,
}

impl StandbyHandler {
    fn new(kind: &'static str, key: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            key: key.to_string(),
            stop: Notify::new(),
        })
    }
}

impl SessionHandler for StandbyHandler {
    fn key(&self) -> &str {
        &self.key
    }

    fn start(self: Arc<Self>) {
        tokio::spawn(async move {
            info!(kind = self.kind, key = %self.key, "handler standing by");
            self.stop.notified().await;
            info!(kind = self.kind, key = %self.key, "handler stopped");
        });
    }

    fn stop(&self) {
        // notify_one keeps a permit if the task has not reached notified() yet
        self.stop.notify_one();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandbyHandlerFactory;

impl HandlerFactory for StandbyHandlerFactory {
    fn new_platform(&self, record: &PlatformRecord) -> Result<Arc<dyn SessionHandler>> {
        let o = &record.options;
        o.server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid platform server address '{}'", o.server_addr))?;
        if o.server_id.trim().is_empty() {
            bail!("platform server id is empty");
        }
        if o.username.trim().is_empty() {
            bail!("platform username is empty");
        }
        Ok(StandbyHandler::new("platform", record.server_addr()))
    }

    fn new_terminal(&self, record: &TerminalDevice) -> Result<Arc<dyn SessionHandler>> {
        let u = &record.username;
        if u.is_empty() || u.chars().any(char::is_whitespace) {
            bail!("malformed terminal username '{u}'");
        }
        if record.server_id.trim().is_empty() {
            bail!("terminal server id is empty");
        }
        Ok(StandbyHandler::new("terminal", u))
    }
}
