use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use gbs_runtime::{HandlerFactory, SessionHandler};
use gbs_schemas::{PlatformRecord, TerminalDevice};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerEvent {
    Built(String),
    Started(String),
    Stopped(String),
}

type EventLog = Arc<Mutex<Vec<HandlerEvent>>>;

fn push(log: &EventLog, ev: HandlerEvent) {
    if let Ok(mut l) = log.lock() {
        l.push(ev);
    }
}

/// Handler that only records its lifecycle.
pub struct RecordingHandler {
    key: String,
    log: EventLog,
}

impl SessionHandler for RecordingHandler {
    fn key(&self) -> &str {
        &self.key
    }

    fn start(self: Arc<Self>) {
        push(&self.log, HandlerEvent::Started(self.key.clone()));
    }

    fn stop(&self) {
        push(&self.log, HandlerEvent::Stopped(self.key.clone()));
    }
}

/// Builds `RecordingHandler`s. Rejects records with an empty server id and
/// any key marked with `rejecting_*`.
#[derive(Default)]
pub struct FakeHandlerFactory {
    reject_platforms: BTreeSet<String>,
    reject_terminals: BTreeSet<String>,
    log: EventLog,
}

impl FakeHandlerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_platform(mut self, server_addr: &str) -> Self {
        self.reject_platforms.insert(server_addr.to_string());
        self
    }

    pub fn rejecting_terminal(mut self, username: &str) -> Self {
        self.reject_terminals.insert(username.to_string());
        self
    }

    pub fn events(&self) -> Vec<HandlerEvent> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HandlerEvent::Started(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HandlerEvent::Stopped(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    fn build(&self, key: &str) -> Arc<dyn SessionHandler> {
        push(&self.log, HandlerEvent::Built(key.to_string()));
        Arc::new(RecordingHandler {
            key: key.to_string(),
            log: Arc::clone(&self.log),
        })
    }
}

impl HandlerFactory for FakeHandlerFactory {
    fn new_platform(&self, record: &PlatformRecord) -> Result<Arc<dyn SessionHandler>> {
        if record.options.server_id.is_empty() {
            bail!("platform options missing server id");
        }
        if self.reject_platforms.contains(record.server_addr()) {
            bail!("platform options rejected");
        }
        Ok(self.build(record.server_addr()))
    }

    fn new_terminal(&self, record: &TerminalDevice) -> Result<Arc<dyn SessionHandler>> {
        if record.server_id.is_empty() {
            bail!("terminal record missing server id");
        }
        if self.reject_terminals.contains(&record.username) {
            bail!("terminal record rejected");
        }
        Ok(self.build(&record.username))
    }
}
