use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use gbs_media::{LiveTransport, TransportError};
use gbs_schemas::{LiveSink, LiveSource};

/// Scripted media server. Built once, then queried through `LiveTransport`.
#[derive(Default)]
pub struct FakeTransport {
    sources: Vec<LiveSource>,
    sinks: BTreeMap<String, Vec<LiveSink>>,
    fail_sources: bool,
    fail_sinks_for: BTreeSet<String>,
    sink_queries: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, id: &str, protocol: &str) -> Self {
        self.sources.push(LiveSource::new(id, protocol));
        self
    }

    pub fn with_sink(mut self, source_id: &str, sink_id: &str, protocol: &str) -> Self {
        self.sinks
            .entry(source_id.to_string())
            .or_default()
            .push(LiveSink::new(sink_id, protocol));
        self
    }

    /// `list_sources` fails as if the media server were unreachable.
    pub fn failing_sources(mut self) -> Self {
        self.fail_sources = true;
        self
    }

    pub fn failing_sinks_for(mut self, source_id: &str) -> Self {
        self.fail_sinks_for.insert(source_id.to_string());
        self
    }

    /// Source ids `list_sinks_of` was called with, in call order.
    pub fn sink_queries(&self) -> Vec<String> {
        self.sink_queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LiveTransport for FakeTransport {
    async fn list_sources(&self) -> Result<Vec<LiveSource>, TransportError> {
        if self.fail_sources {
            return Err(TransportError::Transport("connection refused".to_string()));
        }
        Ok(self.sources.clone())
    }

    async fn list_sinks_of(&self, source_id: &str) -> Result<Vec<LiveSink>, TransportError> {
        if let Ok(mut q) = self.sink_queries.lock() {
            q.push(source_id.to_string());
        }
        if self.fail_sinks_for.contains(source_id) {
            return Err(TransportError::Api {
                code: Some(500),
                message: format!("source {source_id} busy"),
            });
        }
        Ok(self.sinks.get(source_id).cloned().unwrap_or_default())
    }
}
