use gbs_db::RecordStore;
use gbs_media::LiveTransport;
use gbs_reconcile::{plan_session_reconcile, LiveInventory};
use gbs_schemas::{SinkRecord, StreamRecord};
use tracing::{debug, error, info, warn};

/// Persisted sessions the media server no longer carries. Already deleted
/// from the store by the time the caller sees them; the caller owns any
/// further teardown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvalidSessions {
    pub streams: Vec<StreamRecord>,
    pub sinks: Vec<SinkRecord>,
}

impl InvalidSessions {
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.sinks.is_empty()
    }

    pub fn stream_ids(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.stream_id.as_str()).collect()
    }

    pub fn sink_ids(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.sink_id.as_str()).collect()
    }
}

/// Snapshot the media server's recognized sources and their recognized sinks.
///
/// A failed source query yields an empty inventory: with no evidence that a
/// session is live, every persisted session is treated as stale. A failed
/// sink query for one source drops only that source's sinks.
pub async fn collect_live_inventory(transport: &dyn LiveTransport) -> LiveInventory {
    let mut inventory = LiveInventory::empty();

    let sources = match transport.list_sources().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "live source query failed; treating media server as empty");
            return inventory;
        }
    };

    for source in &sources {
        if !inventory.admit_source(source) {
            debug!(source_id = %source.id, protocol = %source.protocol, "ignoring live source");
            continue;
        }
        match transport.list_sinks_of(&source.id).await {
            Ok(sinks) => inventory.admit_sinks(&source.id, &sinks),
            Err(e) => {
                warn!(source_id = %source.id, error = %e, "live sink query failed; skipping source sinks")
            }
        }
    }

    inventory
}

/// Delete persisted streams and forward sinks absent from the media server
/// and return what was removed.
///
/// If either table cannot be loaded the phase aborts with nothing deleted.
/// Delete failures are logged; the records are still reported so the caller
/// can tear down anything still attached to them.
pub async fn reconcile_sessions(store: &dyn RecordStore, transport: &dyn LiveTransport) -> InvalidSessions {
    let streams = match store.load_streams().await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %format!("{e:#}"), "session reconcile skipped: stream load failed");
            return InvalidSessions::default();
        }
    };
    let sinks = match store.load_forward_sinks().await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %format!("{e:#}"), "session reconcile skipped: sink load failed");
            return InvalidSessions::default();
        }
    };

    let live = collect_live_inventory(transport).await;
    let plan = plan_session_reconcile(streams, sinks, &live);

    if !plan.purged_streams.is_empty() {
        if let Err(e) = store.delete_streams_by_keys(&plan.purged_stream_keys()).await {
            error!(count = plan.purged_streams.len(), error = %format!("{e:#}"), "failed to delete stale streams");
        }
    }
    if !plan.purged_sinks.is_empty() {
        if let Err(e) = store.delete_sinks_by_keys(&plan.purged_sink_keys()).await {
            error!(count = plan.purged_sinks.len(), error = %format!("{e:#}"), "failed to delete stale sinks");
        }
    }

    info!(
        live_sources = live.source_count(),
        live_sinks = live.sink_count(),
        retained_streams = plan.retained_streams.len(),
        purged_streams = plan.purged_streams.len(),
        retained_sinks = plan.retained_sinks.len(),
        purged_sinks = plan.purged_sinks.len(),
        "sessions reconciled"
    );

    InvalidSessions {
        streams: plan.purged_streams,
        sinks: plan.purged_sinks,
    }
}
