use std::collections::{BTreeMap, BTreeSet};

use gbs_schemas::{LiveSink, LiveSource, SinkRecord, StreamRecord};

/// Source protocols whose sessions this engine mirrors in the store:
/// signaling push and its talk-mode variant.
pub const INGEST_PROTOCOLS: &[&str] = &["28181", "gb_talk"];

/// Sink protocols whose sessions this engine mirrors in the store:
/// cascaded forward and talk forward.
pub const FORWARD_PROTOCOLS: &[&str] = &["gb_cascaded_forward", "gb_talk_forward"];

pub fn is_reconcilable_source(protocol: &str) -> bool {
    INGEST_PROTOCOLS.contains(&protocol)
}

pub fn is_reconcilable_sink(protocol: &str) -> bool {
    FORWARD_PROTOCOLS.contains(&protocol)
}

// ---------------------------------------------------------------------------
// LiveInventory
// ---------------------------------------------------------------------------

/// The media server's authoritative view, restricted to recognized protocols.
///
/// Sources of other protocols belong to other subsystems and are never
/// admitted, so they cannot protect a persisted record that shares their id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveInventory {
    sources: BTreeSet<String>,
    /// live sink id -> owning source id
    sinks: BTreeMap<String, String>,
}

impl LiveInventory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Admit a live source. Returns `true` if its protocol is reconcilable,
    /// i.e. the caller should go on to query its sinks.
    pub fn admit_source(&mut self, source: &LiveSource) -> bool {
        if !is_reconcilable_source(&source.protocol) {
            return false;
        }
        self.sources.insert(source.id.clone());
        true
    }

    /// Admit the live sinks of an already admitted source. Sinks of
    /// unrecognized protocols, or of a source that was never admitted, are
    /// ignored.
    pub fn admit_sinks(&mut self, source_id: &str, sinks: &[LiveSink]) {
        if !self.sources.contains(source_id) {
            return;
        }
        for sink in sinks {
            if is_reconcilable_sink(&sink.protocol) {
                self.sinks.insert(sink.id.clone(), source_id.to_string());
            }
        }
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains(id)
    }

    pub fn sink_owner(&self, sink_id: &str) -> Option<&str> {
        self.sinks.get(sink_id).map(String::as_str)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

// ---------------------------------------------------------------------------
// SessionPlan
// ---------------------------------------------------------------------------

/// Partition of the persisted sessions into confirmed-live and stale.
///
/// Each partition is ordered by session id (then store key) so reports and
/// delete batches are deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionPlan {
    pub retained_streams: Vec<StreamRecord>,
    pub purged_streams: Vec<StreamRecord>,
    pub retained_sinks: Vec<SinkRecord>,
    pub purged_sinks: Vec<SinkRecord>,
}

impl SessionPlan {
    pub fn purged_stream_keys(&self) -> Vec<i64> {
        self.purged_streams.iter().map(|s| s.key).collect()
    }

    pub fn purged_sink_keys(&self) -> Vec<i64> {
        self.purged_sinks.iter().map(|s| s.key).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.purged_streams.is_empty() && self.purged_sinks.is_empty()
    }
}

/// Split persisted streams and sinks against the live inventory.
///
/// - stream retained  <=> a live admitted source has the same id
/// - sink retained    <=> a live admitted sink has the same id
///
/// Sinks are matched on their own id only; the owning source recorded in the
/// store is not consulted.
pub fn plan_session_reconcile(
    streams: Vec<StreamRecord>,
    sinks: Vec<SinkRecord>,
    live: &LiveInventory,
) -> SessionPlan {
    let mut plan = SessionPlan::default();

    for s in streams {
        if live.has_source(&s.stream_id) {
            plan.retained_streams.push(s);
        } else {
            plan.purged_streams.push(s);
        }
    }

    for k in sinks {
        if live.sink_owner(&k.sink_id).is_some() {
            plan.retained_sinks.push(k);
        } else {
            plan.purged_sinks.push(k);
        }
    }

    let by_stream = |a: &StreamRecord, b: &StreamRecord| {
        a.stream_id.cmp(&b.stream_id).then(a.key.cmp(&b.key))
    };
    let by_sink = |a: &SinkRecord, b: &SinkRecord| a.sink_id.cmp(&b.sink_id).then(a.key.cmp(&b.key));
    plan.retained_streams.sort_by(by_stream);
    plan.purged_streams.sort_by(by_stream);
    plan.retained_sinks.sort_by(by_sink);
    plan.purged_sinks.sort_by(by_sink);

    plan
}
