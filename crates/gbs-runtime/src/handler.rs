//! Live session handlers and the seam that builds them from persisted records.

use std::sync::Arc;

use gbs_schemas::{PlatformRecord, TerminalDevice};

/// A long-lived signaling session (cascaded platform client or JT terminal).
///
/// `start` consumes an `Arc` so the handler can hand clones of itself to the
/// tasks it spawns. It must return promptly; registration and keepalive run
/// in the background.
pub trait SessionHandler: Send + Sync {
    /// Registry identity: server address for platforms, username for terminals.
    fn key(&self) -> &str;

    fn start(self: Arc<Self>);

    fn stop(&self);
}

/// Builds handlers from persisted records.
///
/// A construction error means the record itself cannot drive a session.
/// Recovery treats it as corrupt persisted state and refuses to continue.
pub trait HandlerFactory: Send + Sync {
    fn new_platform(&self, record: &PlatformRecord) -> anyhow::Result<Arc<dyn SessionHandler>>;

    fn new_terminal(&self, record: &TerminalDevice) -> anyhow::Result<Arc<dyn SessionHandler>>;
}
