//! gbs-reconcile
//!
//! Startup reconciliation decisions, kept separate from the IO that feeds them:
//! - Device liveness: ON devices whose last heartbeat is within the TTL stay
//!   online; the rest expire. OFF devices are never touched.
//! - Media sessions: the media server is authoritative. A persisted stream or
//!   forward sink survives only if a live source/sink of a recognized
//!   protocol carries the same id.
//!
//! Deterministic, pure logic. No IO. No clock.

mod liveness;
mod sessions;

pub use liveness::{classify, plan_device_recovery, DeviceRecoveryPlan, Liveness};
pub use sessions::{
    is_reconcilable_sink, is_reconcilable_source, plan_session_reconcile, LiveInventory,
    SessionPlan, FORWARD_PROTOCOLS, INGEST_PROTOCOLS,
};
