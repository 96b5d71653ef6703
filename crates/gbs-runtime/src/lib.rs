//! gbs-runtime
//!
//! Process-lifetime state and the one-shot startup recovery that rebuilds it.
//!
//! On start the durable store may disagree with the media server (either side
//! may have restarted) and with wall-clock liveness. Recovery runs four
//! independent phases in order:
//!
//! 1. device status: seed the online registry, flag expired devices OFF
//! 2. session reconciliation: purge stream/sink rows the media server no
//!    longer carries and report them for teardown
//! 3. platform reactivation: cascaded peers back into live handlers
//! 4. terminal reactivation: JT terminals back into live handlers
//!
//! Only a record that cannot become a handler, or two records claiming the
//! same registry key, stops the process. Everything else is logged and
//! left for the next sweep or restart to converge.

pub mod error;
pub mod handler;
pub mod recovery;
pub mod registry;
pub mod startup;
pub mod sweep;

pub use error::{RecordKind, RecoveryError};
pub use handler::{HandlerFactory, SessionHandler};
pub use recovery::{
    collect_live_inventory, reactivate_platforms, reactivate_terminals, reconcile_sessions,
    recover_device_status, DeviceRecoveryReport, InvalidSessions, ReactivationReport,
};
pub use registry::{HandlerRegistry, OnlineRegistry, Registries, RegistryError};
pub use startup::{StartupRecovery, StartupReport};
pub use sweep::{record_heartbeat, spawn_heartbeat_sweep, sweep_expired_devices};
