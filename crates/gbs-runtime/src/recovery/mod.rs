//! The four startup recovery phases.
//!
//! Each phase is a free function over the store, the live transport and the
//! registries so it can be driven on its own from tests. [`crate::startup`]
//! sequences them.

mod devices;
mod handlers;
mod sessions;

pub use devices::{recover_device_status, DeviceRecoveryReport};
pub use handlers::{reactivate_platforms, reactivate_terminals, ReactivationReport};
pub use sessions::{collect_live_inventory, reconcile_sessions, InvalidSessions};
