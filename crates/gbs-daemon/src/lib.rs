//! gbs-daemon library target.
//!
//! Exposes the router, state and the standby handler factory for
//! integration tests. The binary `main.rs` depends on this library target.

pub mod api_types;
pub mod handlers;
pub mod routes;
pub mod state;
