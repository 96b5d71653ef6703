//! gbs-db
//!
//! Durable store for devices, cascaded platforms, JT terminals and the
//! media-session mirror. The recovery runtime only ever sees the
//! [`RecordStore`] trait; [`PgStore`] is the Postgres implementation.

mod pg;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gbs_schemas::{Device, PlatformRecord, SinkRecord, StreamRecord, TerminalDevice};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub use pg::PgStore;

pub const ENV_DB_URL: &str = "GBS_DATABASE_URL";

/// Connect to Postgres using GBS_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Persistence operations startup recovery and heartbeat handling depend on.
///
/// Bulk operations with an empty id/key list succeed without touching the
/// store. Bulk updates/deletes must be idempotent: re-applying them after a
/// partial failure converges to the same state.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn load_devices(&self) -> Result<Vec<Device>>;

    async fn load_platforms(&self) -> Result<Vec<PlatformRecord>>;

    async fn load_terminal_devices(&self) -> Result<Vec<TerminalDevice>>;

    async fn load_streams(&self) -> Result<Vec<StreamRecord>>;

    async fn load_forward_sinks(&self) -> Result<Vec<SinkRecord>>;

    /// Set status = OFF for exactly these device ids.
    async fn update_devices_offline(&self, device_ids: &[String]) -> Result<()>;

    async fn update_platform_offline(&self, server_addr: &str) -> Result<()>;

    async fn update_terminal_offline(&self, username: &str) -> Result<()>;

    /// Delete streams by store-internal key.
    async fn delete_streams_by_keys(&self, keys: &[i64]) -> Result<()>;

    /// Delete forward sinks by store-internal key.
    async fn delete_sinks_by_keys(&self, keys: &[i64]) -> Result<()>;

    /// Record a heartbeat: status ON, last heartbeat and remote address.
    /// Fails if the device is unknown.
    async fn refresh_heartbeat(&self, device_id: &str, now: DateTime<Utc>, remote_addr: &str) -> Result<()>;
}
