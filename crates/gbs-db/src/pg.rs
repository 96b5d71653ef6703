use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use gbs_schemas::{
    Device, DeviceInfo, OnlineStatus, PlatformRecord, SinkRecord, SipUaOptions, StreamRecord,
    TerminalDevice,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::RecordStore;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert or update a device keyed by device_id.
    pub async fn save_device(&self, d: &Device) -> Result<()> {
        sqlx::query(
            r#"
            insert into devices (
              device_id, name, transport, remote_addr, manufacturer, model, firmware,
              status, register_time, last_heartbeat
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            )
            on conflict (device_id) do update
            set transport = excluded.transport,
                remote_addr = excluded.remote_addr,
                status = excluded.status,
                register_time = excluded.register_time,
                last_heartbeat = excluded.last_heartbeat
            "#,
        )
        .bind(&d.device_id)
        .bind(&d.name)
        .bind(&d.transport)
        .bind(&d.remote_addr)
        .bind(&d.manufacturer)
        .bind(&d.model)
        .bind(&d.firmware)
        .bind(d.status.as_str())
        .bind(d.register_time)
        .bind(d.last_heartbeat)
        .execute(&self.pool)
        .await
        .context("save_device failed")?;
        Ok(())
    }

    pub async fn query_device(&self, device_id: &str) -> Result<Option<Device>> {
        let row = sqlx::query(&format!("select {DEVICE_COLUMNS} from devices where device_id = $1"))
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await
            .context("query_device failed")?;
        row.as_ref().map(device_from_row).transpose()
    }

    /// One page of devices ordered by device_id, plus the total device count.
    /// `page` is 1-based; 0 is read as 1.
    pub async fn query_devices(&self, page: u32, size: u32) -> Result<(Vec<Device>, i64)> {
        if size == 0 {
            return Err(anyhow!("query_devices: page size must be > 0"));
        }
        let offset = i64::from(page.max(1) - 1) * i64::from(size);

        let (total,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*) from devices")
            .fetch_one(&self.pool)
            .await
            .context("query_devices count failed")?;

        let rows = sqlx::query(&format!(
            "select {DEVICE_COLUMNS} from devices order by device_id limit $1 offset $2"
        ))
        .bind(i64::from(size))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("query_devices failed")?;

        let devices = rows.iter().map(device_from_row).collect::<Result<Vec<_>>>()?;
        Ok((devices, total))
    }

    pub async fn exist_device(&self, device_id: &str) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as::<_, (bool,)>("select exists(select 1 from devices where device_id = $1)")
                .bind(device_id)
                .fetch_one(&self.pool)
                .await
                .context("exist_device failed")?;
        Ok(exists)
    }

    pub async fn update_device_status(&self, device_id: &str, status: OnlineStatus) -> Result<()> {
        let res = sqlx::query("update devices set status = $2 where device_id = $1")
            .bind(device_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("update_device_status failed")?;

        if res.rows_affected() == 0 {
            return Err(anyhow!("update_device_status: unknown device {device_id}"));
        }
        Ok(())
    }

    /// Overwrite the catalog fields that are non-empty in `info`; empty ones
    /// keep the stored value.
    pub async fn update_device_info(&self, device_id: &str, info: &DeviceInfo) -> Result<()> {
        let res = sqlx::query(
            r#"
            update devices
            set name         = case when $2 = '' then name else $2 end,
                manufacturer = case when $3 = '' then manufacturer else $3 end,
                model        = case when $4 = '' then model else $4 end,
                firmware     = case when $5 = '' then firmware else $5 end
            where device_id = $1
            "#,
        )
        .bind(device_id)
        .bind(&info.name)
        .bind(&info.manufacturer)
        .bind(&info.model)
        .bind(&info.firmware)
        .execute(&self.pool)
        .await
        .context("update_device_info failed")?;

        if res.rows_affected() == 0 {
            return Err(anyhow!("update_device_info: unknown device {device_id}"));
        }
        Ok(())
    }

    pub async fn save_platform(&self, p: &PlatformRecord) -> Result<()> {
        sqlx::query(
            r#"
            insert into platforms (server_addr, options, status)
            values ($1, $2, $3)
            "#,
        )
        .bind(p.server_addr())
        .bind(Json(&p.options))
        .bind(p.status.as_str())
        .execute(&self.pool)
        .await
        .context("save_platform failed")?;
        Ok(())
    }

    pub async fn save_terminal_device(&self, t: &TerminalDevice) -> Result<()> {
        sqlx::query(
            r#"
            insert into jt_devices (
              username, name, server_id, server_addr, transport, sim_number, status
            ) values (
              $1, $2, $3, $4, $5, $6, $7
            )
            "#,
        )
        .bind(&t.username)
        .bind(&t.name)
        .bind(&t.server_id)
        .bind(&t.server_addr)
        .bind(&t.transport)
        .bind(&t.sim_number)
        .bind(t.status.as_str())
        .execute(&self.pool)
        .await
        .context("save_terminal_device failed")?;
        Ok(())
    }

    /// Insert a stream row and return its store key.
    pub async fn save_stream(&self, stream_id: &str, protocol: &str) -> Result<i64> {
        let (key,): (i64,) = sqlx::query_as::<_, (i64,)>(
            r#"
            insert into streams (stream_id, protocol) values ($1, $2)
            returning id
            "#,
        )
        .bind(stream_id)
        .bind(protocol)
        .fetch_one(&self.pool)
        .await
        .context("save_stream failed")?;
        Ok(key)
    }

    /// Insert a forward sink row and return its store key.
    pub async fn save_forward_sink(&self, sink_id: &str, source_id: &str, protocol: &str) -> Result<i64> {
        let (key,): (i64,) = sqlx::query_as::<_, (i64,)>(
            r#"
            insert into forward_sinks (sink_id, source_id, protocol) values ($1, $2, $3)
            returning id
            "#,
        )
        .bind(sink_id)
        .bind(source_id)
        .bind(protocol)
        .fetch_one(&self.pool)
        .await
        .context("save_forward_sink failed")?;
        Ok(key)
    }
}

const DEVICE_COLUMNS: &str = "device_id, name, transport, remote_addr, manufacturer, model, firmware, \
     status, register_time, last_heartbeat";

fn device_from_row(row: &PgRow) -> Result<Device> {
    Ok(Device {
        device_id: row.try_get("device_id")?,
        name: row.try_get("name")?,
        transport: row.try_get("transport")?,
        remote_addr: row.try_get("remote_addr")?,
        manufacturer: row.try_get("manufacturer")?,
        model: row.try_get("model")?,
        firmware: row.try_get("firmware")?,
        status: parse_status(row)?,
        register_time: row.try_get("register_time")?,
        last_heartbeat: row.try_get("last_heartbeat")?,
    })
}

fn parse_status(row: &PgRow) -> Result<OnlineStatus> {
    let raw: String = row.try_get("status")?;
    OnlineStatus::parse(&raw).ok_or_else(|| anyhow!("invalid online status: {raw}"))
}

#[async_trait::async_trait]
impl RecordStore for PgStore {
    async fn load_devices(&self) -> Result<Vec<Device>> {
        let rows = sqlx::query(&format!("select {DEVICE_COLUMNS} from devices order by device_id"))
            .fetch_all(&self.pool)
            .await
            .context("load_devices failed")?;

        rows.iter().map(device_from_row).collect()
    }

    async fn load_platforms(&self) -> Result<Vec<PlatformRecord>> {
        let rows = sqlx::query("select options, status from platforms order by id")
            .fetch_all(&self.pool)
            .await
            .context("load_platforms failed")?;

        rows.iter()
            .map(|row| -> Result<PlatformRecord> {
                let Json(options): Json<SipUaOptions> = row.try_get("options")?;
                Ok(PlatformRecord {
                    options,
                    status: parse_status(row)?,
                })
            })
            .collect()
    }

    async fn load_terminal_devices(&self) -> Result<Vec<TerminalDevice>> {
        let rows = sqlx::query(
            r#"
            select username, name, server_id, server_addr, transport, sim_number, status
            from jt_devices
            order by id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("load_terminal_devices failed")?;

        rows.iter()
            .map(|row| -> Result<TerminalDevice> {
                Ok(TerminalDevice {
                    username: row.try_get("username")?,
                    name: row.try_get("name")?,
                    server_id: row.try_get("server_id")?,
                    server_addr: row.try_get("server_addr")?,
                    transport: row.try_get("transport")?,
                    sim_number: row.try_get("sim_number")?,
                    status: parse_status(row)?,
                })
            })
            .collect()
    }

    async fn load_streams(&self) -> Result<Vec<StreamRecord>> {
        let rows = sqlx::query("select id, stream_id, protocol, created_at from streams order by id")
            .fetch_all(&self.pool)
            .await
            .context("load_streams failed")?;

        rows.iter()
            .map(|row| -> Result<StreamRecord> {
                Ok(StreamRecord {
                    key: row.try_get("id")?,
                    stream_id: row.try_get("stream_id")?,
                    protocol: row.try_get("protocol")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn load_forward_sinks(&self) -> Result<Vec<SinkRecord>> {
        let rows = sqlx::query(
            "select id, sink_id, source_id, protocol, created_at from forward_sinks order by id",
        )
        .fetch_all(&self.pool)
        .await
        .context("load_forward_sinks failed")?;

        rows.iter()
            .map(|row| -> Result<SinkRecord> {
                Ok(SinkRecord {
                    key: row.try_get("id")?,
                    sink_id: row.try_get("sink_id")?,
                    source_id: row.try_get("source_id")?,
                    protocol: row.try_get("protocol")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn update_devices_offline(&self, device_ids: &[String]) -> Result<()> {
        if device_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("update devices set status = 'OFF' where device_id = any($1)")
            .bind(device_ids)
            .execute(&self.pool)
            .await
            .context("update_devices_offline failed")?;
        Ok(())
    }

    async fn update_platform_offline(&self, server_addr: &str) -> Result<()> {
        sqlx::query("update platforms set status = 'OFF' where server_addr = $1")
            .bind(server_addr)
            .execute(&self.pool)
            .await
            .context("update_platform_offline failed")?;
        Ok(())
    }

    async fn update_terminal_offline(&self, username: &str) -> Result<()> {
        sqlx::query("update jt_devices set status = 'OFF' where username = $1")
            .bind(username)
            .execute(&self.pool)
            .await
            .context("update_terminal_offline failed")?;
        Ok(())
    }

    async fn delete_streams_by_keys(&self, keys: &[i64]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        sqlx::query("delete from streams where id = any($1)")
            .bind(keys)
            .execute(&self.pool)
            .await
            .context("delete_streams_by_keys failed")?;
        Ok(())
    }

    async fn delete_sinks_by_keys(&self, keys: &[i64]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        sqlx::query("delete from forward_sinks where id = any($1)")
            .bind(keys)
            .execute(&self.pool)
            .await
            .context("delete_sinks_by_keys failed")?;
        Ok(())
    }

    async fn refresh_heartbeat(&self, device_id: &str, now: DateTime<Utc>, remote_addr: &str) -> Result<()> {
        let res = sqlx::query(
            r#"
            update devices
            set last_heartbeat = $2,
                status = 'ON',
                remote_addr = $3
            where device_id = $1
            "#,
        )
        .bind(device_id)
        .bind(now)
        .bind(remote_addr)
        .execute(&self.pool)
        .await
        .context("refresh_heartbeat failed")?;

        if res.rows_affected() == 0 {
            return Err(anyhow!("refresh_heartbeat: unknown device {device_id}"));
        }
        Ok(())
    }
}
