use std::sync::Arc;

use gbs_db::RecordStore;
use tracing::{error, info, warn};

use crate::error::{RecordKind, RecoveryError};
use crate::handler::{HandlerFactory, SessionHandler};
use crate::registry::{HandlerRegistry, RegistryError};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReactivationReport {
    /// Registry keys of started handlers, in load order.
    pub started: Vec<String>,
    /// Records whose OFF write failed; their handlers still started.
    pub offline_write_failures: usize,
}

/// Rebuild a handler for every persisted cascaded platform.
///
/// Each handler is registered under its server address, the record is
/// flagged OFF (the handler flips it back once registration succeeds), and
/// the handler is started. A load failure skips the phase. A record the
/// factory rejects, or a second record for an address already registered,
/// is fatal.
pub async fn reactivate_platforms(
    store: &dyn RecordStore,
    factory: &dyn HandlerFactory,
    registry: &HandlerRegistry<dyn SessionHandler>,
) -> Result<ReactivationReport, RecoveryError> {
    let records = match store.load_platforms().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %format!("{e:#}"), "platform reactivation skipped: load failed");
            return Ok(ReactivationReport::default());
        }
    };

    let mut report = ReactivationReport::default();
    for record in &records {
        let handler = factory
            .new_platform(record)
            .map_err(|e| corrupt(RecordKind::Platform, record.server_addr(), &e))?;
        let key = register(registry, RecordKind::Platform, &handler)?;

        if let Err(e) = store.update_platform_offline(record.server_addr()).await {
            warn!(server_addr = %record.server_addr(), error = %format!("{e:#}"), "failed to flag platform offline");
            report.offline_write_failures += 1;
        }

        Arc::clone(&handler).start();
        report.started.push(key);
    }

    info!(started = report.started.len(), "platforms reactivated");
    Ok(report)
}

/// Rebuild a handler for every persisted JT terminal, keyed by username.
/// Same failure handling as [`reactivate_platforms`].
pub async fn reactivate_terminals(
    store: &dyn RecordStore,
    factory: &dyn HandlerFactory,
    registry: &HandlerRegistry<dyn SessionHandler>,
) -> Result<ReactivationReport, RecoveryError> {
    let records = match store.load_terminal_devices().await {
        Ok(r) => r,
        Err(e) => {
            error!(error = %format!("{e:#}"), "terminal reactivation skipped: load failed");
            return Ok(ReactivationReport::default());
        }
    };

    let mut report = ReactivationReport::default();
    for record in &records {
        let handler = factory
            .new_terminal(record)
            .map_err(|e| corrupt(RecordKind::Terminal, &record.username, &e))?;
        let key = register(registry, RecordKind::Terminal, &handler)?;

        if let Err(e) = store.update_terminal_offline(&record.username).await {
            warn!(username = %record.username, error = %format!("{e:#}"), "failed to flag terminal offline");
            report.offline_write_failures += 1;
        }

        Arc::clone(&handler).start();
        report.started.push(key);
    }

    info!(started = report.started.len(), "terminals reactivated");
    Ok(report)
}

fn corrupt(kind: RecordKind, key: &str, cause: &anyhow::Error) -> RecoveryError {
    let err = RecoveryError::CorruptPersistedState {
        kind,
        key: key.to_string(),
        reason: format!("{cause:#}"),
    };
    error!(%kind, %key, error = %err, "persisted record cannot be reactivated");
    err
}

fn register(
    registry: &HandlerRegistry<dyn SessionHandler>,
    kind: RecordKind,
    handler: &Arc<dyn SessionHandler>,
) -> Result<String, RecoveryError> {
    let key = handler.key().to_string();
    registry
        .insert(key.clone(), Arc::clone(handler))
        .map_err(|RegistryError::DuplicateKey { key, .. }| {
            error!(%kind, %key, "duplicate registry key during reactivation");
            RecoveryError::RegistryConflict { kind, key }
        })?;
    Ok(key)
}
