//! gbs-daemon entry point.
//!
//! Boot order: env + tracing, layered config, database, startup recovery,
//! heartbeat sweep, then the HTTP status API. A fatal recovery error ends
//! the process before anything is served.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use gbs_config::{report_unused_keys, ServerSettings, UnusedKeyPolicy};
use gbs_daemon::{api_types::RecoverySummary, handlers::StandbyHandlerFactory, routes, state};
use gbs_db::PgStore;
use gbs_media::HttpLiveTransport;
use gbs_runtime::{spawn_heartbeat_sweep, Registries, StartupRecovery};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "gbs-daemon")]
#[command(about = "Media signaling server: startup recovery and status API", long_about = None)]
struct Args {
    /// Layered config paths in merge order
    #[arg(long = "config")]
    config_paths: Vec<String>,

    /// Fail startup on config keys nothing reads
    #[arg(long, default_value_t = false)]
    strict_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();
    // pin the uptime origin to process start
    state::uptime_secs();
    let args = Args::parse();

    let settings = load_settings(&args)?;

    let pool = gbs_db::connect_from_env().await?;
    gbs_db::migrate(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let transport = HttpLiveTransport::new(settings.media_server_url.clone(), settings.media_timeout)
        .context("media server client")?;

    let registries = Arc::new(Registries::new());
    let recovery = StartupRecovery::new(
        store.clone(),
        Arc::new(transport),
        Arc::new(StandbyHandlerFactory),
        Arc::clone(&registries),
        settings.liveness_ttl(),
    );

    let report = match recovery.run(chrono::Utc::now()).await {
        Ok(r) => r,
        Err(e) => {
            error!(kind = %e.kind(), key = %e.key(), "startup recovery failed: {e}");
            registries.teardown();
            return Err(e.into());
        }
    };

    for s in &report.sessions.streams {
        info!(stream_id = %s.stream_id, protocol = %s.protocol, "stale stream requires teardown");
    }
    for s in &report.sessions.sinks {
        info!(sink_id = %s.sink_id, source_id = %s.source_id, "stale sink requires teardown");
    }

    let sweep = spawn_heartbeat_sweep(
        store,
        Arc::clone(&registries),
        settings.liveness_ttl(),
        settings.sweep_interval,
    );

    let shared = Arc::new(
        state::AppState::new(Arc::clone(&registries)).with_recovery(RecoverySummary::from(&report)),
    );

    let app = routes::build_router(shared).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr: SocketAddr = settings
        .http_listen_addr
        .parse()
        .with_context(|| format!("invalid /http/listen_addr '{}'", settings.http_listen_addr))?;
    info!("gbs-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    sweep.abort();
    let stopped = registries.teardown();
    info!(handlers = stopped, "gbs-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load_settings(args: &Args) -> anyhow::Result<ServerSettings> {
    if args.config_paths.is_empty() {
        info!("no --config given; using defaults");
        return Ok(ServerSettings::default());
    }

    let path_refs: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = gbs_config::load_layered_yaml(&path_refs)?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = report_unused_keys(&loaded.config_json, policy)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "config keys not read by the daemon");
    }

    ServerSettings::from_config_json(&loaded.config_json)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "ctrl-c handler failed; shutting down");
    }
    info!("shutdown requested");
}
