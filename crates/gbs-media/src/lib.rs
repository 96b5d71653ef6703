//! gbs-media
//!
//! Query boundary to the live media server. The media server is the ground
//! truth for which ingest sources and forward sinks exist right now; this
//! crate only reads that state; it never creates or closes sessions.

use std::fmt;
use std::time::Duration;

use gbs_schemas::{LiveSink, LiveSource};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum TransportError {
    /// Connection, timeout or body-read failure.
    Transport(String),
    /// Non-2xx HTTP status or an envelope code other than 200.
    Api { code: Option<i64>, message: String },
    /// Response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Transport(msg) => write!(f, "media server transport error: {msg}"),
            TransportError::Api {
                code: Some(c),
                message,
            } => write!(f, "media server api error code={c}: {message}"),
            TransportError::Api {
                code: None,
                message,
            } => write!(f, "media server api error: {message}"),
            TransportError::Decode(msg) => write!(f, "media server decode error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// LiveTransport
// ---------------------------------------------------------------------------

/// Read-only view of the live media server.
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    /// Every source currently live, of every protocol.
    async fn list_sources(&self) -> Result<Vec<LiveSource>, TransportError>;

    /// Every sink currently attached to `source_id`, of every protocol.
    async fn list_sinks_of(&self, source_id: &str) -> Result<Vec<LiveSink>, TransportError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

const SOURCE_LIST_PATH: &str = "api/v1/source/list";
const SINK_LIST_PATH: &str = "api/v1/sink/list";

/// JSON-over-HTTP client for the media server's query API.
///
/// Every response is wrapped as `{"code": 200, "msg": "...", "data": ...}`.
#[derive(Debug, Clone)]
pub struct HttpLiveTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLiveTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<Option<T>, TransportError> {
        let url = self.url(path);
        debug!(%url, "media server query");

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Transport(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| TransportError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Api {
                code: Some(i64::from(status.as_u16())),
                message: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))?;
        if envelope.code != 200 {
            return Err(TransportError::Api {
                code: Some(envelope.code),
                message: envelope.msg,
            });
        }
        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl LiveTransport for HttpLiveTransport {
    async fn list_sources(&self) -> Result<Vec<LiveSource>, TransportError> {
        let data: Option<Vec<SourceDetails>> = self.call(SOURCE_LIST_PATH, json!({})).await?;
        Ok(data
            .unwrap_or_default()
            .into_iter()
            .map(|s| LiveSource::new(s.id, s.protocol))
            .collect())
    }

    async fn list_sinks_of(&self, source_id: &str) -> Result<Vec<LiveSink>, TransportError> {
        let data: Option<Vec<SinkDetails>> = self
            .call(SINK_LIST_PATH, json!({ "source": source_id }))
            .await?;
        Ok(data
            .unwrap_or_default()
            .into_iter()
            .map(|s| LiveSink::new(s.id, s.protocol))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SourceDetails {
    id: String,
    protocol: String,
}

#[derive(Debug, Deserialize)]
struct SinkDetails {
    id: String,
    protocol: String,
}
