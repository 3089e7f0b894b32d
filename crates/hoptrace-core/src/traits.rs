use std::collections::BTreeMap;
use std::future::Future;

use tokio::sync::mpsc;
use url::Url;

use crate::error::AppError;
use crate::models::TraceEvent;

/// HTTP method used for a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeMethod {
    /// Header-only probe, used first on every hop.
    Head,
    /// Full probe whose body feeds the HTML scanner.
    Get,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Head => "HEAD",
            ProbeMethod::Get => "GET",
        }
    }
}

/// What a single probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    /// Canonical reason phrase; empty when unknown.
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Response body for GET probes. `None` for HEAD or when the body could not be read.
    pub body: Option<String>,
}

impl ProbeResponse {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Issues one network request without following redirects.
pub trait Prober: Send + Sync + Clone {
    fn probe(
        &self,
        method: ProbeMethod,
        url: &Url,
    ) -> impl Future<Output = Result<ProbeResponse, AppError>> + Send;
}

/// Receives trace events as the engine produces them.
///
/// Returning an error stops the trace; no further events are emitted.
pub trait TraceSink: Send {
    fn emit(&mut self, event: TraceEvent) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Buffers every event in memory.
impl TraceSink for Vec<TraceEvent> {
    async fn emit(&mut self, event: TraceEvent) -> Result<(), AppError> {
        self.push(event);
        Ok(())
    }
}

/// Forwards events to a channel; waits when the channel is full.
impl TraceSink for mpsc::Sender<TraceEvent> {
    async fn emit(&mut self, event: TraceEvent) -> Result<(), AppError> {
        self.send(event).await.map_err(|_| AppError::SinkClosed)
    }
}
