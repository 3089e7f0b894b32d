use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::enrich::Enrichment;

/// How a hop redirected to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum RedirectKind {
    /// 3xx status with a `Location` header.
    Http,
    /// `<meta http-equiv="refresh">` in the page body.
    Meta,
    /// A `location` assignment in an inline script.
    Javascript,
    Unknown,
}

impl fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RedirectKind::Http => "http",
            RedirectKind::Meta => "meta",
            RedirectKind::Javascript => "javascript",
            RedirectKind::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One observed step in a redirect chain.
///
/// `url` is the URL that was probed; the target it redirected to is the
/// `url` of the next hop (or of the final destination).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Hop {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    /// Probe latency, serialized in milliseconds.
    #[serde(with = "duration_ms")]
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub response_time: Duration,
    pub timestamp: DateTime<Utc>,
    /// Raw response headers, names as received from the transport.
    pub headers: BTreeMap<String, String>,
    pub redirect_type: RedirectKind,
    pub is_secure: bool,
    /// Host differs from the previous hop's host.
    #[serde(default)]
    pub domain_changed: bool,
    #[serde(flatten)]
    pub enrichment: Enrichment,
}

/// Where a trace ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FinalDestination {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub url: Url,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    /// Part of the wire contract; nothing populates it yet.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub favicon: Option<String>,
    pub is_reachable: bool,
}

impl FinalDestination {
    /// Destination reported when a trace fails: the last URL attempted, never reachable.
    pub fn unreachable(url: Url) -> Self {
        Self {
            url,
            title: None,
            favicon: None,
            is_reachable: false,
        }
    }
}

/// Aggregate outcome of one buffered trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TraceResult {
    pub hops: Vec<Hop>,
    pub final_destination: FinalDestination,
    /// Sum of hop latencies, serialized in milliseconds.
    #[serde(with = "duration_ms")]
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub total_time: Duration,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl TraceResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn chain_length(&self) -> usize {
        self.hops.len()
    }

    pub fn has_redirects(&self) -> bool {
        !self.hops.is_empty()
    }

    /// Mean hop latency, zero for an empty chain.
    pub fn average_response_time(&self) -> Duration {
        match u32::try_from(self.hops.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => total_time(&self.hops) / n,
        }
    }
}

/// Payload of the `final` stream event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FinalEvent {
    #[serde(flatten)]
    pub destination: FinalDestination,
    #[serde(with = "duration_ms")]
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub total_time: Duration,
}

/// Progress events emitted while a trace runs.
///
/// Serialized as `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum TraceEvent {
    Hop(Hop),
    Final(FinalEvent),
    Error(String),
    Complete,
}

impl TraceEvent {
    /// True for the events after which nothing else is emitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceEvent::Error(_) | TraceEvent::Complete)
    }
}

/// Sum of the latencies of `hops`.
pub fn total_time(hops: &[Hop]) -> Duration {
    hops.iter().map(|hop| hop.response_time).sum()
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
