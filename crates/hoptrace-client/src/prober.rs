use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

use hoptrace_core::config::DEFAULT_TIMEOUT;
use hoptrace_core::error::AppError;
use hoptrace_core::traits::{ProbeMethod, ProbeResponse, Prober};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Response, redirect};
use url::Url;

/// User-Agent sent with every probe.
pub const DEFAULT_USER_AGENT: &str = "hoptrace/0.1 (Redirect Analyzer)";

/// Bytes of a GET body kept for scanning; the rest is never downloaded.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP prober using reqwest with automatic redirect following disabled.
///
/// Each call issues exactly one request and reports the raw status, headers
/// and (for GET) body. By default, SSRF protection is **enabled**: every
/// probed URL, including each redirect target, is checked against
/// private/reserved IP ranges. Use [`allow_private_urls`](Self::allow_private_urls)
/// to disable this (e.g., for CLI usage where the user controls the machine).
#[derive(Debug, Clone)]
pub struct ReqwestProber {
    client: Client,
    timeout_ms: u64,
    max_body_bytes: usize,
    ssrf_protection: bool,
}

impl ReqwestProber {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_ms,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            ssrf_protection: true,
        })
    }

    /// Keep at most `max_body_bytes` of each GET body.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Disable SSRF protection, allowing requests to private/reserved IPs.
    ///
    /// Only use this for CLI usage where the user controls the machine.
    pub fn allow_private_urls(mut self) -> Self {
        self.ssrf_protection = false;
        self
    }
}

impl Prober for ReqwestProber {
    async fn probe(&self, method: ProbeMethod, url: &Url) -> Result<ProbeResponse, AppError> {
        if self.ssrf_protection {
            validate_url(url).await?;
        }

        let http_method = match method {
            ProbeMethod::Head => Method::HEAD,
            ProbeMethod::Get => Method::GET,
        };

        let response = self
            .client
            .request(http_method, url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_ms)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        let headers = flatten_headers(response.headers());

        let body = match method {
            ProbeMethod::Head => None,
            ProbeMethod::Get => match read_prefix(response, self.max_body_bytes).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::debug!(%url, "Failed to read response body: {e}");
                    None
                }
            },
        };

        Ok(ProbeResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// Read the body up to `limit` bytes, decoding lossily.
async fn read_prefix(mut response: Response, limit: usize) -> Result<String, reqwest::Error> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Collapse a header map to one entry per name; repeated values are joined with `", "`.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate a URL to prevent server-side request forgery (SSRF).
///
/// 1. Only allow `http` and `https` schemes.
/// 2. Resolve the hostname via DNS.
/// 3. Reject if any resolved IP is private/reserved.
async fn validate_url(url: &Url) -> Result<(), AppError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::HttpError(format!(
                "URL scheme '{scheme}' is not allowed (only http/https)"
            )));
        }
    }

    let host = url
        .host_str()
        .ok_or_else(|| AppError::HttpError("URL has no host".to_string()))?;

    // IP literals are checked directly; IPv6 hosts arrive bracketed
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP"
            )));
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addr = format!("{host}:{port}");
    let addrs: Vec<_> = tokio::net::lookup_host(&addr)
        .await
        .map_err(|e| AppError::NetworkError(format!("DNS resolution failed for {host}: {e}")))?
        .collect();

    if addrs.is_empty() {
        return Err(AppError::NetworkError(format!(
            "DNS resolution returned no addresses for {host}"
        )));
    }

    for socket_addr in &addrs {
        if is_private_ip(socket_addr.ip()) {
            return Err(AppError::HttpError(format!(
                "SSRF blocked: {host} resolves to private/reserved IP {}",
                socket_addr.ip()
            )));
        }
    }

    Ok(())
}

/// Check if an IP address is in a private/reserved/link-local range.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // 169.254.0.0/16, cloud metadata
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // 100.64.0.0/10
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // fe80::/10
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // fc00::/7
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}
