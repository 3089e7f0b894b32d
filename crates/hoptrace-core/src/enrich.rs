//! Derived, non-authoritative metadata attached to each hop.
//!
//! Everything here is a pure function of a hop's URL and response headers.
//! Header names are matched case-insensitively.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

const URL_SHORTENERS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "ow.ly",
    "short.link",
    "rebrand.ly",
    "tiny.cc",
    "is.gd",
    "buff.ly",
    "soo.gd",
];

/// Pattern (host or host+path prefix) to platform name.
const SOCIAL_PLATFORMS: &[(&str, &str)] = &[
    ("l.facebook.com", "Facebook"),
    ("lm.facebook.com", "Facebook"),
    ("t.co", "Twitter"),
    ("linkedin.com/slink", "LinkedIn"),
    ("youtube.com/redirect", "YouTube"),
    ("instagram.com/linkshim", "Instagram"),
    ("out.reddit.com", "Reddit"),
    ("click.linksynergy.com", "Affiliate"),
    ("amazon.com/gp/redirect", "Amazon"),
];

const KNOWN_TRACKERS: &[&str] = &[
    "googleadservices.com",
    "doubleclick.net",
    "facebook.com/tr",
    "google-analytics.com",
    "googletagmanager.com",
    "hotjar.com",
    "mixpanel.com",
    "segment.com",
];

const AB_TEST_PARAMS: &[&str] = &["ab_test", "variant", "test_id", "experiment"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ServerInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub powered_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cdn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cache_control: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SslCertificate {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub valid_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_valid: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SecurityInfo {
    /// Reserved: certificate details are not collected by the prober.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ssl_certificate: Option<SslCertificate>,
    pub is_shortener: bool,
    pub known_tracker: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PerformanceInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_type: Option<String>,
    /// Always unset: computing it needs the uncompressed size, which is never known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub compression_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AnalyticsInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub utm_params: Option<BTreeMap<String, String>>,
    pub is_social_redirect: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub platform: Option<String>,
    pub is_ab_test: bool,
}

/// All enrichment attached to a hop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Enrichment {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub server_info: Option<ServerInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cache_info: Option<CacheInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub security_info: Option<SecurityInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub performance_info: Option<PerformanceInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub analytics_info: Option<AnalyticsInfo>,
}

/// Build the enrichment block for a hop probed at `url`.
pub fn enrich(url: &Url, headers: &BTreeMap<String, String>) -> Enrichment {
    Enrichment {
        server_info: Some(parse_server_info(headers)),
        cache_info: Some(parse_cache_info(headers)),
        security_info: Some(parse_security_info(url)),
        performance_info: Some(parse_performance_info(headers)),
        analytics_info: Some(parse_analytics_info(url)),
    }
}

fn header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn owned_header(headers: &BTreeMap<String, String>, name: &str) -> Option<String> {
    header(headers, name).map(str::to_string)
}

pub fn parse_server_info(headers: &BTreeMap<String, String>) -> ServerInfo {
    let edge = if header(headers, "cf-ray").is_some() {
        Some("Cloudflare")
    } else if header(headers, "x-served-by").is_some() {
        Some("Fastly")
    } else {
        None
    };
    let cdn = edge.or_else(|| header(headers, "x-cache").map(|_| "CDN"));

    ServerInfo {
        server: owned_header(headers, "server"),
        powered_by: owned_header(headers, "x-powered-by"),
        location: edge.map(str::to_string),
        cdn: cdn.map(str::to_string),
    }
}

pub fn parse_cache_info(headers: &BTreeMap<String, String>) -> CacheInfo {
    CacheInfo {
        cache_control: owned_header(headers, "cache-control"),
        etag: owned_header(headers, "etag"),
        last_modified: owned_header(headers, "last-modified"),
        expires: owned_header(headers, "expires"),
    }
}

pub fn parse_security_info(url: &Url) -> SecurityInfo {
    SecurityInfo {
        ssl_certificate: None,
        is_shortener: URL_SHORTENERS.iter().any(|entry| matches_entry(url, entry)),
        known_tracker: KNOWN_TRACKERS.iter().any(|entry| matches_entry(url, entry)),
    }
}

pub fn parse_performance_info(headers: &BTreeMap<String, String>) -> PerformanceInfo {
    PerformanceInfo {
        content_encoding: owned_header(headers, "content-encoding"),
        content_length: header(headers, "content-length").and_then(|v| v.trim().parse().ok()),
        content_type: owned_header(headers, "content-type"),
        compression_ratio: None,
    }
}

pub fn parse_analytics_info(url: &Url) -> AnalyticsInfo {
    let utm_params: BTreeMap<String, String> = url
        .query_pairs()
        .filter(|(key, _)| key.starts_with("utm_"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let platform = SOCIAL_PLATFORMS
        .iter()
        .find(|(entry, _)| matches_entry(url, entry))
        .map(|(_, name)| (*name).to_string());

    let is_ab_test = url
        .query_pairs()
        .any(|(key, _)| AB_TEST_PARAMS.contains(&key.as_ref()));

    AnalyticsInfo {
        utm_params: (!utm_params.is_empty()).then_some(utm_params),
        is_social_redirect: platform.is_some(),
        platform,
        is_ab_test,
    }
}

/// Match a table entry against `url`.
///
/// `host` entries match that host or any subdomain of it. `host/path`
/// entries additionally require the path to start with `/path`.
fn matches_entry(url: &Url, entry: &str) -> bool {
    let host = url.host_str().unwrap_or_default();
    match entry.find('/') {
        Some(slash) => {
            let (entry_host, entry_path) = entry.split_at(slash);
            host_matches(host, entry_host) && url.path().starts_with(entry_path)
        }
        None => host_matches(host, entry),
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host.eq_ignore_ascii_case(domain)
        || host
            .len()
            .checked_sub(domain.len() + 1)
            .is_some_and(|dot| {
                host.as_bytes()[dot] == b'.' && host[dot + 1..].eq_ignore_ascii_case(domain)
            })
}

/// True when `current` is on a different host than `previous`.
pub fn check_domain_change(current: &Url, previous: Option<&Url>) -> bool {
    match previous {
        Some(previous) => current.host_str() != previous.host_str(),
        None => false,
    }
}

/// Render the `max-age` of a `Cache-Control` value as `30s`, `5m`, `2h` or `3d`.
pub fn format_cache_duration(cache_control: Option<&str>) -> Option<String> {
    let value = cache_control?;
    let start = value.find("max-age=")? + "max-age=".len();
    let digits: String = value[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let seconds: u64 = digits.parse().ok()?;

    Some(match seconds {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86400),
    })
}

/// Render a byte count with one decimal, e.g. `1.5KB`.
pub fn format_file_size(bytes: Option<u64>) -> Option<String> {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let bytes = bytes.filter(|b| *b > 0)?;
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    Some(format!("{size:.1}{}", UNITS[unit]))
}
