//! Human-readable rendering of a trace result.

use std::time::Duration;

use hoptrace_core::enrich::{format_cache_duration, format_file_size};
use hoptrace_core::{Hop, TraceResult};

/// All output lines for `result`, chain first, then destination and summary.
pub fn render(result: &TraceResult) -> Vec<String> {
    let mut lines = Vec::new();

    if result.hops.is_empty() {
        lines.push("  No redirects.".to_string());
    }
    for (i, hop) in result.hops.iter().enumerate() {
        lines.push(hop_line(i + 1, hop));
        if let Some(details) = hop_details(hop) {
            lines.push(format!("       {details}"));
        }
    }
    lines.push(String::new());

    match &result.error {
        None => {
            let destination = &result.final_destination;
            let reachable = if destination.is_reachable {
                "reachable"
            } else {
                "unreachable"
            };
            lines.push(format!("Final: {} ({reachable})", destination.url));
            if let Some(title) = &destination.title {
                lines.push(format!("Title: {title}"));
            }
        }
        Some(error) => {
            lines.push(format!("Error: {error}"));
            lines.push(format!("Last URL: {}", result.final_destination.url));
        }
    }

    lines.push(format!(
        "Hops: {}  Total: {}  Avg: {}",
        result.chain_length(),
        millis(result.total_time),
        millis(result.average_response_time()),
    ));
    lines
}

/// `  1. 301 Moved Permanently [http] 120ms https://...`
pub fn hop_line(index: usize, hop: &Hop) -> String {
    let status = if hop.status_text.is_empty() {
        hop.status.to_string()
    } else {
        format!("{} {}", hop.status, hop.status_text)
    };
    format!(
        "{index:>3}. {status} [{}] {} {}",
        hop.redirect_type,
        millis(hop.response_time),
        hop.url
    )
}

/// Secondary line with server, cache and size facts, if any are known.
pub fn hop_details(hop: &Hop) -> Option<String> {
    let enrichment = &hop.enrichment;
    let mut parts = Vec::new();

    if let Some(server) = &enrichment.server_info {
        if let Some(name) = &server.server {
            parts.push(format!("server: {name}"));
        }
        if let Some(cdn) = &server.cdn {
            parts.push(format!("cdn: {cdn}"));
        }
    }
    if let Some(cache) = enrichment
        .cache_info
        .as_ref()
        .and_then(|c| format_cache_duration(c.cache_control.as_deref()))
    {
        parts.push(format!("cache: {cache}"));
    }
    if let Some(size) = enrichment
        .performance_info
        .as_ref()
        .and_then(|p| format_file_size(p.content_length))
    {
        parts.push(format!("size: {size}"));
    }
    if let Some(security) = &enrichment.security_info {
        if security.is_shortener {
            parts.push("shortener".to_string());
        }
        if security.known_tracker {
            parts.push("tracker".to_string());
        }
    }
    if hop.domain_changed {
        parts.push("domain changed".to_string());
    }

    (!parts.is_empty()).then(|| parts.join("  "))
}

fn millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}
