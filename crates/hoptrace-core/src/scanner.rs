//! HTML redirect scanner.
//!
//! Pattern matching over raw HTML source, not a parser: redirects assembled at
//! runtime, obfuscated attributes or unusual markup are missed. Malformed input
//! never fails a scan, it only yields fewer signals.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::models::RedirectKind;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<title[^>]*>([^<]+)</title>"));

/// `http-equiv` before `content`, then the reverse attribute order.
static META_REFRESH: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        compile(
            r#"(?is)<meta[^>]*http-equiv\s*=\s*["']?refresh["']?[^>]*content\s*=\s*["']\s*\d+(?:\.\d+)?\s*[;,]\s*url\s*=\s*['"]?([^"'>]+)["'][^>]*>"#,
        ),
        compile(
            r#"(?is)<meta[^>]*content\s*=\s*["']\s*\d+(?:\.\d+)?\s*[;,]\s*url\s*=\s*['"]?([^"'>]+)["'][^>]*http-equiv\s*=\s*["']?refresh["']?[^>]*>"#,
        ),
    ]
});

/// Checked in order; the first pattern with a match anywhere in the page wins.
static JS_REDIRECTS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        compile(r#"(?i)window\.location\s*=\s*["']([^"']+)["']"#),
        compile(r#"(?i)window\.location\.href\s*=\s*["']([^"']+)["']"#),
        compile(r#"(?i)location\.href\s*=\s*["']([^"']+)["']"#),
        compile(r#"(?i)location\s*=\s*["']([^"']+)["']"#),
    ]
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static scanner pattern must compile")
}

/// A redirect found in page source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlRedirect {
    pub target: Url,
    /// Either [`RedirectKind::Meta`] or [`RedirectKind::Javascript`].
    pub kind: RedirectKind,
}

/// Signals extracted from one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScan {
    pub title: Option<String>,
    pub redirect: Option<HtmlRedirect>,
}

/// Scan `html` fetched from `current` for a title and a client-side redirect.
///
/// A meta-refresh tag takes precedence over script assignments. A target
/// equal to `current` is not a redirect.
pub fn scan(html: &str, current: &Url) -> PageScan {
    let redirect = find_meta_refresh(html, current)
        .map(|target| HtmlRedirect {
            target,
            kind: RedirectKind::Meta,
        })
        .or_else(|| {
            find_js_redirect(html, current).map(|target| HtmlRedirect {
                target,
                kind: RedirectKind::Javascript,
            })
        })
        .filter(|redirect| redirect.target != *current);

    PageScan {
        title: extract_title(html),
        redirect,
    }
}

/// Text of the first `<title>` element, trimmed.
pub fn extract_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
}

fn find_meta_refresh(html: &str, current: &Url) -> Option<Url> {
    META_REFRESH
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .and_then(|m| resolve(current, m.as_str()))
}

fn find_js_redirect(html: &str, current: &Url) -> Option<Url> {
    JS_REDIRECTS
        .iter()
        .find_map(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .and_then(|m| resolve(current, m.as_str()))
}

fn resolve(current: &Url, target: &str) -> Option<Url> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    match current.join(target) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!(%current, target, "Ignoring unresolvable redirect target: {e}");
            None
        }
    }
}
