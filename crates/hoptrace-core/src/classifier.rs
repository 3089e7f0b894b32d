//! Decides whether a probe response is a redirect or a terminus.

use url::Url;

use crate::error::AppError;
use crate::models::RedirectKind;
use crate::scanner;
use crate::traits::ProbeResponse;

/// Outcome of classifying a non-HTTP-redirect page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The page sends the client elsewhere.
    Redirect { target: Url, kind: RedirectKind },
    /// No further redirect; `title` is the page title if one was found.
    Terminus { title: Option<String> },
}

/// Status in `[300, 400)`.
pub fn is_http_redirect(status: u16) -> bool {
    (300..400).contains(&status)
}

/// Classify a response by its status line and `Location` header only.
///
/// Returns the resolved target for a 3xx response, `None` for anything else.
/// A 3xx without `Location` is a protocol error, not a terminus.
pub fn classify_http(response: &ProbeResponse, source: &Url) -> Result<Option<Url>, AppError> {
    if !is_http_redirect(response.status) {
        return Ok(None);
    }

    let location = response
        .header("location")
        .map(str::trim)
        .filter(|loc| !loc.is_empty())
        .ok_or(AppError::MissingLocation {
            status: response.status,
        })?;

    source.join(location).map(Some).map_err(|e| {
        AppError::HttpError(format!("Invalid Location header '{location}': {e}"))
    })
}

/// Classify a fetched page by scanning its body for meta-refresh and script redirects.
///
/// A missing body is scanned as empty so the terminus path stays reachable.
pub fn classify_page(response: &ProbeResponse, source: &Url) -> Classification {
    let scan = scanner::scan(response.body.as_deref().unwrap_or_default(), source);

    match scan.redirect {
        Some(redirect) => Classification::Redirect {
            target: redirect.target,
            kind: redirect.kind,
        },
        None => Classification::Terminus { title: scan.title },
    }
}
