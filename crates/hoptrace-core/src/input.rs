use url::Url;

use crate::error::AppError;

/// Normalize user input into an absolute http(s) URL.
///
/// A bare host such as `example.com/path` gets an `https://` prefix.
/// Example: `" bit.ly/x "` → `"https://bit.ly/x"`
pub fn normalize_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::MissingUrl);
    }

    if trimmed.contains("://") {
        parse_absolute_url(trimmed)
    } else {
        parse_absolute_url(&format!("https://{trimmed}"))
    }
}

/// Parse an absolute http(s) URL without scheme inference.
pub fn parse_absolute_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::MissingUrl);
    }

    let url = Url::parse(trimmed).map_err(|e| AppError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::InvalidUrl(format!(
                "scheme '{scheme}' is not supported (only http/https)"
            )));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidUrl(format!("{trimmed}: missing host")));
    }

    Ok(url)
}
