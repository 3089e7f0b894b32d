use thiserror::Error;

/// Application-wide error types for hoptrace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No starting URL was supplied.
    #[error("URL is required")]
    MissingUrl,

    /// The starting URL cannot be parsed.
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// A 3xx response arrived without a `Location` header.
    #[error("Redirect response {status} but no Location header")]
    MissingLocation { status: u16 },

    /// A single probe exceeded the per-request budget (milliseconds).
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// The hop limit was reached before a terminus.
    #[error("Too many redirects (max {0})")]
    TooManyRedirects(usize),

    /// Network/connection error (DNS, refused connection, TLS).
    #[error("{0}")]
    NetworkError(String),

    /// Any other transport failure.
    #[error("{0}")]
    HttpError(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The consumer of a trace event stream went away.
    #[error("Event consumer disconnected")]
    SinkClosed,
}

impl AppError {
    /// Returns true if this error was caused by caller input rather than by the trace itself.
    pub fn is_input_error(&self) -> bool {
        matches!(self, AppError::MissingUrl | AppError::InvalidUrl(_))
    }

    /// Returns true if this error stops a running trace.
    ///
    /// Every failure except bad input is fatal: there are no retries.
    pub fn is_fatal_to_trace(&self) -> bool {
        !self.is_input_error() && !matches!(self, AppError::ConfigError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_limits() {
        assert_eq!(
            AppError::Timeout(5000).to_string(),
            "Request timeout after 5000ms"
        );
        assert_eq!(
            AppError::TooManyRedirects(10).to_string(),
            "Too many redirects (max 10)"
        );
        assert_eq!(
            AppError::MissingLocation { status: 302 }.to_string(),
            "Redirect response 302 but no Location header"
        );
    }

    #[test]
    fn test_transport_message_passes_through() {
        let err = AppError::NetworkError("connection refused".into());
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_error_classes() {
        assert!(AppError::MissingUrl.is_input_error());
        assert!(AppError::InvalidUrl("nope".into()).is_input_error());
        assert!(!AppError::InvalidUrl("nope".into()).is_fatal_to_trace());
        assert!(AppError::Timeout(5000).is_fatal_to_trace());
        assert!(AppError::MissingLocation { status: 301 }.is_fatal_to_trace());
        assert!(!AppError::ConfigError("bad".into()).is_fatal_to_trace());
    }
}
