use std::time::Duration;

use crate::error::AppError;

/// Maximum number of hops followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Budget for a single probe.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Limits applied to every trace. Immutable once an engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceConfig {
    pub max_redirects: usize,
    pub timeout: Duration,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TraceConfig {
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-request timeout in milliseconds, as reported in timeout errors.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Read configuration from environment variables.
    ///
    /// - `HOPTRACE_MAX_REDIRECTS` (optional, defaults to 10)
    /// - `HOPTRACE_TIMEOUT_MS` (optional, defaults to 5000)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("HOPTRACE_MAX_REDIRECTS") {
            config.max_redirects = parse_positive("HOPTRACE_MAX_REDIRECTS", &raw)? as usize;
        }
        if let Some(raw) = lookup("HOPTRACE_TIMEOUT_MS") {
            config.timeout = Duration::from_millis(parse_positive("HOPTRACE_TIMEOUT_MS", &raw)?);
        }

        Ok(config)
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, AppError> {
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(parsed)
}
