use hoptrace_client::ReqwestProber;
use hoptrace_core::error::AppError;
use hoptrace_core::{TraceConfig, TraceEngine};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub engine: TraceEngine<ReqwestProber>,
}

impl AppState {
    pub fn new(engine: TraceEngine<ReqwestProber>) -> Self {
        Self { engine }
    }

    /// Build the engine from environment variables.
    ///
    /// - `HOPTRACE_MAX_REDIRECTS` / `HOPTRACE_TIMEOUT_MS` (see [`TraceConfig::from_env`])
    /// - `HOPTRACE_ALLOW_PRIVATE_URLS` (optional, defaults to false)
    pub fn from_env() -> Result<Self, AppError> {
        let config = TraceConfig::from_env()?;
        let mut prober = ReqwestProber::with_timeout(config.timeout)?;

        let allow_private = std::env::var("HOPTRACE_ALLOW_PRIVATE_URLS").ok();
        if parse_flag("HOPTRACE_ALLOW_PRIVATE_URLS", allow_private.as_deref())? {
            tracing::warn!("SSRF protection disabled: private addresses can be traced");
            prober = prober.allow_private_urls();
        }

        Ok(Self::new(TraceEngine::with_config(prober, config)))
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool, AppError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => Err(AppError::ConfigError(format!(
            "Invalid {name} '{other}': must be true or false"
        ))),
    }
}
