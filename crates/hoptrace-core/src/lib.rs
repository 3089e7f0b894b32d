pub mod classifier;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod input;
pub mod models;
pub mod scanner;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use config::TraceConfig;
pub use engine::{ResultBuilder, TraceEngine, TraceFailure, TraceOutcome};
pub use error::AppError;
pub use input::{normalize_url, parse_absolute_url};
pub use models::{FinalDestination, FinalEvent, Hop, RedirectKind, TraceEvent, TraceResult};
pub use traits::{ProbeMethod, ProbeResponse, Prober, TraceSink};
