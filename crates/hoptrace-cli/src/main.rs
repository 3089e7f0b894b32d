mod output;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use hoptrace_client::ReqwestProber;
use hoptrace_core::config::{DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
use hoptrace_core::{TraceConfig, TraceEngine, TraceEvent, normalize_url};

#[derive(Parser)]
#[command(name = "hoptrace", version, about = "Where does this link go? Redirect chain tracer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow a URL through HTTP, meta-refresh and JavaScript redirects
    Trace {
        /// URL to trace; https:// is assumed when no scheme is given
        url: String,

        /// Print the full result as JSON
        #[arg(long, conflicts_with = "stream")]
        json: bool,

        /// Print each event as a JSON line while the trace runs
        #[arg(long)]
        stream: bool,

        /// Allow tracing into private/reserved address ranges
        #[arg(long, default_value_t = false)]
        allow_private: bool,

        /// Maximum number of hops before giving up
        #[arg(
            long,
            env = "HOPTRACE_MAX_REDIRECTS",
            default_value_t = DEFAULT_MAX_REDIRECTS as u64,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        max_redirects: u64,

        /// Per-request timeout in milliseconds
        #[arg(
            long,
            env = "HOPTRACE_TIMEOUT_MS",
            default_value_t = DEFAULT_TIMEOUT.as_millis() as u64,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hoptrace=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trace {
            url,
            json,
            stream,
            allow_private,
            max_redirects,
            timeout_ms,
        } => {
            let config = TraceConfig::default()
                .with_max_redirects(
                    usize::try_from(max_redirects).context("--max-redirects is too large")?,
                )
                .with_timeout(Duration::from_millis(timeout_ms));

            let mut prober =
                ReqwestProber::with_timeout(config.timeout).context("Failed to create HTTP client")?;
            if allow_private {
                prober = prober.allow_private_urls();
            }
            let engine = TraceEngine::with_config(prober, config);

            let succeeded = if stream {
                cmd_stream(&engine, &url).await?
            } else {
                cmd_trace(&engine, &url, json).await?
            };

            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Run a buffered trace and print the result. Returns whether the trace succeeded.
async fn cmd_trace(engine: &TraceEngine<ReqwestProber>, url: &str, json: bool) -> Result<bool> {
    let start = normalize_url(url)?;

    if !json {
        println!("Tracing {start}\n");
    }

    let result = engine.trace(start).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in output::render(&result) {
            println!("{line}");
        }
    }

    Ok(result.is_success())
}

/// Print events as newline-delimited JSON while the trace runs.
async fn cmd_stream(engine: &TraceEngine<ReqwestProber>, url: &str) -> Result<bool> {
    let start = normalize_url(url)?;
    let mut events = Box::pin(engine.stream(start));
    let mut succeeded = false;

    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event)?);
        match event {
            TraceEvent::Complete => succeeded = true,
            TraceEvent::Error(_) => succeeded = false,
            _ => {}
        }
    }

    Ok(succeeded)
}
