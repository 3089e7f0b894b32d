use chrono::Utc;
use futures::Stream;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

use crate::classifier::{Classification, classify_http, classify_page};
use crate::config::TraceConfig;
use crate::enrich::{check_domain_change, enrich};
use crate::error::AppError;
use crate::models::{
    FinalDestination, FinalEvent, Hop, RedirectKind, TraceEvent, TraceResult, total_time,
};
use crate::traits::{ProbeMethod, ProbeResponse, Prober, TraceSink};

/// Events buffered between a streaming trace and its consumer.
const STREAM_BUFFER: usize = 16;

/// Why a trace stopped before reaching a terminus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFailure {
    /// URL being probed when the trace failed.
    pub last_url: Url,
    pub error: AppError,
}

/// Result of driving one trace to its end.
pub type TraceOutcome = Result<FinalDestination, TraceFailure>;

/// Follows a URL through HTTP, meta-refresh and script redirects.
///
/// Generic over the network layer via [`Prober`], so the loop can be driven
/// without real HTTP. Every delivery mode goes through [`run`](Self::run):
/// buffered tracing collects its events, streaming forwards them.
#[derive(Debug, Clone)]
pub struct TraceEngine<P: Prober> {
    prober: P,
    config: TraceConfig,
}

impl<P: Prober> TraceEngine<P> {
    /// Create an engine with the default limits (10 hops, 5000 ms per probe).
    pub fn new(prober: P) -> Self {
        Self::with_config(prober, TraceConfig::default())
    }

    pub fn with_config(prober: P, config: TraceConfig) -> Self {
        Self { prober, config }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Trace `start` to completion and return the aggregate result.
    ///
    /// Failures are reported inside the result together with the hops
    /// gathered so far; this never returns an error.
    pub async fn trace(&self, start: Url) -> TraceResult {
        let mut builder = ResultBuilder::default();
        let outcome = self.run(start, &mut builder).await;
        builder.finish(outcome)
    }

    /// Drive the redirect loop, emitting every event to `sink` as it happens.
    ///
    /// Emits one `hop` per recorded hop, then either `final` followed by
    /// `complete`, or a single `error`. If the sink rejects an event the
    /// trace stops without emitting anything else.
    pub async fn run<S: TraceSink>(&self, start: Url, sink: &mut S) -> TraceOutcome {
        let span = tracing::info_span!("trace", id = %Uuid::new_v4(), start = %start);
        self.run_inner(start, sink).instrument(span).await
    }

    async fn run_inner<S: TraceSink>(&self, start: Url, sink: &mut S) -> TraceOutcome {
        tracing::info!("Tracing {}", start);

        let mut hops: Vec<Hop> = Vec::new();
        let mut current = start;

        for _ in 0..self.config.max_redirects {
            let started = Instant::now();

            // 1. HEAD probe, classified on status + Location alone
            let head = match self.probe(ProbeMethod::Head, &current).await {
                Ok(response) => response,
                Err(e) => return fail(sink, current, e).await,
            };
            let head_latency = started.elapsed();

            match classify_http(&head, &current) {
                Ok(Some(target)) => {
                    let hop = build_hop(hops.last(), &current, head, RedirectKind::Http, head_latency);
                    if let Err(e) = record(sink, &mut hops, hop).await {
                        return Err(TraceFailure { last_url: current, error: e });
                    }
                    current = target;
                    continue;
                }
                Ok(None) => {}
                Err(e) => return fail(sink, current, e).await,
            }

            // 2. GET probe for the body; some servers only redirect on GET
            let page = match self.probe(ProbeMethod::Get, &current).await {
                Ok(response) => response,
                Err(e) => return fail(sink, current, e).await,
            };

            let (target, kind) = match classify_http(&page, &current) {
                Ok(Some(target)) => (target, RedirectKind::Http),
                Ok(None) => match classify_page(&page, &current) {
                    Classification::Redirect { target, kind } => (target, kind),
                    Classification::Terminus { title } => {
                        return finish(sink, &hops, current, title, &page).await;
                    }
                },
                Err(e) => return fail(sink, current, e).await,
            };

            let hop = build_hop(hops.last(), &current, page, kind, started.elapsed());
            if let Err(e) = record(sink, &mut hops, hop).await {
                return Err(TraceFailure { last_url: current, error: e });
            }
            current = target;
        }

        fail(
            sink,
            current,
            AppError::TooManyRedirects(self.config.max_redirects),
        )
        .await
    }

    /// Issue one probe bounded by the per-request timeout.
    async fn probe(&self, method: ProbeMethod, url: &Url) -> Result<ProbeResponse, AppError> {
        tracing::debug!(method = method.as_str(), %url, "Probing");

        match tokio::time::timeout(self.config.timeout, self.prober.probe(method, url)).await {
            Ok(Err(AppError::Timeout(_))) | Err(_) => {
                Err(AppError::Timeout(self.config.timeout_ms()))
            }
            Ok(result) => result,
        }
    }
}

impl<P: Prober + 'static> TraceEngine<P> {
    /// Trace `start` on a background task, yielding events as they are produced.
    ///
    /// The stream ends after `complete` or `error`. Dropping it stops the
    /// trace at its next emission. Must be called within a Tokio runtime.
    pub fn stream(&self, start: Url) -> impl Stream<Item = TraceEvent> + Send + 'static + use<P> {
        let (mut tx, rx) = mpsc::channel(STREAM_BUFFER);
        let engine = self.clone();

        tokio::spawn(async move {
            if let Err(failure) = engine.run(start, &mut tx).await
                && failure.error == AppError::SinkClosed
            {
                tracing::debug!(url = %failure.last_url, "Stream consumer went away");
            }
        });

        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }
}

fn build_hop(
    previous: Option<&Hop>,
    url: &Url,
    response: ProbeResponse,
    kind: RedirectKind,
    latency: Duration,
) -> Hop {
    Hop {
        url: url.clone(),
        status: response.status,
        status_text: response.status_text,
        response_time: latency,
        timestamp: Utc::now(),
        redirect_type: kind,
        is_secure: url.scheme() == "https",
        domain_changed: check_domain_change(url, previous.map(|hop| &hop.url)),
        enrichment: enrich(url, &response.headers),
        headers: response.headers,
    }
}

async fn record<S: TraceSink>(sink: &mut S, hops: &mut Vec<Hop>, hop: Hop) -> Result<(), AppError> {
    tracing::info!(
        hop = hops.len() + 1,
        status = hop.status,
        kind = %hop.redirect_type,
        latency_ms = hop.response_time.as_millis() as u64,
        "{}",
        hop.url
    );
    sink.emit(TraceEvent::Hop(hop.clone())).await?;
    hops.push(hop);
    Ok(())
}

async fn finish<S: TraceSink>(
    sink: &mut S,
    hops: &[Hop],
    url: Url,
    title: Option<String>,
    page: &ProbeResponse,
) -> TraceOutcome {
    let destination = FinalDestination {
        url,
        title,
        favicon: None,
        is_reachable: page.is_success(),
    };
    let total = total_time(hops);

    tracing::info!(
        hops = hops.len(),
        status = page.status,
        total_ms = total.as_millis() as u64,
        "Reached {}",
        destination.url
    );

    let final_event = TraceEvent::Final(FinalEvent {
        destination: destination.clone(),
        total_time: total,
    });
    for event in [final_event, TraceEvent::Complete] {
        if let Err(error) = sink.emit(event).await {
            return Err(TraceFailure {
                last_url: destination.url,
                error,
            });
        }
    }

    Ok(destination)
}

async fn fail<S: TraceSink>(sink: &mut S, last_url: Url, error: AppError) -> TraceOutcome {
    tracing::warn!(url = %last_url, "Trace failed: {}", error);

    // Best effort: the consumer may already be gone.
    let _ = sink.emit(TraceEvent::Error(error.to_string())).await;

    Err(TraceFailure { last_url, error })
}

/// Collects trace events into a [`TraceResult`].
#[derive(Debug, Default)]
pub struct ResultBuilder {
    hops: Vec<Hop>,
    destination: Option<FinalDestination>,
    error: Option<String>,
}

impl ResultBuilder {
    /// Combine the collected events with the loop's outcome.
    ///
    /// On failure the destination is the last attempted URL, marked unreachable.
    pub fn finish(self, outcome: TraceOutcome) -> TraceResult {
        let total_time = total_time(&self.hops);

        match outcome {
            Ok(destination) => TraceResult {
                hops: self.hops,
                final_destination: self.destination.unwrap_or(destination),
                total_time,
                error: None,
            },
            Err(failure) => TraceResult {
                hops: self.hops,
                final_destination: FinalDestination::unreachable(failure.last_url),
                total_time,
                error: Some(self.error.unwrap_or_else(|| failure.error.to_string())),
            },
        }
    }
}

impl TraceSink for ResultBuilder {
    async fn emit(&mut self, event: TraceEvent) -> Result<(), AppError> {
        match event {
            TraceEvent::Hop(hop) => self.hops.push(hop),
            TraceEvent::Final(event) => self.destination = Some(event.destination),
            TraceEvent::Error(message) => self.error = Some(message),
            TraceEvent::Complete => {}
        }
        Ok(())
    }
}
