use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use futures::{Stream, StreamExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use hoptrace_core::error::AppError;
use hoptrace_core::{TraceResult, normalize_url, parse_absolute_url};

use crate::dto::{HealthResponse, TraceRequest, TraceStreamQuery};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/trace", post(trace))
        .route("/api/trace-stream", get(trace_stream));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// Trace a URL and return the full chain once the trace has ended.
#[utoipa::path(
    post,
    path = "/api/trace",
    request_body = TraceRequest,
    responses(
        (status = 200, description = "Trace result; `error` is set when the trace failed part way", body = TraceResult),
        (status = 400, description = "Missing or invalid URL", body = crate::dto::ErrorResponse),
    ),
    tag = "trace"
)]
pub async fn trace(
    State(state): State<Arc<AppState>>,
    body: Result<axum::Json<TraceRequest>, JsonRejection>,
) -> Result<axum::Json<TraceResult>, ApiError> {
    let axum::Json(body) = body.map_err(|e| AppError::InvalidUrl(e.body_text()))?;
    let raw = body
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(AppError::MissingUrl)?;
    let url = parse_absolute_url(raw)?;

    let result = state.engine.trace(url).await;
    Ok(axum::Json(result))
}

/// Trace a URL, pushing each event as a server-sent event while it happens.
///
/// Each frame is `data: {"type": ..., "data": ...}`; the stream ends after
/// a `complete` or `error` event.
#[utoipa::path(
    get,
    path = "/api/trace-stream",
    params(TraceStreamQuery),
    responses(
        (status = 200, description = "Stream of trace events", content_type = "text/event-stream", body = hoptrace_core::TraceEvent),
        (status = 400, description = "Missing or invalid URL", body = crate::dto::ErrorResponse),
    ),
    tag = "trace"
)]
pub async fn trace_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TraceStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let url = normalize_url(query.url.as_deref().unwrap_or_default())?;

    let events = state
        .engine
        .stream(url)
        .map(|event| Event::default().json_data(event));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
