use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "hoptrace API",
        version = "0.1.0",
        description = "Redirect chain tracer: follows HTTP, meta-refresh and JavaScript redirects."
    ),
    paths(
        crate::routes::trace,
        crate::routes::trace_stream,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::TraceRequest,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
        hoptrace_core::models::TraceResult,
        hoptrace_core::models::TraceEvent,
        hoptrace_core::models::FinalEvent,
        hoptrace_core::models::FinalDestination,
        hoptrace_core::models::Hop,
        hoptrace_core::models::RedirectKind,
        hoptrace_core::enrich::Enrichment,
        hoptrace_core::enrich::ServerInfo,
        hoptrace_core::enrich::CacheInfo,
        hoptrace_core::enrich::SecurityInfo,
        hoptrace_core::enrich::SslCertificate,
        hoptrace_core::enrich::PerformanceInfo,
        hoptrace_core::enrich::AnalyticsInfo,
    )),
    tags(
        (name = "trace", description = "Redirect chain tracing"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
