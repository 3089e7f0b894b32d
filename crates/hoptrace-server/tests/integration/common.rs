use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Response;
use http_body_util::BodyExt;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

use hoptrace_client::ReqwestProber;
use hoptrace_core::{TraceConfig, TraceEngine};
use hoptrace_server::routes;
use hoptrace_server::state::AppState;

/// Router backed by a real prober that may reach the local mock server.
pub fn setup_test_app() -> Router {
    let config = TraceConfig::default().with_timeout(Duration::from_secs(2));
    let prober = ReqwestProber::with_timeout(config.timeout)
        .expect("Failed to build prober")
        .allow_private_urls();
    let state = Arc::new(AppState::new(TraceEngine::with_config(prober, config)));
    routes::router(state)
}

/// Router with the SSRF guard left on.
pub fn setup_guarded_app() -> Router {
    let prober = ReqwestProber::new().expect("Failed to build prober");
    routes::router(Arc::new(AppState::new(TraceEngine::new(prober))))
}

pub async fn mount_redirect(server: &MockServer, from: &str, status: u16, to: &str) {
    Mock::given(path(from))
        .respond_with(ResponseTemplate::new(status).insert_header("Location", to))
        .mount(server)
        .await;
}

pub async fn mount_page(server: &MockServer, at: &str, html: &str) {
    Mock::given(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}
