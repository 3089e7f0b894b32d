use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;
use wiremock::MockServer;

use crate::integration::common::{
    body_json, body_text, mount_page, mount_redirect, setup_guarded_app, setup_test_app,
};

fn post_trace(body: serde_json::Value) -> Request<Body> {
    Request::post("/api/trace")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_stream(target: &str) -> Request<Body> {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("url", target)
        .finish();
    Request::get(format!("/api/trace-stream?{query}"))
        .body(Body::empty())
        .unwrap()
}

/// Event payloads from an SSE body, in order.
fn sse_events(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn health_returns_200() {
    let response = setup_test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn openapi_document_lists_trace_routes() {
    let response = setup_test_app()
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"].get("/api/trace").is_some());
    assert!(json["paths"].get("/api/trace-stream").is_some());
}

// ---------------------------------------------------------------------------
// Buffered trace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trace_without_url_returns_400() {
    let response = setup_test_app()
        .oneshot(post_trace(serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["message"], "URL is required");
}

#[tokio::test]
async fn trace_with_invalid_url_returns_400() {
    let response = setup_test_app()
        .oneshot(post_trace(serde_json::json!({"url": "not a url"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "validation_error");
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid URL format")
    );
}

#[tokio::test]
async fn trace_with_malformed_body_returns_validation_error() {
    let wrong_type = post_trace(serde_json::json!({"url": 5}));
    let not_json = Request::post("/api/trace")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{url:"))
        .unwrap();
    let no_content_type = Request::post("/api/trace")
        .body(Body::from(r#"{"url": "https://example.com"}"#))
        .unwrap();

    for request in [wrong_type, not_json, no_content_type] {
        let response = setup_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "validation_error");
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid URL format")
        );
    }
}

#[tokio::test]
async fn trace_returns_full_chain() {
    let server = MockServer::start().await;
    mount_redirect(&server, "/short", 301, "/middle").await;
    mount_page(
        &server,
        "/middle",
        r#"<meta http-equiv="refresh" content="0; url=/end">"#,
    )
    .await;
    mount_page(&server, "/end", "<title>The End</title>").await;

    let start = format!("{}/short", server.uri());
    let response = setup_test_app()
        .oneshot(post_trace(serde_json::json!({ "url": &start })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let hops = json["hops"].as_array().unwrap();
    assert_eq!(hops.len(), 2);
    assert_eq!(hops[0]["url"], start);
    assert_eq!(hops[0]["status"], 301);
    assert_eq!(hops[0]["redirect_type"], "http");
    assert_eq!(hops[1]["redirect_type"], "meta");
    assert_eq!(json["final_destination"]["url"], format!("{}/end", server.uri()));
    assert_eq!(json["final_destination"]["title"], "The End");
    assert_eq!(json["final_destination"]["is_reachable"], true);
    assert!(json["total_time"].is_u64());
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn failed_trace_is_a_result_not_a_request_error() {
    let server = MockServer::start().await;
    mount_redirect(&server, "/a", 302, "/b").await;
    wiremock::Mock::given(wiremock::matchers::path("/b"))
        .respond_with(wiremock::ResponseTemplate::new(301))
        .mount(&server)
        .await;

    let response = setup_test_app()
        .oneshot(post_trace(
            serde_json::json!({ "url": format!("{}/a", server.uri()) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Redirect response 301 but no Location header");
    assert_eq!(json["hops"].as_array().unwrap().len(), 1);
    assert_eq!(json["final_destination"]["is_reachable"], false);
}

#[tokio::test]
async fn guarded_app_refuses_private_targets() {
    let response = setup_guarded_app()
        .oneshot(post_trace(serde_json::json!({"url": "http://127.0.0.1:9/"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("SSRF blocked"));
    assert!(json["hops"].as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Streaming trace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_emits_events_in_order() {
    let server = MockServer::start().await;
    mount_redirect(&server, "/go", 302, "/js").await;
    mount_page(&server, "/js", r#"<script>location = "/done";</script>"#).await;
    mount_page(&server, "/done", "<title>Done</title>").await;

    let response = setup_test_app()
        .oneshot(get_stream(&format!("{}/go", server.uri())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let events = sse_events(&body_text(response).await);
    let types: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["hop", "hop", "final", "complete"]);
    assert_eq!(events[1]["data"]["redirect_type"], "javascript");
    assert_eq!(events[2]["data"]["title"], "Done");
    assert!(events[2]["data"]["total_time"].is_u64());
}

#[tokio::test]
async fn stream_ends_with_error_event() {
    let server = MockServer::start().await;
    for i in 0..11 {
        mount_redirect(&server, &format!("/r{i}"), 301, &format!("/r{}", i + 1)).await;
    }

    let response = setup_test_app()
        .oneshot(get_stream(&format!("{}/r0", server.uri())))
        .await
        .unwrap();

    let events = sse_events(&body_text(response).await);
    assert_eq!(events.len(), 11);
    assert_eq!(events[10]["type"], "error");
    assert_eq!(events[10]["data"], "Too many redirects (max 10)");
}

#[tokio::test]
async fn stream_without_url_returns_400() {
    let response = setup_test_app()
        .oneshot(
            Request::get("/api/trace-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "URL is required");
}
