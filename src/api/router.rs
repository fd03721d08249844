use super::{auth, handlers};
use crate::monitor::Monitor;
use axum::Router;
use axum::middleware;
use axum::routing::get;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds and returns the full Axum router with all routes and shared state.
pub fn build(monitor: Arc<Monitor>) -> Router {
    let cron_auth =
        middleware::from_fn_with_state(Arc::clone(&monitor), auth::require_cron_secret);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/config", get(handlers::get_config))
        .route("/api/lof", get(handlers::get_lof).post(handlers::post_lof))
        .route("/api/cron", get(handlers::cron).route_layer(cron_auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(monitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::testing::{FakeNotifier, FakeSource, monitor_with, test_config};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use reqwest::StatusCode as UpstreamStatus;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn sample_source() -> FakeSource {
        FakeSource::with_rates(&[("a", "3.2"), ("b", "-1.0"), ("c", "-"), ("d", "12")])
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build(Arc::new(monitor_with(sample_source(), None)));
        let response = app.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn config_exposes_defaults() {
        let app = build(Arc::new(monitor_with(sample_source(), None)));
        let (status, body) = call(app, get_req("/api/config")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "disLimit": -5.0, "preLimit": 5.0, "maxItems": 20 }));
    }

    #[tokio::test]
    async fn get_lof_returns_ordered_data_and_table() {
        let app = build(Arc::new(monitor_with(sample_source(), None)));
        let (status, body) = call(app, get_req("/api/lof")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["代码"], "a");
        assert_eq!(body["data"][1]["代码"], "b");
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        let markdown = body["markdown"].as_str().unwrap();
        assert!(markdown.starts_with("| 代码 | 名称 | 折溢价 | 申购 |"));
        assert!(body.get("wechatResponse").is_none());
    }

    #[tokio::test]
    async fn get_lof_query_overrides_config() {
        let app = build(Arc::new(monitor_with(sample_source(), None)));
        let (_, body) = call(app, get_req("/api/lof?disLimit=20&preLimit=0&maxItems=1")).await;
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["代码"], "d");
    }

    #[tokio::test]
    async fn get_lof_rejects_malformed_numbers() {
        let app = build(Arc::new(monitor_with(sample_source(), None)));
        let response = app
            .oneshot(get_req("/api/lof?maxItems=many"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn retrieval_failure_is_a_500_with_message() {
        let source = FakeSource::failing(UpstreamStatus::SERVICE_UNAVAILABLE);
        let app = build(Arc::new(monitor_with(source, None)));
        let (status, body) = call(app, get_req("/api/lof")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn retrieval_failure_is_logged_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = FakeSource::failing(UpstreamStatus::SERVICE_UNAVAILABLE);
        let app = build(Arc::new(monitor_with(source, None)));
        let (status, _) = call(app, get_req("/api/lof")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("Failed to fetch LOF data").count(), 1, "{output}");
    }

    #[tokio::test]
    async fn post_lof_without_webhook_key_is_bad_request() {
        let app = build(Arc::new(monitor_with(sample_source(), None)));
        let (status, body) = call(app, post_req("/api/lof", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn post_lof_pushes_digest_and_reports_bot_reply() {
        let notifier = Arc::new(FakeNotifier::replying(0, "ok"));
        let app = build(Arc::new(monitor_with(sample_source(), Some(notifier.clone()))));
        let (status, body) = call(app, post_req("/api/lof", r#"{"maxItems":"1"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["wechatResponse"], json!({ "errcode": 0, "errmsg": "ok" }));

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("**LOF-监控: "));
        assert!(sent[0].contains(">a **fund a** "));
    }

    #[tokio::test]
    async fn post_lof_reports_rejected_message_as_unsuccessful() {
        let notifier = Arc::new(FakeNotifier::replying(93000, "invalid webhook url"));
        let app = build(Arc::new(monitor_with(sample_source(), Some(notifier))));
        let (status, body) = call(app, post_req("/api/lof", "not json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["wechatResponse"]["errcode"], 93000);
    }

    #[tokio::test]
    async fn post_lof_with_no_matches_skips_sending() {
        let notifier = Arc::new(FakeNotifier::replying(0, "ok"));
        let source = FakeSource::with_rates(&[("x", "-")]);
        let app = build(Arc::new(monitor_with(source, Some(notifier.clone()))));
        let (_, body) = call(app, post_req("/api/lof", "")).await;

        assert_eq!(
            body,
            json!({
                "success": true,
                "data": [],
                "markdown": "",
                "wechatResponse": { "errcode": 0, "errmsg": "No data to send" }
            })
        );
        assert!(notifier.sent().is_empty());
    }

    fn monitor_with_secret(secret: &str, notifier: Option<Arc<FakeNotifier>>) -> Monitor {
        let mut config = test_config();
        config.cron_secret = Some(secret.to_string());
        Monitor::new(
            config,
            Arc::new(sample_source()),
            notifier.map(|n| n as Arc<dyn crate::notify::Notifier>),
        )
    }

    #[tokio::test]
    async fn cron_requires_bearer_secret_when_configured() {
        let notifier = Arc::new(FakeNotifier::replying(0, "ok"));
        let app = build(Arc::new(monitor_with_secret("s3cret", Some(notifier.clone()))));

        let (status, _) = call(app.clone(), get_req("/api/cron")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let authorized = Request::builder()
            .uri("/api/cron")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app, authorized).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 2);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn cron_is_open_without_secret_and_needs_webhook_key() {
        let app = build(Arc::new(monitor_with(sample_source(), None)));
        let (status, body) = call(app, get_req("/api/cron")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Missing WECHAT_WEBHOOK_KEY");
    }

    #[tokio::test]
    async fn cron_with_no_matches_reports_message() {
        let notifier = Arc::new(FakeNotifier::replying(0, "ok"));
        let source = FakeSource::with_rates(&[("x", "40")]);
        let app = build(Arc::new(monitor_with(source, Some(notifier))));
        let (_, body) = call(app, get_req("/api/cron")).await;
        assert_eq!(
            body,
            json!({ "success": true, "message": "No matching data", "count": 0 })
        );
    }
}
