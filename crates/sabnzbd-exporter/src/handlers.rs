//! HTTP handlers: metrics exposition, health check and index page.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tracing::{debug, error};

use sabnzbd_exporter_core::exporter::text_content_type;

use crate::state::SharedState;

pub(crate) fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/metrics", get(handle_metrics))
        .route("/healthz", get(handle_health))
        .with_state(state)
        .layer(AccessLogLayer)
        .layer(CompressionLayer::new())
}

// ============================================================
// Metrics
// ============================================================

pub(crate) async fn handle_metrics(State(state): State<SharedState>) -> Response {
    match state.exporter.scrape().await {
        Ok(body) => ([(header::CONTENT_TYPE, text_content_type())], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "OK\n"
}

// ============================================================
// Index
// ============================================================

const INDEX_HTML: &str = r#"<html>
<head><title>SABnzbd Exporter</title></head>
<body>
<h1>SABnzbd Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

pub(crate) async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ============================================================
// Access log layer (tower Layer + Service)
// ============================================================

#[derive(Clone)]
pub(crate) struct AccessLogLayer;

impl<S> tower::Layer<S> for AccessLogLayer {
    type Service = AccessLogService<S>;
    fn layer(&self, inner: S) -> Self::Service {
        AccessLogService { inner }
    }
}

#[derive(Clone)]
pub(crate) struct AccessLogService<S> {
    inner: S,
}

impl<S> tower::Service<Request> for AccessLogService<S>
where
    S: tower::Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let t0 = Instant::now();

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let response = inner.call(req).await?;
            let latency_ms = t0.elapsed().as_millis() as u64;
            let status = response.status().as_u16();
            debug!(status, latency_ms, "{method} {path}");
            Ok(response)
        })
    }
}
