use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::{debug, error};

use crate::{
    exporter::Exporter, handlers::ScrapeError, metrics::MetricsRegistry, router::ExporterState,
};

pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Serves one scrape with a registry and collector set built for this request
/// alone. If the client goes away axum drops this future, which also drops
/// any upstream request still in flight.
pub async fn prometheus_metrics(
    State(state): State<Arc<ExporterState>>,
) -> Result<Response, ScrapeError> {
    let mut registry = MetricsRegistry::new();
    registry
        .register(Box::new(Exporter::new(Arc::clone(&state.client), &state.config)))
        .inspect_err(|err| error!(error = %err, "failed to register Mirakurun exporter"))?;

    let payload = registry
        .render_prometheus()
        .await
        .inspect_err(|err| error!(error = %err, "failed to gather metrics"))?;
    debug!(bytes = payload.len(), "scrape completed");

    let mut response = Response::new(Body::from(payload));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(TEXT_CONTENT_TYPE),
    );

    Ok(response)
}
