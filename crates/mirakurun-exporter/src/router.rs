use std::sync::Arc;

use axum::{Router, routing::get};
use mirakurun_client::MirakurunApi;
use mirakurun_common::error::{ExporterError, Result};
use tower_http::trace::TraceLayer;

use crate::{exporter::ExporterConfig, handlers};

pub const DEFAULT_METRICS_PATH: &str = "/metrics";

pub struct ExporterState {
    pub client: Arc<dyn MirakurunApi>,
    pub config: ExporterConfig,
    pub metrics_path: String,
}

impl ExporterState {
    pub fn new(
        client: Arc<dyn MirakurunApi>,
        config: ExporterConfig,
        metrics_path: impl Into<String>,
    ) -> Result<Self> {
        let metrics_path = metrics_path.into();
        validate_metrics_path(&metrics_path)?;

        Ok(Self {
            client,
            config,
            metrics_path,
        })
    }
}

pub fn exporter_router(state: Arc<ExporterState>) -> Router {
    let mut router = Router::new().route(
        &state.metrics_path,
        get(handlers::metrics::prometheus_metrics),
    );
    if state.metrics_path != "/" {
        router = router.route("/", get(handlers::index::landing_page));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn validate_metrics_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(ExporterError::InvalidArgument(format!(
            "metrics path must start with '/': {path:?}"
        )));
    }
    if path.contains(['{', '}', '*', ':']) {
        return Err(ExporterError::InvalidArgument(format!(
            "metrics path must be a literal path: {path:?}"
        )));
    }
    Ok(())
}
