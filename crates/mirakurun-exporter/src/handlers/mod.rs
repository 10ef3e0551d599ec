pub mod index;
pub mod metrics;

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use mirakurun_common::error::ExporterError;

/// A scrape the registry could not assemble. Upstream fetch failures never
/// end up here; they only shrink the scrape.
pub struct ScrapeError(pub ExporterError);

impl From<ExporterError> for ScrapeError {
    fn from(value: ExporterError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("An error has occurred while serving metrics:\n\n{}\n", self.0),
        )
            .into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
