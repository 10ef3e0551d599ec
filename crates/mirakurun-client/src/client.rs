use std::time::Duration;

use async_trait::async_trait;
use mirakurun_common::error::{ExporterError, Result};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::{
    api::{MirakurunApi, PROGRAMS_PATH, SERVICES_PATH, STATUS_PATH, TUNERS_PATH},
    types::{Program, Service, StatusResponse, Tuner},
};

const USER_AGENT: &str = concat!("mirakurun-exporter/", env!("CARGO_PKG_VERSION"));

/// HTTP client for a single Mirakurun instance.
#[derive(Clone)]
pub struct MirakurunClient {
    base_url: Url,
    client: reqwest::Client,
}

impl MirakurunClient {
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ExporterError::InvalidArgument("missing URL".to_string()));
        }

        let base_url = Url::parse(url).map_err(|err| {
            ExporterError::InvalidArgument(format!("invalid Mirakurun URL {url}: {err}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ExporterError::InvalidArgument(format!(
                "Mirakurun URL must be an absolute http(s) URL: {url}"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|err| {
            ExporterError::InternalError(format!("failed to build HTTP client: {err}"))
        })?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends an API path to the base URL's own path, so a Mirakurun served
    /// under a prefix keeps that prefix.
    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        debug!(%url, "requesting Mirakurun API");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ExporterError::Request {
                path: path.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::UnexpectedStatus {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|err| ExporterError::Decode {
            path: path.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl MirakurunApi for MirakurunClient {
    async fn get_status(&self) -> Result<StatusResponse> {
        self.get_json(STATUS_PATH).await
    }

    async fn get_tuners(&self) -> Result<Vec<Tuner>> {
        self.get_json(TUNERS_PATH).await
    }

    async fn get_programs(&self) -> Result<Vec<Program>> {
        self.get_json(PROGRAMS_PATH).await
    }

    async fn get_services(&self) -> Result<Vec<Service>> {
        self.get_json(SERVICES_PATH).await
    }
}
