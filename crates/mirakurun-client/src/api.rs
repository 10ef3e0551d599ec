use async_trait::async_trait;
use mirakurun_common::error::Result;

use crate::types::{Program, Service, StatusResponse, Tuner};

pub const STATUS_PATH: &str = "/api/status";
pub const TUNERS_PATH: &str = "/api/tuners";
pub const PROGRAMS_PATH: &str = "/api/programs";
pub const SERVICES_PATH: &str = "/api/services";

/// Read-only view of the Mirakurun REST API consumed by the collectors.
///
/// Every call is a single request with no retry. Dropping the returned future
/// aborts the request.
#[async_trait]
pub trait MirakurunApi: Send + Sync {
    async fn get_status(&self) -> Result<StatusResponse>;

    async fn get_tuners(&self) -> Result<Vec<Tuner>>;

    async fn get_programs(&self) -> Result<Vec<Program>>;

    async fn get_services(&self) -> Result<Vec<Service>>;
}
