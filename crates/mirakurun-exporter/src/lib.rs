pub mod exporter;
pub mod handlers;
pub mod metrics;
pub mod router;

#[cfg(test)]
mod testing;

pub use exporter::{Exporter, ExporterConfig};
pub use router::{DEFAULT_METRICS_PATH, ExporterState, exporter_router};
