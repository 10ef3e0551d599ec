pub mod collectors;
pub mod registry;
pub mod types;

pub use collectors::{
    programs::ProgramsCollector, services::ServicesCollector, status::StatusCollector,
    tuners::TunersCollector,
};
pub use registry::{Collector, MetricChannel, MetricsRegistry, encode_text};
pub use types::{ConstMetric, MetricDescriptor, MetricFamily, MetricSample, MetricType};

/// Prefix of every metric exported by this crate.
pub const NAMESPACE: &str = "mirakurun";
