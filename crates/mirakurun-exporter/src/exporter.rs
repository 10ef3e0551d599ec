use std::sync::Arc;

use async_trait::async_trait;
use mirakurun_client::MirakurunApi;

use crate::metrics::{
    Collector, MetricChannel, MetricDescriptor, ProgramsCollector, ServicesCollector,
    StatusCollector, TunersCollector,
};

/// Which upstream resources are scraped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExporterConfig {
    pub fetch_status: bool,
    pub fetch_tuners: bool,
    pub fetch_programs: bool,
    pub fetch_services: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            fetch_status: true,
            fetch_tuners: true,
            fetch_programs: true,
            fetch_services: true,
        }
    }
}

/// Composite collector over the enabled per-resource collectors.
///
/// Built fresh for every scrape; children run one after another and a failed
/// child only loses its own samples.
pub struct Exporter {
    status: Option<StatusCollector>,
    tuners: Option<TunersCollector>,
    programs: Option<ProgramsCollector>,
    services: Option<ServicesCollector>,
}

impl Exporter {
    pub fn new(client: Arc<dyn MirakurunApi>, config: &ExporterConfig) -> Self {
        Self {
            status: config
                .fetch_status
                .then(|| StatusCollector::new(Arc::clone(&client))),
            tuners: config
                .fetch_tuners
                .then(|| TunersCollector::new(Arc::clone(&client))),
            programs: config
                .fetch_programs
                .then(|| ProgramsCollector::new(Arc::clone(&client))),
            services: config
                .fetch_services
                .then(|| ServicesCollector::new(Arc::clone(&client))),
        }
    }

    fn children(&self) -> Vec<&dyn Collector> {
        let mut children: Vec<&dyn Collector> = Vec::with_capacity(4);
        if let Some(status) = &self.status {
            children.push(status);
        }
        if let Some(tuners) = &self.tuners {
            children.push(tuners);
        }
        if let Some(programs) = &self.programs {
            children.push(programs);
        }
        if let Some(services) = &self.services {
            children.push(services);
        }
        children
    }
}

#[async_trait]
impl Collector for Exporter {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.children()
            .into_iter()
            .flat_map(|child| child.describe())
            .collect()
    }

    async fn collect(&self, ch: &mut MetricChannel) {
        for child in self.children() {
            child.collect(ch).await;
        }
    }
}
