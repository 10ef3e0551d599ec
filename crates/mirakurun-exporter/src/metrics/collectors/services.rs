use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use mirakurun_client::{MirakurunApi, Service};
use tracing::error;

use crate::metrics::{
    NAMESPACE,
    registry::{Collector, MetricChannel},
    types::{MetricDescriptor, MetricType},
};

const SUBSYSTEM: &str = "services";

/// Channel type Mirakurun uses for terrestrial broadcasts.
const TERRESTRIAL: &str = "GR";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCounts {
    /// Terrestrial services keyed by physical channel.
    pub gr_by_channel: HashMap<String, i64>,
    /// All services keyed by network id.
    pub by_network: HashMap<i64, i64>,
}

impl ServiceCounts {
    pub fn from_services(services: &[Service]) -> Self {
        let mut counts = Self::default();
        for service in services {
            if let Some(channel) = &service.channel
                && channel.channel_type == TERRESTRIAL
            {
                *counts.gr_by_channel.entry(channel.channel.clone()).or_insert(0) += 1;
            }
            *counts.by_network.entry(service.network_id).or_insert(0) += 1;
        }
        counts
    }
}

pub struct ServicesCollector {
    client: Arc<dyn MirakurunApi>,

    gr_services: Arc<MetricDescriptor>,
    services: Arc<MetricDescriptor>,
}

impl ServicesCollector {
    pub fn new(client: Arc<dyn MirakurunApi>) -> Self {
        Self {
            client,
            gr_services: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "GR_services",
                "Number of GR services available in Mirakurun.",
                &["channel"],
            ),
            services: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "services",
                "Number of all services available in Mirakurun.",
                &["network_id"],
            ),
        }
    }
}

#[async_trait]
impl Collector for ServicesCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.gr_services), Arc::clone(&self.services)]
    }

    async fn collect(&self, ch: &mut MetricChannel) {
        let services = match self.client.get_services().await {
            Ok(services) => services,
            Err(err) => {
                error!(error = %err, resource = "services", "failed to fetch Mirakurun services");
                return;
            }
        };

        let counts = ServiceCounts::from_services(&services);
        for (channel, count) in &counts.gr_by_channel {
            ch.send(
                &self.gr_services,
                MetricType::Gauge,
                *count as f64,
                &[channel.as_str()],
            );
        }
        for (network_id, count) in &counts.by_network {
            ch.send(
                &self.services,
                MetricType::Gauge,
                *count as f64,
                &[network_id.to_string().as_str()],
            );
        }
    }
}
