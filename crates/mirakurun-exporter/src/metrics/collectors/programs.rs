use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use mirakurun_client::{MirakurunApi, Program};
use tracing::error;

use crate::metrics::{
    NAMESPACE,
    registry::{Collector, MetricChannel},
    types::{MetricDescriptor, MetricType},
};

const SUBSYSTEM: &str = "programs";

pub struct ProgramsCollector {
    client: Arc<dyn MirakurunApi>,

    programs: Arc<MetricDescriptor>,
}

impl ProgramsCollector {
    pub fn new(client: Arc<dyn MirakurunApi>) -> Self {
        Self {
            client,
            programs: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "stored_programs",
                "Number of programs stored in Mirakurun.",
                &["service_id"],
            ),
        }
    }
}

/// Number of programs per owning service id.
pub fn count_by_service(programs: &[Program]) -> HashMap<i64, i64> {
    let mut counts = HashMap::new();
    for program in programs {
        *counts.entry(program.service_id).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl Collector for ProgramsCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.programs)]
    }

    async fn collect(&self, ch: &mut MetricChannel) {
        let programs = match self.client.get_programs().await {
            Ok(programs) => programs,
            Err(err) => {
                error!(error = %err, resource = "programs", "failed to fetch Mirakurun programs");
                return;
            }
        };

        for (service_id, count) in count_by_service(&programs) {
            ch.send(
                &self.programs,
                MetricType::Gauge,
                count as f64,
                &[service_id.to_string().as_str()],
            );
        }
    }
}
