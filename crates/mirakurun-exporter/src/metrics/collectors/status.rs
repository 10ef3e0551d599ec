use std::sync::Arc;

use async_trait::async_trait;
use mirakurun_client::{MirakurunApi, StatusResponse};
use tracing::error;

use crate::metrics::{
    NAMESPACE,
    registry::{Collector, MetricChannel},
    types::{MetricDescriptor, MetricType},
};

const SUBSYSTEM: &str = "status";

/// Divisor applied to `timerAccuracy.m*.avg` before export.
///
/// The exported names carry a `_seconds` suffix while the divisor is 1e6.
pub const TIMER_ACCURACY_DIVISOR: f64 = 1_000_000.0;

/// Exports process and health information from `/api/status`.
pub struct StatusCollector {
    client: Arc<dyn MirakurunApi>,

    resident_memory: Arc<MetricDescriptor>,
    total_memory: Arc<MetricDescriptor>,
    used_memory: Arc<MetricDescriptor>,
    programs_db_events: Arc<MetricDescriptor>,
    rpc_connections: Arc<MetricDescriptor>,
    streams: Arc<MetricDescriptor>,
    errors: Arc<MetricDescriptor>,
    timer_error1: Arc<MetricDescriptor>,
    timer_error5: Arc<MetricDescriptor>,
    timer_error15: Arc<MetricDescriptor>,
    info: Arc<MetricDescriptor>,
}

impl StatusCollector {
    pub fn new(client: Arc<dyn MirakurunApi>) -> Self {
        Self {
            client,
            resident_memory: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "resident_memory_bytes",
                "Amount of space occupied in the main memory device for the Mirakurun process in bytes.",
                &[],
            ),
            total_memory: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "total_memory_bytes",
                "Total heap size of the Mirakurun process in bytes.",
                &[],
            ),
            used_memory: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "used_memory_bytes",
                "Used heap size of the Mirakurun process in bytes.",
                &[],
            ),
            programs_db_events: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "programs_db_events",
                "Number of EPG programs stored in Mirakurun.",
                &[],
            ),
            rpc_connections: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "rpc_connections",
                "Number of JSON-RPC connections to Mirakurun.",
                &[],
            ),
            streams: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "streams",
                "Number of streams in Mirakurun.",
                &["stream"],
            ),
            errors: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "errors_total",
                "Total number of errors in Mirakurun.",
                &["error"],
            ),
            timer_error1: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "timer_error1_seconds",
                "1m average difference from clock time in Mirakurun to the real time in seconds.",
                &[],
            ),
            timer_error5: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "timer_error5_seconds",
                "5m average difference from clock time in Mirakurun to the real time in seconds.",
                &[],
            ),
            timer_error15: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "timer_error15_seconds",
                "15m average difference from clock time in Mirakurun to the real time in seconds.",
                &[],
            ),
            info: MetricDescriptor::new(
                NAMESPACE,
                SUBSYSTEM,
                "info",
                "A metric with a constant '1' value labeled by metadata of Mirakurun.",
                &["nodeversion", "version", "arch"],
            ),
        }
    }

    fn emit(&self, status: &StatusResponse, ch: &mut MetricChannel) {
        let memory = &status.process.memory_usage;
        ch.send(&self.resident_memory, MetricType::Gauge, memory.rss as f64, &[]);
        ch.send(&self.total_memory, MetricType::Gauge, memory.heap_total as f64, &[]);
        ch.send(&self.used_memory, MetricType::Gauge, memory.heap_used as f64, &[]);
        ch.send(
            &self.programs_db_events,
            MetricType::Gauge,
            status.epg.stored_events as f64,
            &[],
        );
        if let Some(rpc_count) = status.rpc_count {
            ch.send(&self.rpc_connections, MetricType::Gauge, rpc_count as f64, &[]);
        }

        let streams = &status.stream_count;
        for (kind, count) in [
            ("tuner_device", streams.tuner_device),
            ("ts_filter", streams.ts_filter),
            ("decoder", streams.decoder),
        ] {
            ch.send(&self.streams, MetricType::Gauge, count as f64, &[kind]);
        }

        let errors = &status.error_count;
        for (kind, count) in [
            ("uncaught_exception", errors.uncaught_exception),
            ("unhandled_rejection", errors.unhandled_rejection),
            ("buffer_overflow", errors.buffer_overflow),
            ("tuner_device_respawn", errors.tuner_device_respawn),
            ("decoder_respawn", errors.decoder_respawn),
        ] {
            ch.send(&self.errors, MetricType::Counter, count as f64, &[kind]);
        }

        let accuracy = &status.timer_accuracy;
        for (descriptor, window) in [
            (&self.timer_error1, &accuracy.m1),
            (&self.timer_error5, &accuracy.m5),
            (&self.timer_error15, &accuracy.m15),
        ] {
            ch.send(
                descriptor,
                MetricType::Gauge,
                window.avg / TIMER_ACCURACY_DIVISOR,
                &[],
            );
        }

        ch.send(
            &self.info,
            MetricType::Untyped,
            1.0,
            &[
                status.process.node_version(),
                status.version.as_str(),
                status.process.arch.as_str(),
            ],
        );
    }
}

#[async_trait]
impl Collector for StatusCollector {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.resident_memory),
            Arc::clone(&self.total_memory),
            Arc::clone(&self.used_memory),
            Arc::clone(&self.programs_db_events),
            Arc::clone(&self.rpc_connections),
            Arc::clone(&self.streams),
            Arc::clone(&self.errors),
            Arc::clone(&self.timer_error1),
            Arc::clone(&self.timer_error5),
            Arc::clone(&self.timer_error15),
            Arc::clone(&self.info),
        ]
    }

    async fn collect(&self, ch: &mut MetricChannel) {
        let status = match self.client.get_status().await {
            Ok(status) => status,
            Err(err) => {
                error!(error = %err, resource = "status", "failed to fetch Mirakurun status");
                return;
            }
        };

        self.emit(&status, ch);
    }
}
