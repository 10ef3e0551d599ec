use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use mirakurun_common::error::{ExporterError, Result};
use tracing::error;

use crate::metrics::types::{ConstMetric, MetricDescriptor, MetricFamily, MetricSample, MetricType};

/// Two-phase contract between a metric source and the registry: descriptors
/// are advertised once at registration, samples are produced on every gather.
#[async_trait]
pub trait Collector: Send + Sync {
    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    async fn collect(&self, ch: &mut MetricChannel);
}

/// Sink the collectors push samples into during one gather.
#[derive(Debug, Default)]
pub struct MetricChannel {
    metrics: Vec<ConstMetric>,
}

impl MetricChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a sample. A sample whose label values do not fit its
    /// descriptor is logged and dropped.
    pub fn send(
        &mut self,
        descriptor: &Arc<MetricDescriptor>,
        metric_type: MetricType,
        value: f64,
        label_values: &[&str],
    ) {
        match ConstMetric::new(descriptor, metric_type, value, label_values) {
            Ok(metric) => self.metrics.push(metric),
            Err(err) => error!(error = %err, "dropping malformed metric sample"),
        }
    }

    pub fn into_metrics(self) -> Vec<ConstMetric> {
        self.metrics
    }
}

pub struct MetricsRegistry {
    collectors: Vec<Box<dyn Collector>>,
    descriptors: HashMap<String, Arc<MetricDescriptor>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            collectors: Vec::new(),
            descriptors: HashMap::new(),
        }
    }

    /// Registers a collector after validating everything it describes. On
    /// error nothing from the collector is kept.
    pub fn register(&mut self, collector: Box<dyn Collector>) -> Result<()> {
        let described = collector.describe();
        let mut incoming = HashSet::new();

        for descriptor in &described {
            validate_descriptor(descriptor)?;

            if self.descriptors.contains_key(&descriptor.name)
                || !incoming.insert(descriptor.name.as_str())
            {
                return Err(ExporterError::InvalidArgument(format!(
                    "metric already registered: {}",
                    descriptor.name
                )));
            }
        }

        for descriptor in described {
            self.descriptors.insert(descriptor.name.clone(), descriptor);
        }
        self.collectors.push(collector);
        Ok(())
    }

    pub async fn gather(&self) -> Result<Vec<MetricFamily>> {
        let mut ch = MetricChannel::new();
        for collector in &self.collectors {
            collector.collect(&mut ch).await;
        }

        let mut families: BTreeMap<String, (MetricFamily, HashSet<Vec<String>>)> = BTreeMap::new();
        for metric in ch.into_metrics() {
            let name = metric.descriptor().name.clone();
            match self.descriptors.get(&name) {
                Some(described) if described.as_ref() == metric.descriptor().as_ref() => {}
                _ => {
                    return Err(ExporterError::InternalError(format!(
                        "collected metric {name} was not described"
                    )));
                }
            }

            let (family, seen) = families.entry(name.clone()).or_insert_with(|| {
                (
                    MetricFamily {
                        descriptor: Arc::clone(metric.descriptor()),
                        metric_type: metric.metric_type(),
                        samples: Vec::new(),
                    },
                    HashSet::new(),
                )
            });

            if family.metric_type != metric.metric_type() {
                return Err(ExporterError::InternalError(format!(
                    "collected metric {name} mixes {} and {} samples",
                    family.metric_type.as_prometheus_type(),
                    metric.metric_type().as_prometheus_type()
                )));
            }

            if !seen.insert(metric.label_values().to_vec()) {
                return Err(ExporterError::InternalError(format!(
                    "collected metric {name} {:?} was collected before with the same label values",
                    metric.label_values()
                )));
            }

            family.samples.push(MetricSample {
                labels: materialize_labels(family.descriptor.as_ref(), metric.label_values()),
                value: metric.value(),
            });
        }

        Ok(families
            .into_values()
            .map(|(mut family, _)| {
                family.samples.sort_by(|left, right| left.labels.cmp(&right.labels));
                family
            })
            .collect())
    }

    pub async fn render_prometheus(&self) -> Result<String> {
        let families = self.gather().await?;
        Ok(encode_text(&families))
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders families in the Prometheus text exposition format 0.0.4.
pub fn encode_text(families: &[MetricFamily]) -> String {
    let mut output = String::new();

    for family in families {
        output.push_str("# HELP ");
        output.push_str(family.name());
        output.push(' ');
        output.push_str(&escape_help(&family.descriptor.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(family.name());
        output.push(' ');
        output.push_str(family.metric_type.as_prometheus_type());
        output.push('\n');

        for sample in &family.samples {
            output.push_str(&render_sample_line(family.name(), &sample.labels, sample.value));
        }
    }

    output
}

fn validate_descriptor(descriptor: &MetricDescriptor) -> Result<()> {
    if !is_valid_metric_name(&descriptor.name) {
        return Err(ExporterError::InvalidArgument(format!(
            "invalid metric name: {:?}",
            descriptor.name
        )));
    }

    let mut labels = HashSet::new();
    for label in &descriptor.variable_labels {
        if !is_valid_label_name(label) {
            return Err(ExporterError::InvalidArgument(format!(
                "invalid label name {label:?} on metric {}",
                descriptor.name
            )));
        }
        if !labels.insert(label.as_str()) {
            return Err(ExporterError::InvalidArgument(format!(
                "duplicate label name {label:?} on metric {}",
                descriptor.name
            )));
        }
    }

    Ok(())
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    !name.starts_with("__") && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn materialize_labels(descriptor: &MetricDescriptor, values: &[String]) -> Vec<(String, String)> {
    descriptor
        .variable_labels
        .iter()
        .zip(values.iter())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}
