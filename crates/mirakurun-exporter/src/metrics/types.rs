use std::sync::Arc;

use mirakurun_common::error::{ExporterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Untyped,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Untyped => "untyped",
        }
    }
}

/// Static identity of a metric: name, help text and label schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub variable_labels: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        variable_labels: &[&str],
    ) -> Arc<Self> {
        Arc::new(Self {
            name: build_fq_name(namespace, subsystem, name),
            help: help.to_string(),
            variable_labels: variable_labels.iter().map(|label| (*label).to_string()).collect(),
        })
    }
}

/// Joins the non-empty name parts with `_`.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// One sampled value of a described metric.
#[derive(Debug, Clone)]
pub struct ConstMetric {
    descriptor: Arc<MetricDescriptor>,
    metric_type: MetricType,
    value: f64,
    label_values: Vec<String>,
}

impl ConstMetric {
    pub fn new(
        descriptor: &Arc<MetricDescriptor>,
        metric_type: MetricType,
        value: f64,
        label_values: &[&str],
    ) -> Result<Self> {
        if label_values.len() != descriptor.variable_labels.len() {
            return Err(ExporterError::InvalidArgument(format!(
                "{}: expected {} label values but got {}",
                descriptor.name,
                descriptor.variable_labels.len(),
                label_values.len()
            )));
        }

        Ok(Self {
            descriptor: Arc::clone(descriptor),
            metric_type,
            value,
            label_values: label_values.iter().map(|value| (*value).to_string()).collect(),
        })
    }

    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// All samples gathered for one descriptor during a scrape.
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub descriptor: Arc<MetricDescriptor>,
    pub metric_type: MetricType,
    pub samples: Vec<MetricSample>,
}

impl MetricFamily {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Value of the sample whose labels equal `labels`, in descriptor order.
    pub fn value_for(&self, labels: &[&str]) -> Option<f64> {
        self.samples
            .iter()
            .find(|sample| {
                sample.labels.len() == labels.len()
                    && sample
                        .labels
                        .iter()
                        .zip(labels)
                        .all(|((_, value), expected)| value == expected)
            })
            .map(|sample| sample.value)
    }
}
