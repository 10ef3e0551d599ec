use std::{
    collections::HashMap,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use mirakurun_client::{
    MirakurunApi, Program, Service, StatusResponse, Tuner, TunerUser,
    api::{PROGRAMS_PATH, SERVICES_PATH, STATUS_PATH, TUNERS_PATH},
    types::{Channel, StreamInfo},
};
use mirakurun_common::error::{ExporterError, Result};

use crate::metrics::{Collector, MetricFamily, MetricsRegistry};

/// Canned upstream. A `None` resource answers with HTTP 503.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub status: Option<StatusResponse>,
    pub tuners: Option<Vec<Tuner>>,
    pub programs: Option<Vec<Program>>,
    pub services: Option<Vec<Service>>,
    pub calls: AtomicUsize,
}

impl FakeApi {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(&self, path: &str, value: &Option<T>) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        value.clone().ok_or_else(|| ExporterError::UnexpectedStatus {
            path: path.to_string(),
            status: 503,
        })
    }
}

#[async_trait]
impl MirakurunApi for FakeApi {
    async fn get_status(&self) -> Result<StatusResponse> {
        self.answer(STATUS_PATH, &self.status)
    }

    async fn get_tuners(&self) -> Result<Vec<Tuner>> {
        self.answer(TUNERS_PATH, &self.tuners)
    }

    async fn get_programs(&self) -> Result<Vec<Program>> {
        self.answer(PROGRAMS_PATH, &self.programs)
    }

    async fn get_services(&self) -> Result<Vec<Service>> {
        self.answer(SERVICES_PATH, &self.services)
    }
}

/// In-memory sink for log lines emitted on the current thread.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Routes this thread's events into the buffer until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn count(&self, message: &str) -> usize {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer).matches(message).count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) async fn gather_from(collector: impl Collector + 'static) -> Vec<MetricFamily> {
    let mut registry = MetricsRegistry::new();
    registry.register(Box::new(collector)).unwrap();
    registry.gather().await.unwrap()
}

pub(crate) fn family<'a>(families: &'a [MetricFamily], name: &str) -> &'a MetricFamily {
    families
        .iter()
        .find(|family| family.name() == name)
        .unwrap_or_else(|| panic!("metric family {name} was not gathered"))
}

pub(crate) fn sample_status() -> StatusResponse {
    let mut status = StatusResponse {
        version: "3.9.0-rc.2".to_string(),
        rpc_count: Some(3),
        ..StatusResponse::default()
    };
    status.process.arch = "x64".to_string();
    status
        .process
        .versions
        .insert("node".to_string(), "v14.17.0".to_string());
    status.process.memory_usage.rss = 104_857_600;
    status.process.memory_usage.heap_total = 52_428_800;
    status.process.memory_usage.heap_used = 41_943_040;
    status.epg.stored_events = 12_345;
    status.stream_count.tuner_device = 2;
    status.stream_count.ts_filter = 4;
    status.stream_count.decoder = 1;
    status.error_count.buffer_overflow = 7;
    status.error_count.tuner_device_respawn = 1;
    status.timer_accuracy.m1.avg = 1500.0;
    status.timer_accuracy.m5.avg = 2000.0;
    status.timer_accuracy.m15.avg = 2500.0;
    status
}

pub(crate) fn tuner(
    name: &str,
    types: &[&str],
    is_free: bool,
    is_using: bool,
    users: Vec<TunerUser>,
) -> Tuner {
    Tuner {
        name: name.to_string(),
        types: types.iter().map(|ty| (*ty).to_string()).collect(),
        users,
        is_available: true,
        is_free,
        is_using,
        ..Tuner::default()
    }
}

pub(crate) fn user() -> TunerUser {
    TunerUser {
        id: "127.0.0.1:40000".to_string(),
        ..TunerUser::default()
    }
}

/// A user whose stream info holds one entry per `(packet, drop)` pair.
pub(crate) fn user_with_stream(entries: &[(i64, i64)]) -> TunerUser {
    let stream_info = entries
        .iter()
        .enumerate()
        .map(|(pid, (packet, drop))| {
            (
                pid.to_string(),
                StreamInfo {
                    packet: *packet,
                    drop: *drop,
                },
            )
        })
        .collect::<HashMap<_, _>>();

    TunerUser {
        stream_info: Some(stream_info),
        ..user()
    }
}

pub(crate) fn program(service_id: i64) -> Program {
    Program {
        service_id,
        ..Program::default()
    }
}

pub(crate) fn service(network_id: i64, service_id: i64, channel: Option<(&str, &str)>) -> Service {
    Service {
        network_id,
        service_id,
        channel: channel.map(|(channel_type, channel)| Channel {
            channel_type: channel_type.to_string(),
            channel: channel.to_string(),
            ..Channel::default()
        }),
        ..Service::default()
    }
}

/// Upstream where every resource answers.
pub(crate) fn full_snapshot() -> FakeApi {
    FakeApi {
        status: Some(sample_status()),
        tuners: Some(vec![
            tuner("A", &["GR"], true, false, vec![user_with_stream(&[(100, 2)])]),
            tuner("B", &["BS", "CS"], false, true, vec![]),
        ]),
        programs: Some(vec![program(1024), program(1024), program(101)]),
        services: Some(vec![
            service(32736, 1024, Some(("GR", "27"))),
            service(4, 101, Some(("BS", "BS15_0"))),
        ]),
        ..FakeApi::default()
    }
}
