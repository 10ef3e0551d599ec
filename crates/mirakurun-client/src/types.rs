//! Decoded shapes of the Mirakurun REST API responses.
//!
//! Decoding is lenient: missing or `null` fields fall back to their zero
//! value and unknown fields are ignored, so a newer Mirakurun keeps scraping. Fields
//! that Mirakurun itself declares optional are `Option`s.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// `GET /api/status`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub time: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub process: ProcessStatus,
    #[serde(rename = "EPG", deserialize_with = "null_as_default")]
    pub epg: EpgStatus,
    /// Only reported since Mirakurun 3.9.0-beta.0.
    pub rpc_count: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub stream_count: StreamCount,
    #[serde(deserialize_with = "null_as_default")]
    pub error_count: ErrorCount,
    #[serde(deserialize_with = "null_as_default")]
    pub timer_accuracy: TimerAccuracy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessStatus {
    #[serde(deserialize_with = "null_as_default")]
    pub arch: String,
    #[serde(deserialize_with = "null_as_default")]
    pub platform: String,
    #[serde(deserialize_with = "null_as_default")]
    pub versions: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub pid: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub memory_usage: MemoryUsage,
}

impl ProcessStatus {
    /// Node.js runtime version, empty when the upstream omits it.
    pub fn node_version(&self) -> &str {
        self.versions.get("node").map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryUsage {
    #[serde(deserialize_with = "null_as_default")]
    pub rss: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub heap_total: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub heap_used: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub external: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub array_buffers: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EpgStatus {
    #[serde(deserialize_with = "null_as_default")]
    pub gathering_networks: Vec<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub stored_events: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamCount {
    #[serde(deserialize_with = "null_as_default")]
    pub tuner_device: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub ts_filter: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub decoder: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorCount {
    #[serde(deserialize_with = "null_as_default")]
    pub uncaught_exception: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub unhandled_rejection: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub buffer_overflow: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub tuner_device_respawn: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub decoder_respawn: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimerAccuracy {
    #[serde(deserialize_with = "null_as_default")]
    pub last: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub m1: TimerAccuracyWindow,
    #[serde(deserialize_with = "null_as_default")]
    pub m5: TimerAccuracyWindow,
    #[serde(deserialize_with = "null_as_default")]
    pub m15: TimerAccuracyWindow,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TimerAccuracyWindow {
    #[serde(deserialize_with = "null_as_default")]
    pub avg: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub min: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max: f64,
}

/// One entry of `GET /api/tuners`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tuner {
    #[serde(deserialize_with = "null_as_default")]
    pub index: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<String>,
    pub command: Option<String>,
    pub pid: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub users: Vec<TunerUser>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_available: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_remote: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_free: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_using: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_fault: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TunerUser {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub priority: i64,
    pub agent: Option<String>,
    pub url: Option<String>,
    pub disable_decoder: Option<bool>,
    pub stream_setting: Option<StreamSetting>,
    /// Per-PID packet statistics, keyed by the PID as Mirakurun serializes it.
    pub stream_info: Option<HashMap<String, StreamInfo>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamSetting {
    #[serde(deserialize_with = "null_as_default")]
    pub channel: Channel,
    pub network_id: Option<i64>,
    pub service_id: Option<i64>,
    pub event_id: Option<i64>,
    pub no_provide: Option<bool>,
    #[serde(rename = "parseEIT")]
    pub parse_eit: Option<bool>,
    #[serde(rename = "parseSDT")]
    pub parse_sdt: Option<bool>,
    #[serde(rename = "parseNIT")]
    pub parse_nit: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub packet: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub drop: i64,
}

/// Channel description shared by services and tuner stream settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Channel {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub channel_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Mirakurun spells this field `satelite`.
    #[serde(rename = "satelite")]
    pub satellite: Option<String>,
    pub service_id: Option<i64>,
    pub space: Option<i64>,
    pub freq: Option<i64>,
    pub polarity: Option<String>,
    pub tsmf_rel_ts: Option<i64>,
    pub is_disabled: Option<bool>,
}

/// One entry of `GET /api/programs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Program {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub event_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub service_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub network_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub start_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub duration: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub is_free: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub genres: Option<Vec<ProgramGenre>>,
    pub extended: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct ProgramGenre {
    #[serde(deserialize_with = "null_as_default")]
    pub lv1: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub lv2: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub un1: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub un2: i64,
}

/// One entry of `GET /api/services`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Service {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub service_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub network_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub service_type: i64,
    pub logo_id: Option<i64>,
    pub remote_control_key_id: Option<i64>,
    pub epg_ready: Option<bool>,
    pub epg_updated_at: Option<i64>,
    pub channel: Option<Channel>,
    pub has_logo_data: Option<bool>,
}

/// Reads a JSON `null` as the field's zero value, matching how a missing
/// field is treated.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
