pub mod api;
pub mod client;
pub mod types;

pub use api::MirakurunApi;
pub use client::MirakurunClient;
pub use types::{Program, Service, StatusResponse, Tuner, TunerUser};
