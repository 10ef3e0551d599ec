pub mod programs;
pub mod services;
pub mod status;
pub mod tuners;
