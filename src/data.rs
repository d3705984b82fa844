mod config_ort;
mod filesystem_access;
mod metrics;
mod time_calc;
pub mod send_channels;

pub use config_ort::EngineOptions;
pub use filesystem_access::FsAccess;
pub use metrics::{Metrics, MetricsSnapshot};
pub use time_calc::{Phase, TimeCalc};
