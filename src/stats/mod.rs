//! Statistics and metrics

pub mod metrics;

pub use metrics::{RegistryMetrics, RegistryStats, SessionStats};
