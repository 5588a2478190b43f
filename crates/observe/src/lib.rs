//! This crate contains the code required to observe the settlement engine:
//! initialization logic for logging and the global metrics registry.
pub mod config;
pub mod metrics;
pub mod tracing;

pub use config::Config;
