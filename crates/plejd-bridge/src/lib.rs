//! Plejd Bridge - Wiring for the registry and scene engine
//!
//! Loads configuration and a cached site document, populates the device
//! registry from it and keeps the scene catalog in step with it.

pub mod bridge;
pub mod config;
pub mod telemetry;

pub use bridge::Bridge;
pub use config::{load_config, save_default_config, Config, ConfigError};
