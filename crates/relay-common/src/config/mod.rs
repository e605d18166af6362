//! Configuration structs

mod app_config;

pub use app_config::{
    AppSettings, ConfigError, Environment, RelayConfig, RelaySettings, ServerConfig,
    DEFAULT_OUTBOUND_QUEUE_CAPACITY,
};
