//! Application configuration

mod app_config;

pub use app_config::{
    AdminConfig, AppConfig, DispatchConfig, LogFormat, LoggingConfig, PacingConfig, PacingMode,
    ServerConfig, SigningConfig, StorageConfig, TransportConfig, TransportKind,
};
