use serde::Deserialize;

use crate::domain::dispatch::DispatchLimits;
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub signing: SigningConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Markdown file rendered at `GET /`
    pub docs_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Credential store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL, or `memory` for the in-process repository
    pub database_url: String,
    pub max_connections: u32,
}

impl StorageConfig {
    pub fn is_in_memory(&self) -> bool {
        self.database_url.eq_ignore_ascii_case("memory")
    }
}

/// Signing keypair settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub private_key_path: String,
    pub public_key_path: Option<String>,
    pub key_bits: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub max_message_length: usize,
    pub max_recipients: usize,
    pub max_file_bytes: usize,
    pub request_timeout_secs: u64,
    pub pacing: PacingConfig,
}

impl DispatchConfig {
    pub fn limits(&self) -> DispatchLimits {
        DispatchLimits {
            max_message_length: self.max_message_length,
            max_recipients: self.max_recipients,
            max_file_bytes: self.max_file_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    #[default]
    Jitter,
    TokenBucket,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub mode: PacingMode,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub rate_per_second: f64,
    pub burst: u32,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Bridge,
    DryRun,
    #[default]
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub bridge_url: String,
    pub bridge_token: Option<String>,
    pub recipient_server: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared secret for the `/admin` routes; admin routes answer 403 when unset
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            docs_path: "doc.md".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://apikeys.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            private_key_path: "private.pem".to_string(),
            public_key_path: Some("public.pem".to_string()),
            key_bits: 2048,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let limits = DispatchLimits::default();

        Self {
            max_message_length: limits.max_message_length,
            max_recipients: limits.max_recipients,
            max_file_bytes: limits.max_file_bytes,
            request_timeout_secs: 300,
            pacing: PacingConfig::default(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            mode: PacingMode::default(),
            min_delay_ms: 50,
            max_delay_ms: 700,
            rate_per_second: 2.0,
            burst: 1,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            bridge_url: "http://localhost:3000".to_string(),
            bridge_token: None,
            recipient_server: "s.whatsapp.net".to_string(),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.docs_path, "doc.md");
        assert_eq!(config.dispatch.max_message_length, 250);
        assert_eq!(config.dispatch.pacing.mode, PacingMode::Jitter);
        assert_eq!(config.transport.kind, TransportKind::None);
        assert_eq!(config.transport.recipient_server, "s.whatsapp.net");
        assert!(config.admin.token.is_none());
        assert!(!config.storage.is_in_memory());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = config::Config::builder()
            .set_override("dispatch.max_recipients", 10)
            .unwrap()
            .set_override("transport.kind", "dry_run")
            .unwrap()
            .set_override("storage.database_url", "memory")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.dispatch.max_recipients, 10);
        assert_eq!(config.dispatch.max_message_length, 250);
        assert_eq!(config.transport.kind, TransportKind::DryRun);
        assert!(config.storage.is_in_memory());
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_limits_follow_config() {
        let mut config = DispatchConfig::default();
        config.max_message_length = 100;

        let limits = config.limits();
        assert_eq!(limits.max_message_length, 100);
        assert_eq!(limits.max_recipients, 500);
    }
}
