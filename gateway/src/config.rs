//! Gateway configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use votegate_rpc::ServiceSettings;
use votegate_sessions::SnapshotPolicy;
use votegate_utils::LogFormat;

use crate::GatewayError;

/// Deployment environment. Selects logging defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    /// Log format and level used when the config does not set them.
    pub fn log_defaults(&self) -> (LogFormat, &'static str) {
        match self {
            Self::Local => (LogFormat::Human, "debug"),
            Self::Dev => (LogFormat::Json, "debug"),
            Self::Prod => (LogFormat::Json, "info"),
        }
    }
}

impl FromStr for Environment {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(GatewayError::Config(format!(
                "unknown environment {other:?} (expected local, dev or prod)"
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a gateway.
///
/// Can be loaded from a TOML file via [`GatewayConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub env: Environment,

    /// Overrides the environment's log format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,

    /// Overrides the environment's log level filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default = "default_http_address")]
    pub http_address: IpAddr,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Serve the event-stream bridge.
    #[serde(default = "default_true")]
    pub enable_websocket: bool,

    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    /// Period of the background status sweep.
    #[serde(default = "default_status_refresh_secs")]
    pub status_refresh_secs: u64,

    /// How long a session lookup waits for the indexer.
    #[serde(default = "default_detail_wait_ms")]
    pub detail_wait_ms: u64,

    #[serde(default)]
    pub snapshot_policy: SnapshotPolicy,

    /// Capacity of each topic channel and of the inbound update queue.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,

    /// Claim cooldown of the simulated ledger.
    #[serde(default = "default_claim_cooldown_secs")]
    pub claim_cooldown_secs: u64,

    /// Account the simulated ledger signs with.
    #[serde(default = "default_operator_address")]
    pub operator_address: String,

    /// Upper bound on waiting for background tasks at shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_http_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_http_port() -> u16 {
    8062
}

fn default_true() -> bool {
    true
}

fn default_ws_port() -> u16 {
    8063
}

fn default_status_refresh_secs() -> u64 {
    10
}

fn default_detail_wait_ms() -> u64 {
    100
}

fn default_event_channel_capacity() -> usize {
    256
}

fn default_confirmation_timeout_secs() -> u64 {
    60
}

fn default_confirmation_poll_ms() -> u64 {
    1000
}

fn default_claim_cooldown_secs() -> u64 {
    86_400
}

fn default_operator_address() -> String {
    "0x0000000000000000000000000000000000000001".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GatewayError> {
        let config: Self = toml::from_str(s).map_err(|e| GatewayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GatewayError> {
        toml::to_string_pretty(self).map_err(|e| GatewayError::Config(e.to_string()))
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.status_refresh_secs == 0 {
            return Err(GatewayError::Config("status_refresh_secs must be positive".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(GatewayError::Config(
                "event_channel_capacity must be positive".into(),
            ));
        }
        if self.confirmation_poll_ms == 0 {
            return Err(GatewayError::Config("confirmation_poll_ms must be positive".into()));
        }
        if self.enable_websocket && self.http_port != 0 && self.http_port == self.websocket_port {
            return Err(GatewayError::Config(format!(
                "http_port and websocket_port are both {}",
                self.http_port
            )));
        }
        Ok(())
    }

    /// Effective log format and level.
    pub fn logging(&self) -> (LogFormat, String) {
        let (format, level) = self.env.log_defaults();
        (
            self.log_format.unwrap_or(format),
            self.log_level.clone().unwrap_or_else(|| level.to_string()),
        )
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_address, self.http_port)
    }

    pub fn websocket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http_address, self.websocket_port)
    }

    pub fn status_refresh(&self) -> Duration {
        Duration::from_secs(self.status_refresh_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn claim_cooldown(&self) -> Duration {
        Duration::from_secs(self.claim_cooldown_secs)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            detail_wait: Duration::from_millis(self.detail_wait_ms),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            confirmation_poll: Duration::from_millis(self.confirmation_poll_ms),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            env: Environment::default(),
            log_format: None,
            log_level: None,
            http_address: default_http_address(),
            http_port: default_http_port(),
            enable_websocket: default_true(),
            websocket_port: default_ws_port(),
            status_refresh_secs: default_status_refresh_secs(),
            detail_wait_ms: default_detail_wait_ms(),
            snapshot_policy: SnapshotPolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            confirmation_poll_ms: default_confirmation_poll_ms(),
            claim_cooldown_secs: default_claim_cooldown_secs(),
            operator_address: default_operator_address(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = GatewayConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = GatewayConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = GatewayConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.http_port, 8062);
        assert_eq!(config.websocket_port, 8063);
        assert!(config.enable_websocket);
        assert_eq!(config.status_refresh_secs, 10);
        assert_eq!(config.detail_wait_ms, 100);
        assert_eq!(config.snapshot_policy, SnapshotPolicy::Preserve);
        assert_eq!(config.http_addr().to_string(), "0.0.0.0:8062");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            env = "prod"
            http_port = 9000
            snapshot_policy = "replace"
        "#;
        let config = GatewayConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.env, Environment::Prod);
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.snapshot_policy, SnapshotPolicy::Replace);
        assert_eq!(config.websocket_port, 8063);
    }

    #[test]
    fn environment_selects_logging_unless_overridden() {
        let mut config = GatewayConfig::default();
        assert_eq!(config.logging(), (LogFormat::Human, "debug".to_string()));
        config.env = Environment::Prod;
        assert_eq!(config.logging(), (LogFormat::Json, "info".to_string()));
        config.log_level = Some("warn".into());
        config.log_format = Some(LogFormat::Human);
        assert_eq!(config.logging(), (LogFormat::Human, "warn".to_string()));

        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Dev);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(GatewayConfig::from_toml_str("status_refresh_secs = 0").is_err());
        assert!(GatewayConfig::from_toml_str("http_port = 7000\nwebsocket_port = 7000").is_err());
        assert!(GatewayConfig::from_toml_str("http_port = \"x\"").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_port = 8100\nenable_websocket = false").unwrap();
        let config = GatewayConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.http_port, 8100);
        assert!(!config.enable_websocket);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = GatewayConfig::from_toml_file("/nonexistent/votegate.toml");
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }
}
