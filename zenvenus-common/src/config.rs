use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable that selects the session bus when `bus` is `auto`.
pub const SESSION_BUS_ENV: &str = "ZENVENUS_SESSION_BUS";

/// Endpoint of the system-wide Zenoh router on the local host.
pub const SYSTEM_BUS_ENDPOINT: &str = "tcp/127.0.0.1:7447";

/// Which bus a device attaches to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// Pick `Session` when [`SESSION_BUS_ENV`] is set, `System` otherwise.
    #[default]
    Auto,
    /// Client of the local system router.
    System,
    /// Peer session, for development hosts.
    Session,
}

impl BusKind {
    /// Resolve `Auto` from the process environment.
    pub fn resolve(self) -> BusKind {
        self.resolve_with(std::env::var_os(SESSION_BUS_ENV).is_some())
    }

    /// Resolve `Auto` given whether the session bus was requested.
    pub fn resolve_with(self, session_requested: bool) -> BusKind {
        match self {
            BusKind::Auto if session_requested => BusKind::Session,
            BusKind::Auto => BusKind::System,
            other => other,
        }
    }

    /// Zenoh mode for a resolved bus kind.
    pub fn zenoh_mode(self) -> &'static str {
        match self {
            BusKind::Session => "peer",
            BusKind::System | BusKind::Auto => "client",
        }
    }
}

/// Common Zenoh connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Bus selection: "auto", "system" or "session".
    #[serde(default)]
    pub bus: BusKind,

    /// Endpoints to connect to. The system bus defaults to the local router.
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on (session bus).
    #[serde(default)]
    pub listen: Vec<String>,

    /// Enable multicast scouting (session bus only).
    #[serde(default = "default_true")]
    pub multicast_scouting: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::default(),
            connect: Vec::new(),
            listen: Vec::new(),
            multicast_scouting: true,
        }
    }
}

impl ZenohConfig {
    /// Endpoints to connect to once the bus kind is resolved.
    pub fn connect_endpoints(&self, bus: BusKind) -> Vec<String> {
        if self.connect.is_empty() && bus == BusKind::System {
            vec![SYSTEM_BUS_ENDPOINT.to_string()]
        } else {
            self.connect.clone()
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}
