//! zenvenus Common Library
//!
//! This crate provides shared types and utilities for zenvenus devices and
//! the consumers that read them:
//!
//! - [`value`] - Typed attribute values (`Value`, `ValueKind`)
//! - [`message`] - Wire messages (`AttributeSnapshot`, `SetValue`, `ErrorReply`)
//! - [`serialization`] - JSON/CBOR encoding and decoding
//! - [`config`] - Configuration loading (JSON5 format) and bus selection
//! - [`session`] - Zenoh session management
//! - [`keyexpr`] - Service names and key expression builders
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod message;
pub mod serialization;
pub mod session;
pub mod value;

// Re-export commonly used types at the crate root
pub use config::{BusKind, LogFormat, LoggingConfig, ZenohConfig, parse_config};
pub use error::{Error, Result};
pub use keyexpr::{
    SETTINGS_KEY_PREFIX, ServiceName, alive_key, attribute_key, attribute_path, service_wildcard,
    status_key,
};
pub use message::{AttributeSnapshot, ErrorCode, ErrorReply, SetValue, UNSET_TEXT};
pub use serialization::{Format, decode, decode_auto, encode};
pub use session::connect;
pub use value::{Value, ValueKind, current_timestamp_millis};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Example
///
/// ```ignore
/// use zenvenus_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
