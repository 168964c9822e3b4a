//! Error types for the device framework.

use thiserror::Error;
use zenvenus_common::{ErrorCode, ErrorReply, ValueKind};

/// Result type alias using [`DeviceError`].
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors that can occur in a device.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration validation error.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// The service name is already claimed or the bus is unreachable.
    #[error("Device registration failed: {0}")]
    Registration(String),

    /// Zenoh session error.
    #[error("Zenoh session error: {0}")]
    ZenohSession(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Publishing error.
    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },

    /// Attribute declared twice.
    #[error("Attribute {0} is already declared")]
    DuplicatePath(String),

    /// Attribute path is malformed.
    #[error("Invalid attribute path '{0}': paths start with '/'")]
    InvalidPath(String),

    /// Attribute not declared.
    #[error("Unknown attribute {0}")]
    UnknownPath(String),

    /// Remote write to a read-only attribute.
    #[error("Attribute {0} is read-only")]
    ReadOnly(String),

    /// Value does not fit the attribute's declared kind.
    #[error("Attribute {path} expects a {expected} value, got {actual}")]
    TypeMismatch {
        path: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// Settings collaborator failure.
    #[error("Settings error: {0}")]
    Settings(String),

    /// Malformed request from a remote caller.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DeviceError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a configuration validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ConfigValidation(msg.into())
    }

    /// Create a registration error.
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration(msg.into())
    }

    /// Create a settings error.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Wrap an error with context.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Category reported to remote callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownPath(_) | Self::InvalidPath(_) => ErrorCode::UnknownPath,
            Self::ReadOnly(_) => ErrorCode::ReadOnly,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::Settings(_) => ErrorCode::Settings,
            Self::BadRequest(_) | Self::Serialization(_) => ErrorCode::BadRequest,
            _ => ErrorCode::Internal,
        }
    }

    /// Error payload for a bus reply.
    pub fn to_reply(&self) -> ErrorReply {
        ErrorReply::new(self.code(), self.to_string())
    }
}

impl From<zenoh::Error> for DeviceError {
    fn from(err: zenoh::Error) -> Self {
        Self::ZenohSession(err.to_string())
    }
}

impl From<zenvenus_common::Error> for DeviceError {
    fn from(err: zenvenus_common::Error) -> Self {
        match err {
            zenvenus_common::Error::Config(msg) => Self::Config(msg),
            zenvenus_common::Error::ServiceName(msg) => Self::ConfigValidation(msg),
            zenvenus_common::Error::Io(e) => Self::Io(e),
            other => Self::Serialization(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DeviceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
