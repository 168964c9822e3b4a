//! Wire messages exchanged between devices and bus consumers.

use serde::{Deserialize, Serialize};

use crate::value::{Value, current_timestamp_millis};

/// Text shown for an attribute that has no value yet.
pub const UNSET_TEXT: &str = "---";

/// Published state of one attribute.
///
/// Sent as the reply to a read query and as the payload of every change
/// notification on `<service_key><path>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    /// Attribute path (e.g., "/System/Uptime").
    pub path: String,

    /// Raw value in its canonical unit, `None` when unset.
    pub value: Option<Value>,

    /// Display text produced by the attribute's formatter.
    pub text: String,

    /// Unix epoch milliseconds when the snapshot was taken.
    pub timestamp: i64,
}

impl AttributeSnapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(path: impl Into<String>, value: Option<Value>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value,
            text: text.into(),
            timestamp: current_timestamp_millis(),
        }
    }
}

/// Payload of a write query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetValue {
    pub value: Value,
}

/// Machine-readable error category carried in an [`ErrorReply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownPath,
    ReadOnly,
    TypeMismatch,
    Settings,
    BadRequest,
    Internal,
}

/// Error payload sent with `reply_err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReply {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
