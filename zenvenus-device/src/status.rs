//! Device status reporting.

use serde::{Deserialize, Serialize};
use zenvenus_common::status_key;

use crate::Result;
use crate::publisher::DevicePublisher;

/// Device status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Service name (e.g., "com.victronenergy.temperature.pi").
    pub device: String,
    /// Process version.
    pub version: String,
    /// Current status ("running", "offline", "error").
    pub status: String,
    /// Additional metadata (device-specific).
    #[serde(flatten)]
    pub metadata: serde_json::Value,
}

impl DeviceStatus {
    fn with_state(device: impl Into<String>, version: impl Into<String>, status: &str) -> Self {
        Self {
            device: device.into(),
            version: version.into(),
            status: status.to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    /// Create a new status with "running" state.
    pub fn running(device: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(device, version, "running")
    }

    /// Create a status with "offline" state.
    pub fn offline(device: impl Into<String>, version: impl Into<String>) -> Self {
        Self::with_state(device, version, "offline")
    }

    /// Create a status with "error" state.
    pub fn error(
        device: impl Into<String>,
        version: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::with_state(device, version, "error")
            .with_metadata(serde_json::json!({ "error": error.into() }))
    }

    /// Add metadata to the status.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Publish this status to `{key_prefix}/@/status`.
    pub async fn publish(&self, publisher: &DevicePublisher) -> Result<()> {
        let key = status_key(publisher.key_prefix());
        publisher.publish_json(&key, self).await
    }
}

/// Helper to publish device status on startup and shutdown.
pub struct StatusPublisher {
    device: String,
    version: String,
}

impl StatusPublisher {
    pub fn new(device: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            version: version.into(),
        }
    }

    /// Publish "running" status with optional metadata.
    pub async fn publish_running(
        &self,
        publisher: &DevicePublisher,
        metadata: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut status = DeviceStatus::running(&self.device, &self.version);
        if let Some(meta) = metadata {
            status = status.with_metadata(meta);
        }
        status.publish(publisher).await
    }

    /// Publish "offline" status.
    pub async fn publish_offline(&self, publisher: &DevicePublisher) -> Result<()> {
        DeviceStatus::offline(&self.device, &self.version)
            .publish(publisher)
            .await
    }

    /// Publish "error" status.
    pub async fn publish_error(
        &self,
        publisher: &DevicePublisher,
        error: impl Into<String>,
    ) -> Result<()> {
        DeviceStatus::error(&self.device, &self.version, error)
            .publish(publisher)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_running() {
        let status = DeviceStatus::running("com.victronenergy.temperature.pi", "0.2.0");
        assert_eq!(status.device, "com.victronenergy.temperature.pi");
        assert_eq!(status.status, "running");
    }

    #[test]
    fn test_status_with_metadata() {
        let status = DeviceStatus::running("com.victronenergy.temperature.pi", "0.2.0")
            .with_metadata(serde_json::json!({
                "device_instance": 2048,
                "poll_interval_secs": 1
            }));

        assert_eq!(status.metadata["device_instance"], 2048);
        assert_eq!(status.metadata["poll_interval_secs"], 1);
    }

    #[test]
    fn test_status_error_carries_message() {
        let status = DeviceStatus::error("svc", "0.2.0", "thermal zone missing");
        assert_eq!(status.status, "error");
        assert_eq!(status.metadata["error"], "thermal zone missing");
    }

    #[test]
    fn test_status_serialization() {
        let status = DeviceStatus::offline("svc", "1.0.0")
            .with_metadata(serde_json::json!({ "ticks": 5 }));

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"device\":\"svc\""));
        assert!(json.contains("\"status\":\"offline\""));
        assert!(json.contains("\"ticks\":5"));
    }
}
