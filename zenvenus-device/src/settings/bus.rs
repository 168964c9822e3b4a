//! Settings service reached over the Zenoh bus.
//!
//! The settings service answers the same query protocol as devices: a query
//! without payload reads `<prefix><path>`, a query carrying a [`SetValue`]
//! writes it.

use std::sync::Arc;
use std::time::Duration;

use zenoh::Session;
use zenoh::query::Reply;
use zenvenus_common::{
    AttributeSnapshot, ErrorCode, ErrorReply, Format, SetValue, Value, attribute_key,
    attribute_path, decode_auto, encode,
};

use super::{Settings, is_instance_setting};
use crate::error::{DeviceError, Result};

/// Client of a settings service on the bus.
#[derive(Debug, Clone)]
pub struct BusSettings {
    session: Arc<Session>,
    key_prefix: String,
    timeout: Duration,
    format: Format,
}

impl BusSettings {
    /// Create a client for the settings service at `key_prefix`.
    pub fn new(session: Arc<Session>, key_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self {
            session,
            key_prefix: key_prefix.into(),
            timeout,
            format: Format::Json,
        }
    }

    /// Set the encoding used for write payloads.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Key prefix of the settings service.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    async fn query(&self, key: &str, payload: Option<Vec<u8>>) -> Result<Vec<Reply>> {
        let request = self.session.get(key).timeout(self.timeout);
        let replies = match payload {
            Some(payload) => request.payload(payload).await,
            None => request.await,
        }
        .map_err(|e| DeviceError::settings(format!("query {} failed: {}", key, e)))?;

        let mut collected = Vec::new();
        while let Ok(reply) = replies.recv_async().await {
            collected.push(reply);
        }
        Ok(collected)
    }
}

fn error_reply(reply: &Reply) -> Option<ErrorReply> {
    let err = reply.result().err()?;
    Some(
        decode_auto(&err.payload().to_bytes()).unwrap_or_else(|_| {
            ErrorReply::new(ErrorCode::Internal, "malformed error reply")
        }),
    )
}

impl Settings for BusSettings {
    async fn load_setting(&self, path: &str, default: Option<Value>) -> Result<Option<Value>> {
        let key = attribute_key(&self.key_prefix, path);

        for reply in self.query(&key, None).await? {
            if let Some(err) = error_reply(&reply) {
                if err.code == ErrorCode::UnknownPath {
                    return Ok(default);
                }
                return Err(DeviceError::settings(format!("{}: {}", path, err.message)));
            }
            if let Ok(sample) = reply.result() {
                let snapshot: AttributeSnapshot = decode_auto(&sample.payload().to_bytes())?;
                return Ok(snapshot.value.or(default));
            }
        }

        tracing::debug!(%key, "No stored setting, using default");
        Ok(default)
    }

    async fn save_setting(&self, path: &str, value: &Value) -> Result<()> {
        let key = attribute_key(&self.key_prefix, path);
        let payload = encode(
            &SetValue {
                value: value.clone(),
            },
            self.format,
        )?;

        let replies = self.query(&key, Some(payload)).await?;
        let Some(reply) = replies.first() else {
            return Err(DeviceError::settings(format!(
                "no reply from settings service for {}",
                path
            )));
        };

        match error_reply(reply) {
            Some(err) => Err(DeviceError::settings(format!("{}: {}", path, err.message))),
            None => Ok(()),
        }
    }

    async fn instance_claims(&self) -> Result<Vec<(String, String)>> {
        let key = format!(
            "{}/Settings/Devices/*/ClassAndVrmInstance",
            self.key_prefix
        );

        let mut claims = Vec::new();
        for reply in self.query(&key, None).await? {
            let Ok(sample) = reply.result() else {
                continue;
            };
            let Some(path) = attribute_path(&self.key_prefix, sample.key_expr().as_str()) else {
                continue;
            };
            if !is_instance_setting(&path) {
                continue;
            }
            match decode_auto::<AttributeSnapshot>(&sample.payload().to_bytes()) {
                Ok(AttributeSnapshot {
                    value: Some(Value::Text(claim)),
                    ..
                }) => claims.push((path, claim)),
                Ok(_) => {}
                Err(e) => tracing::warn!(%path, error = %e, "Skipping malformed instance claim"),
            }
        }

        Ok(claims)
    }
}
