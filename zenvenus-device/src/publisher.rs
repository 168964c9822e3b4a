//! Device publisher for Zenoh.
//!
//! The publisher owns the device's presence on the bus: the liveliness token
//! claiming the service name, the set of remotely addressable attributes, and
//! the answers to remote reads and writes.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use zenoh::Session;
use zenoh::handlers::FifoChannelHandler;
use zenoh::key_expr::keyexpr;
use zenoh::liveliness::LivelinessToken;
use zenoh::query::{Query, Queryable};
use zenvenus_common::{
    Format, SetValue, alive_key, attribute_key, attribute_path, decode_auto, encode,
    service_wildcard,
};

use crate::error::{DeviceError, Result};
use crate::identity::DeviceIdentity;
use crate::registry::{Attribute, AttributeRegistry};
use crate::settings::Settings;

/// Queryable answering reads and writes for a device.
pub type DeviceQueryable = Queryable<FifoChannelHandler<Query>>;

/// A device registered on the bus.
///
/// Dropping the publisher undeclares its liveliness token, which releases the
/// service name.
#[derive(Debug)]
pub struct DevicePublisher {
    session: Arc<Session>,
    key_prefix: String,
    format: Format,
    exposed: BTreeSet<String>,
    _token: LivelinessToken,
}

impl DevicePublisher {
    /// Claim the identity's service name on the bus.
    ///
    /// Any live token on `<prefix>/@/alive` answering within `probe_timeout`
    /// means another process owns the name, and registration fails.
    pub async fn register(
        session: Arc<Session>,
        identity: &DeviceIdentity,
        format: Format,
        probe_timeout: Duration,
    ) -> Result<Self> {
        let key_prefix = identity.key_prefix();
        let alive = alive_key(&key_prefix);

        let replies = session
            .liveliness()
            .get(&alive)
            .timeout(probe_timeout)
            .await
            .map_err(|e| DeviceError::registration(format!("probing {} failed: {}", alive, e)))?;

        while let Ok(reply) = replies.recv_async().await {
            if reply.result().is_ok() {
                return Err(DeviceError::registration(format!(
                    "service {} is already registered",
                    identity.service
                )));
            }
        }

        let token = session
            .liveliness()
            .declare_token(&alive)
            .await
            .map_err(|e| {
                DeviceError::registration(format!("failed to declare {}: {}", alive, e))
            })?;

        tracing::info!(service = %identity.service, key = %alive, "Device registered");

        Ok(Self {
            session,
            key_prefix,
            format,
            exposed: BTreeSet::new(),
            _token: token,
        })
    }

    /// Get the key prefix.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Get the serialization format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Get a reference to the Zenoh session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Make an attribute remotely addressable.
    pub fn expose_attribute(&mut self, attribute: &Attribute) {
        self.exposed.insert(attribute.path().to_string());
    }

    /// Make every declared attribute remotely addressable.
    pub fn expose_all(&mut self, registry: &AttributeRegistry) {
        for attribute in registry.iter() {
            self.expose_attribute(attribute);
        }
    }

    /// Whether `path` is remotely addressable.
    pub fn is_exposed(&self, path: &str) -> bool {
        self.exposed.contains(path)
    }

    /// Declare the queryable serving `<prefix>/**`.
    pub async fn declare_queryable(&self) -> Result<DeviceQueryable> {
        let key = service_wildcard(&self.key_prefix);
        let queryable = self
            .session
            .declare_queryable(&key)
            .await
            .map_err(|e| DeviceError::registration(format!("failed to declare {}: {}", key, e)))?;

        tracing::debug!(%key, "Queryable declared");
        Ok(queryable)
    }

    /// Answer one query.
    ///
    /// A query without payload is a read; one carrying a [`SetValue`] is a
    /// write. Failures are reported back to the caller as an error reply;
    /// the returned error only covers failing to send the reply itself.
    pub async fn answer<S: Settings>(
        &self,
        query: &Query,
        registry: &mut AttributeRegistry,
        settings: &S,
    ) -> Result<()> {
        let outcome = match query.payload() {
            None => self.answer_read(query, registry).await,
            Some(payload) => {
                let payload = payload.to_bytes();
                self.answer_write(query, &payload, registry, settings).await
            }
        };

        if let Err(e) = outcome {
            tracing::debug!(key = %query.key_expr(), error = %e, "Rejecting query");
            let payload = encode(&e.to_reply(), self.format)?;
            query
                .reply_err(payload)
                .await
                .map_err(|e| DeviceError::Publish {
                    key: query.key_expr().to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }

    async fn answer_read(&self, query: &Query, registry: &AttributeRegistry) -> Result<()> {
        let selector = query.key_expr();
        let mut matched = 0;

        for path in &self.exposed {
            let key = attribute_key(&self.key_prefix, path);
            let Ok(candidate) = keyexpr::new(key.as_str()) else {
                continue;
            };
            if !selector.intersects(candidate) {
                continue;
            }

            let snapshot = registry.snapshot(path)?;
            self.reply(query, key, &snapshot).await?;
            matched += 1;
        }

        if matched == 0 {
            return Err(DeviceError::UnknownPath(
                attribute_path(&self.key_prefix, selector.as_str())
                    .unwrap_or_else(|| selector.to_string()),
            ));
        }

        Ok(())
    }

    async fn answer_write<S: Settings>(
        &self,
        query: &Query,
        payload: &[u8],
        registry: &mut AttributeRegistry,
        settings: &S,
    ) -> Result<()> {
        let key = query.key_expr().as_str();
        if key.contains('*') {
            return Err(DeviceError::BadRequest(format!(
                "writes need a concrete key, got {}",
                key
            )));
        }

        let path = attribute_path(&self.key_prefix, key)
            .ok_or_else(|| DeviceError::UnknownPath(key.to_string()))?;
        if !self.is_exposed(&path) {
            return Err(DeviceError::UnknownPath(path));
        }

        let request: SetValue = decode_auto(payload)
            .map_err(|e| DeviceError::BadRequest(format!("invalid write payload: {}", e)))?;

        let changed = registry.write(&path, request.value, settings).await?;
        tracing::info!(%path, changed, "Remote write accepted");

        let snapshot = registry.snapshot(&path)?;
        self.reply(query, key.to_string(), &snapshot).await
    }

    async fn reply<T: serde::Serialize>(&self, query: &Query, key: String, value: &T) -> Result<()> {
        let payload = encode(value, self.format)?;
        query
            .reply(key.as_str(), payload)
            .await
            .map_err(|e| DeviceError::Publish {
                key,
                message: e.to_string(),
            })
    }

    /// Publish the current snapshot of an attribute on its key.
    pub async fn publish_change(&self, attribute: &Attribute) -> Result<()> {
        let key = attribute_key(&self.key_prefix, attribute.path());
        let payload = encode(&attribute.snapshot(), self.format)?;
        self.publish_raw(&key, payload).await
    }

    /// Publish every exposed attribute.
    pub async fn publish_all(&self, registry: &AttributeRegistry) -> PublishStats {
        let mut stats = PublishStats::default();

        for attribute in registry.iter().filter(|a| self.is_exposed(a.path())) {
            self.record(&mut stats, attribute).await;
        }

        stats
    }

    /// Drain the registry's pending changes and publish them.
    pub async fn publish_changes(&self, registry: &mut AttributeRegistry) -> PublishStats {
        let mut stats = PublishStats::default();

        for path in registry.take_changes() {
            if !self.is_exposed(&path) {
                continue;
            }
            if let Some(attribute) = registry.attribute(&path) {
                self.record(&mut stats, attribute).await;
            }
        }

        stats
    }

    async fn record(&self, stats: &mut PublishStats, attribute: &Attribute) {
        match self.publish_change(attribute).await {
            Ok(()) => stats.success += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(path = %attribute.path(), error = %e, "Failed to publish change");
            }
        }
    }

    /// Publish raw bytes to a key (for status messages, etc.).
    pub async fn publish_raw(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        self.session
            .put(key, payload)
            .await
            .map_err(|e| DeviceError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Publish a JSON value to a key.
    pub async fn publish_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)?;
        self.publish_raw(key, payload).await
    }
}

/// Statistics from a batch publish operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    /// Number of successfully published snapshots.
    pub success: usize,
    /// Number of failed publishes.
    pub failed: usize,
}

impl PublishStats {
    /// Total number of attempted publishes.
    pub fn total(&self) -> usize {
        self.success + self.failed
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            100.0
        } else {
            (self.success as f64 / self.total() as f64) * 100.0
        }
    }
}
