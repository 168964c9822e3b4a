//! Device service event loop.
//!
//! One task owns the registry, the sampler, the settings handle and the
//! publisher. Sampling ticks and remote queries are multiplexed with
//! `tokio::select!`, so they never run concurrently and no locking is needed.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use zenoh::query::Query;

use crate::error::Result;
use crate::identity::DeviceIdentity;
use crate::publisher::{DevicePublisher, PublishStats};
use crate::registry::AttributeRegistry;
use crate::sampling::{Sampler, SamplingLoop, TickReport};
use crate::settings::Settings;

/// A registered device ready to serve.
pub struct DeviceService<M, S> {
    registry: AttributeRegistry,
    sampling: SamplingLoop<M>,
    publisher: DevicePublisher,
    settings: S,
    poll_interval: Duration,
}

impl<M: Sampler, S: Settings> DeviceService<M, S> {
    /// Declare the identity and sampler attributes, load persisted settings
    /// and expose everything on the bus.
    pub async fn setup(
        mut publisher: DevicePublisher,
        identity: &DeviceIdentity,
        sampler: M,
        settings: S,
        poll_interval: Duration,
    ) -> Result<Self> {
        let mut registry = AttributeRegistry::new();
        identity.declare_into(&mut registry)?;

        let mut sampling = SamplingLoop::new(sampler);
        sampling.declare(&mut registry)?;

        let loaded = registry.load_settings(&settings).await?;
        publisher.expose_all(&registry);

        // The initial publish covers everything loaded so far.
        registry.take_changes();

        tracing::info!(
            attributes = registry.len(),
            settings = loaded,
            "Device schema declared"
        );

        Ok(Self {
            registry,
            sampling,
            publisher,
            settings,
            poll_interval,
        })
    }

    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    pub fn publisher(&self) -> &DevicePublisher {
        &self.publisher
    }

    pub fn sampling(&self) -> &SamplingLoop<M> {
        &self.sampling
    }

    /// Give back the publisher, e.g. to report an offline status.
    pub fn into_publisher(self) -> DevicePublisher {
        self.publisher
    }

    /// Sample once and publish what changed.
    pub async fn tick(&mut self) -> TickReport {
        let report = self.sampling.tick(&mut self.registry);
        self.flush().await;
        report
    }

    /// Answer one remote query and publish what it changed.
    pub async fn handle_query(&mut self, query: &Query) {
        if let Err(e) = self
            .publisher
            .answer(query, &mut self.registry, &self.settings)
            .await
        {
            tracing::warn!(key = %query.key_expr(), error = %e, "Failed to answer query");
        }
        self.flush().await;
    }

    async fn flush(&mut self) -> PublishStats {
        let stats = self.publisher.publish_changes(&mut self.registry).await;
        if stats.failed > 0 {
            tracing::warn!(
                published = stats.success,
                failed = stats.failed,
                "Some changes were not published"
            );
        }
        stats
    }

    /// Serve until `shutdown` completes or the queryable closes.
    ///
    /// Ticks run every `poll_interval`; a tick that overruns delays the
    /// following ones instead of bursting.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let queryable = self.publisher.declare_queryable().await?;

        let initial = self.publisher.publish_all(&self.registry).await;
        tracing::info!(
            published = initial.success,
            failed = initial.failed,
            "Published initial snapshot"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::debug!("Device service stopping");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.tick().await;
                    if !report.is_clean() {
                        tracing::debug!(failed = report.failed, "Tick completed with failed reads");
                    }
                }
                query = queryable.recv_async() => match query {
                    Ok(query) => self.handle_query(&query).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "Queryable closed");
                        break;
                    }
                },
            }
        }

        tracing::info!(
            ticks = self.sampling.ticks(),
            failed_reads = self.sampling.failures(),
            "Device service stopped"
        );

        Ok(())
    }
}
