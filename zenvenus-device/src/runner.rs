//! Device runner for lifecycle management.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;

use zenvenus_common::{LoggingConfig, connect, init_tracing};

use crate::DeviceArgs;
use crate::config::DeviceConfig;
use crate::error::{DeviceError, Result};
use crate::identity::DeviceIdentity;
use crate::publisher::DevicePublisher;
use crate::sampling::Sampler;
use crate::service::DeviceService;
use crate::settings::Settings;
use crate::status::StatusPublisher;

/// Runs a device from startup to shutdown.
///
/// Handles:
/// - Logging initialization
/// - Zenoh connection
/// - Registration and schema setup
/// - Graceful shutdown on Ctrl+C
/// - Status publishing
///
/// # Example
///
/// ```ignore
/// let args = DeviceArgs::parse_with_default("pi-device.json5");
/// let config = PiDeviceConfig::load(&args.config)?;
///
/// let runner = DeviceRunner::new_with_args("zenvenus-pi", config, Some(&args)).await?;
/// let settings = MemorySettings::new();
/// let identity = /* instance id from settings, serial from hardware */;
///
/// runner.serve(identity, sampler, settings).await?;
/// ```
pub struct DeviceRunner<C: DeviceConfig> {
    /// Process name for logging, status and `/Mgmt/ProcessName`.
    name: String,
    /// Process version.
    version: String,
    /// The loaded configuration.
    config: C,
    /// Zenoh session.
    session: Arc<zenoh::Session>,
}

impl<C: DeviceConfig> DeviceRunner<C> {
    /// Initialize logging and connect to the bus.
    pub async fn new(name: impl Into<String>, config: C) -> Result<Self> {
        Self::new_with_args(name, config, None).await
    }

    /// Like [`new`](Self::new), honouring a CLI log level override.
    pub async fn new_with_args(
        name: impl Into<String>,
        config: C,
        args: Option<&DeviceArgs>,
    ) -> Result<Self> {
        let name = name.into();
        let version = env!("CARGO_PKG_VERSION").to_string();

        let log_config = match args.and_then(|a| a.log_level.as_ref()) {
            Some(level) => LoggingConfig {
                level: level.clone(),
                ..config.logging().clone()
            },
            None => config.logging().clone(),
        };

        init_tracing(&log_config).map_err(|e| DeviceError::config(e.to_string()))?;

        tracing::info!(process = %name, version = %version, "Starting device");

        let session = Self::open_session(&config).await?;

        Ok(Self {
            name,
            version,
            config,
            session,
        })
    }

    /// Connect to the bus without touching the global tracing subscriber.
    ///
    /// For embedding the runner where logging is already set up, e.g. tests.
    pub async fn connect(name: impl Into<String>, config: C) -> Result<Self> {
        let session = Self::open_session(&config).await?;
        Ok(Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            session,
        })
    }

    async fn open_session(config: &C) -> Result<Arc<zenoh::Session>> {
        let session = connect(config.zenoh())
            .await
            .map_err(|e| DeviceError::registration(format!("bus unavailable: {}", e)))?;

        tracing::info!(zid = %session.zid(), "Connected to Zenoh");
        Ok(Arc::new(session))
    }

    /// Get the process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the process version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Get a reference to the Zenoh session.
    pub fn session(&self) -> &Arc<zenoh::Session> {
        &self.session
    }

    /// Serve the device until Ctrl+C is received.
    pub async fn serve<M, S>(self, identity: DeviceIdentity, sampler: M, settings: S) -> Result<()>
    where
        M: Sampler,
        S: Settings,
    {
        let shutdown = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        };

        self.serve_until(identity, sampler, settings, shutdown).await
    }

    /// Serve the device until `shutdown` completes.
    ///
    /// This will:
    /// 1. Register the service name on the bus
    /// 2. Declare the schema and load persisted settings
    /// 3. Publish "running" status and the initial snapshot
    /// 4. Sample and answer queries until shutdown
    /// 5. Publish "offline" status and close the Zenoh session
    pub async fn serve_until<M, S, F>(
        self,
        identity: DeviceIdentity,
        sampler: M,
        settings: S,
        shutdown: F,
    ) -> Result<()>
    where
        M: Sampler,
        S: Settings,
        F: Future<Output = ()>,
    {
        let device = self.config.device();

        let publisher = DevicePublisher::register(
            self.session.clone(),
            &identity,
            device.format,
            device.registration_timeout(),
        )
        .await?;

        let status = StatusPublisher::new(identity.service.as_str(), &self.version);

        let mut service = match DeviceService::setup(
            publisher,
            &identity,
            sampler,
            settings,
            device.poll_interval(),
        )
        .await
        {
            Ok(service) => service,
            Err(e) => {
                self.close().await;
                return Err(e);
            }
        };

        let metadata = serde_json::json!({
            "device_instance": identity.device_instance,
            "serial": identity.serial,
            "poll_interval_secs": device.poll_interval_secs,
        });
        if let Err(e) = status.publish_running(service.publisher(), Some(metadata)).await {
            tracing::warn!(error = %e, "Failed to publish running status");
        }

        tracing::info!(
            service = %identity.service,
            instance = identity.device_instance,
            "Device running. Press Ctrl+C to stop."
        );

        let outcome = service.run(shutdown).await;

        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Device service failed");
            if let Err(e) = status.publish_error(service.publisher(), e.to_string()).await {
                tracing::warn!(error = %e, "Failed to publish error status");
            }
        }

        if let Err(e) = status.publish_offline(service.publisher()).await {
            tracing::warn!(error = %e, "Failed to publish offline status");
        }

        // Releases the liveliness token before the session goes away.
        drop(service.into_publisher());
        self.close().await;

        tracing::info!(process = %self.name, "Goodbye!");

        outcome
    }

    async fn close(&self) {
        if let Err(e) = self.session.close().await {
            tracing::warn!(error = %e, "Error closing Zenoh session");
        }
    }
}
