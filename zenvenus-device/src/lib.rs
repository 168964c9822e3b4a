//! zenvenus Device Framework
//!
//! Building blocks for daemons that publish a device object on the Zenoh bus.
//!
//! # Overview
//!
//! This framework provides:
//! - [`AttributeRegistry`] holding the typed attributes of a device
//! - [`DevicePublisher`] for registration, remote reads/writes and change notifications
//! - [`Settings`] backends persisting settable attributes and the device instance
//! - [`SamplingLoop`] and the [`Sampler`] trait for periodic refresh
//! - [`DeviceService`] multiplexing ticks and queries on one task
//! - [`DeviceRunner`] for the process lifecycle (startup, shutdown, signal handling)
//! - [`DeviceArgs`] and [`DeviceConfig`] for CLI and configuration loading
//!
//! # Example
//!
//! ```ignore
//! use zenvenus_device::{DeviceArgs, DeviceConfig, DeviceRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = DeviceArgs::parse_with_default("mydevice.json5");
//!     let config = MyDeviceConfig::load(&args.config)?;
//!
//!     let runner = DeviceRunner::new_with_args("mydevice", config, Some(&args)).await?;
//!     runner.serve(identity, MySampler::new(), MemorySettings::new()).await?;
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod error;
pub mod format;
mod identity;
mod publisher;
pub mod registry;
mod runner;
pub mod sampling;
mod service;
pub mod settings;
mod status;

pub use args::DeviceArgs;
pub use config::{DeviceConfig, DeviceSection};
pub use error::{DeviceError, Result};
pub use format::TextFormat;
pub use identity::{CONNECTION, DeviceIdentity};
pub use publisher::{DevicePublisher, DeviceQueryable, PublishStats};
pub use registry::{Access, Attribute, AttributeRegistry};
pub use runner::DeviceRunner;
pub use sampling::{LoopState, Sampler, SamplingLoop, TickReport};
pub use service::DeviceService;
pub use settings::{
    BusSettings, FileSettings, MemorySettings, Settings, device_setting_path,
    get_or_create_instance_id,
};
pub use status::{DeviceStatus, StatusPublisher};

// Re-export commonly used types from zenvenus-common
pub use zenvenus_common::{
    AttributeSnapshot, Format, LoggingConfig, ServiceName, Value, ValueKind, ZenohConfig,
};
