//! Zenoh device daemon for Raspberry Pi boards.
//!
//! Samples the CPU temperature, available memory and uptime and publishes
//! them as typed device attributes.

use std::time::Duration;

use anyhow::Result;
use zenvenus_device::{
    BusSettings, DeviceArgs, DeviceConfig, DeviceError, DeviceIdentity, DeviceRunner,
    FileSettings, MemorySettings, Settings, Value, get_or_create_instance_id,
};

use zenvenus_pi::config::{PiDeviceConfig, SettingsConfig};
use zenvenus_pi::sampler::PiSampler;
use zenvenus_pi::source::{SystemSource, read_model, read_serial};

const PROCESS_NAME: &str = env!("CARGO_PKG_NAME");
const FALLBACK_PRODUCT_NAME: &str = "Raspberry Pi";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = DeviceArgs::parse_with_default("pi-device.json5");

    // Load configuration using the framework's DeviceConfig trait
    let config = PiDeviceConfig::load(&args.config).map_err(|e| anyhow::anyhow!("{}", e))?;

    // Initialize logging and connect to the bus
    let runner = DeviceRunner::new_with_args(PROCESS_NAME, config, Some(&args))
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let outcome = match runner.config().settings.clone() {
        SettingsConfig::Bus {
            key_prefix,
            timeout_ms,
        } => {
            let settings = BusSettings::new(
                runner.session().clone(),
                key_prefix,
                Duration::from_millis(timeout_ms),
            )
            .with_format(runner.config().device.format);
            serve(runner, settings).await
        }
        SettingsConfig::File { path } => match FileSettings::open(&path) {
            Ok(settings) => serve(runner, settings).await,
            Err(e) => Err(e),
        },
        SettingsConfig::Memory => {
            tracing::warn!("Using in-memory settings; CustomName and instance reset on restart");
            serve(runner, MemorySettings::new()).await
        }
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, "Device failed");
        return Err(anyhow::anyhow!("{}", e));
    }

    Ok(())
}

/// Resolve the identity and serve until shutdown.
async fn serve<S: Settings>(
    runner: DeviceRunner<PiDeviceConfig>,
    settings: S,
) -> zenvenus_device::Result<()> {
    let config = runner.config();
    let device = config.device();

    let serial = match &device.serial {
        Some(serial) => serial.clone(),
        None => read_serial(&config.sources.cpuinfo)
            .map_err(|e| DeviceError::with_context("reading hardware serial", e))?,
    };

    let product_name = match &device.product_name {
        Some(name) => name.clone(),
        None => read_model(&config.sources.model).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Board model unavailable");
            FALLBACK_PRODUCT_NAME.to_string()
        }),
    };

    let unique_key = format!("cpu_{}", serial);
    let device_instance = get_or_create_instance_id(
        &settings,
        device.service.device_class(),
        &unique_key,
        device.default_instance,
    )
    .await?;

    let mut identity = DeviceIdentity::new(
        device.service.clone(),
        serial,
        device_instance,
        product_name,
    )
    .with_process(PROCESS_NAME, runner.version());
    identity.product_id = device.product_id;
    identity.firmware_version = Value::Int(device.firmware_version);
    identity.hardware_version = Value::Int(device.hardware_version);

    tracing::info!(
        service = %identity.service,
        serial = %identity.serial,
        product = %identity.product_name,
        instance = device_instance,
        "Resolved device identity"
    );

    let sampler = PiSampler::new(
        SystemSource::new(&config.sources),
        unique_key,
        config.sources.temperature_type,
    );

    runner.serve(identity, sampler, settings).await
}
