//! Configuration traits and utilities.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use zenvenus_common::{Format, ServiceName};

use crate::error::{DeviceError, Result};
use crate::{LoggingConfig, ZenohConfig};

/// Trait for device configuration types.
///
/// Implement this trait for a daemon's configuration struct to get loading,
/// validation, and access to the sections every device has.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use zenvenus_device::{DeviceConfig, DeviceSection, LoggingConfig, ZenohConfig};
///
/// #[derive(Debug, Deserialize)]
/// pub struct MyDeviceConfig {
///     pub zenoh: ZenohConfig,
///     pub device: DeviceSection,
///     #[serde(default)]
///     pub logging: LoggingConfig,
/// }
///
/// impl DeviceConfig for MyDeviceConfig {
///     fn zenoh(&self) -> &ZenohConfig { &self.zenoh }
///     fn logging(&self) -> &LoggingConfig { &self.logging }
///     fn device(&self) -> &DeviceSection { &self.device }
/// }
/// ```
pub trait DeviceConfig: Sized + DeserializeOwned {
    /// Get the Zenoh configuration.
    fn zenoh(&self) -> &ZenohConfig;

    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    /// Get the device section.
    fn device(&self) -> &DeviceSection;

    /// Validate the configuration.
    ///
    /// Called automatically after loading. Override to add checks, keeping
    /// the device section validation.
    fn validate(&self) -> Result<()> {
        self.device().validate()
    }

    /// Load configuration from a file path.
    ///
    /// Supports JSON5 format. Calls [`validate`](Self::validate) after loading.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DeviceError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = zenvenus_common::parse_config(&content)
            .map_err(|e| DeviceError::ConfigParse(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

/// Settings shared by all devices.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSection {
    /// Bus service name, e.g. `com.victronenergy.temperature.pi`.
    pub service: ServiceName,

    /// Seconds between sampling ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Encoding of published snapshots and replies.
    #[serde(default)]
    pub format: Format,

    /// How long to wait for an existing owner of the service name.
    #[serde(default = "default_registration_timeout")]
    pub registration_timeout_ms: u64,

    /// Lowest device instance handed out on first start.
    #[serde(default = "default_instance")]
    pub default_instance: u32,

    #[serde(default)]
    pub product_id: i64,

    #[serde(default)]
    pub firmware_version: i64,

    #[serde(default)]
    pub hardware_version: i64,

    /// Overrides the serial read from the hardware.
    #[serde(default)]
    pub serial: Option<String>,

    /// Overrides the product name read from the hardware.
    #[serde(default)]
    pub product_name: Option<String>,
}

fn default_poll_interval() -> u64 {
    1
}

fn default_registration_timeout() -> u64 {
    500
}

fn default_instance() -> u32 {
    2048
}

impl DeviceSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_millis(self.registration_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(DeviceError::validation(
                "device.poll_interval_secs must be greater than 0",
            ));
        }
        if self.registration_timeout_ms == 0 {
            return Err(DeviceError::validation(
                "device.registration_timeout_ms must be greater than 0",
            ));
        }
        if self.serial.as_deref().is_some_and(str::is_empty) {
            return Err(DeviceError::validation("device.serial must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        #[serde(default)]
        zenoh: ZenohConfig,
        device: DeviceSection,
        #[serde(default)]
        logging: LoggingConfig,
    }

    impl DeviceConfig for TestConfig {
        fn zenoh(&self) -> &ZenohConfig {
            &self.zenoh
        }

        fn logging(&self) -> &LoggingConfig {
            &self.logging
        }

        fn device(&self) -> &DeviceSection {
            &self.device
        }
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_not_found() {
        let result = TestConfig::load("/nonexistent/path.json5");
        assert!(matches!(result, Err(DeviceError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_defaults() {
        let file = write_config(r#"{ device: { service: "com.victronenergy.temperature.pi" } }"#);
        let config = TestConfig::load(file.path()).unwrap();

        let device = config.device();
        assert_eq!(device.service.as_str(), "com.victronenergy.temperature.pi");
        assert_eq!(device.poll_interval(), Duration::from_secs(1));
        assert_eq!(device.default_instance, 2048);
        assert_eq!(device.format, Format::Json);
        assert!(device.serial.is_none());
    }

    #[test]
    fn test_malformed_config() {
        let file = write_config("{ device: { service: ");
        assert!(matches!(
            TestConfig::load(file.path()),
            Err(DeviceError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_invalid_service_is_rejected() {
        let file = write_config(r#"{ device: { service: "temperature" } }"#);
        assert!(TestConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let file = write_config(
            r#"{ device: { service: "com.victronenergy.temperature.pi", poll_interval_secs: 0 } }"#,
        );
        assert!(matches!(
            TestConfig::load(file.path()),
            Err(DeviceError::ConfigValidation(_))
        ));
    }
}
