//! Configuration for the Pi device daemon.

use std::path::PathBuf;

use serde::Deserialize;
use zenvenus_common::SETTINGS_KEY_PREFIX;
use zenvenus_device::{
    DeviceConfig, DeviceError, DeviceSection, LoggingConfig, Result, ZenohConfig,
};

/// Complete daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PiDeviceConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Service name, polling and identity settings.
    pub device: DeviceSection,

    /// Where metrics are read from.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Where settable attributes and the device instance are stored.
    #[serde(default)]
    pub settings: SettingsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DeviceConfig for PiDeviceConfig {
    fn zenoh(&self) -> &ZenohConfig {
        &self.zenoh
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn device(&self) -> &DeviceSection {
        &self.device
    }

    fn validate(&self) -> Result<()> {
        self.device.validate()?;

        match &self.settings {
            SettingsConfig::Bus { key_prefix, timeout_ms } => {
                if key_prefix.is_empty() || key_prefix.contains('*') {
                    return Err(DeviceError::validation(
                        "settings.key_prefix must be a non-empty key without wildcards",
                    ));
                }
                if *timeout_ms == 0 {
                    return Err(DeviceError::validation(
                        "settings.timeout_ms must be greater than 0",
                    ));
                }
            }
            SettingsConfig::File { path } if path.as_os_str().is_empty() => {
                return Err(DeviceError::validation("settings.path must not be empty"));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Metric source locations.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Thermal zone reporting millidegrees.
    #[serde(default = "default_thermal_zone")]
    pub thermal_zone: PathBuf,

    /// cpuinfo file carrying the hardware serial.
    #[serde(default = "default_cpuinfo")]
    pub cpuinfo: PathBuf,

    /// Device-tree model string.
    #[serde(default = "default_model")]
    pub model: PathBuf,

    /// Value published on `/TemperatureType`.
    #[serde(default = "default_temperature_type")]
    pub temperature_type: i64,
}

fn default_thermal_zone() -> PathBuf {
    PathBuf::from("/sys/devices/virtual/thermal/thermal_zone0/temp")
}

fn default_cpuinfo() -> PathBuf {
    PathBuf::from("/proc/cpuinfo")
}

fn default_model() -> PathBuf {
    PathBuf::from("/sys/firmware/devicetree/base/model")
}

fn default_temperature_type() -> i64 {
    2
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            thermal_zone: default_thermal_zone(),
            cpuinfo: default_cpuinfo(),
            model: default_model(),
            temperature_type: default_temperature_type(),
        }
    }
}

/// Settings backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum SettingsConfig {
    /// Settings service on the bus.
    Bus {
        #[serde(default = "default_settings_prefix")]
        key_prefix: String,
        #[serde(default = "default_settings_timeout")]
        timeout_ms: u64,
    },
    /// JSON file on local storage.
    File { path: PathBuf },
    /// Process memory; nothing survives a restart.
    Memory,
}

fn default_settings_prefix() -> String {
    SETTINGS_KEY_PREFIX.to_string()
}

fn default_settings_timeout() -> u64 {
    1000
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self::Bus {
            key_prefix: default_settings_prefix(),
            timeout_ms: default_settings_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zenvenus_common::BusKind;

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            device: { service: "com.victronenergy.temperature.pi" }
        }"#;

        let config: PiDeviceConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.zenoh.bus, BusKind::Auto);
        assert_eq!(config.device.poll_interval_secs, 1);
        assert_eq!(config.device.default_instance, 2048);
        assert_eq!(config.sources.temperature_type, 2);
        assert_eq!(
            config.sources.thermal_zone,
            PathBuf::from("/sys/devices/virtual/thermal/thermal_zone0/temp")
        );
        assert_eq!(
            config.settings,
            SettingsConfig::Bus {
                key_prefix: SETTINGS_KEY_PREFIX.to_string(),
                timeout_ms: 1000,
            }
        );
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            zenoh: { bus: "session", listen: ["tcp/0.0.0.0:7448"] },
            device: {
                service: "com.victronenergy.temperature.pi",
                poll_interval_secs: 2,
                format: "cbor",
                serial: "override01",
                product_name: "Bench Pi",
            },
            sources: { thermal_zone: "/tmp/temp", temperature_type: 0 },
            settings: { backend: "file", path: "/var/lib/zenvenus/settings.json" },
            logging: { level: "debug", format: "json" },
        }"#;

        let config: PiDeviceConfig = json5::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.zenoh.bus, BusKind::Session);
        assert_eq!(config.device.serial.as_deref(), Some("override01"));
        assert_eq!(config.sources.thermal_zone, PathBuf::from("/tmp/temp"));
        assert_eq!(config.sources.cpuinfo, PathBuf::from("/proc/cpuinfo"));
        assert_eq!(
            config.settings,
            SettingsConfig::File {
                path: PathBuf::from("/var/lib/zenvenus/settings.json")
            }
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_shipped_config() {
        let config: PiDeviceConfig =
            json5::from_str(include_str!("../pi-device.json5")).unwrap();
        config.validate().unwrap();

        assert_eq!(
            config.device.service.key_prefix(),
            "com/victronenergy/temperature/pi"
        );
        assert_eq!(config.settings, SettingsConfig::default());
    }

    #[test]
    fn test_memory_backend() {
        let json = r#"{
            device: { service: "com.victronenergy.temperature.pi" },
            settings: { backend: "memory" },
        }"#;

        let config: PiDeviceConfig = json5::from_str(json).unwrap();
        assert_eq!(config.settings, SettingsConfig::Memory);
    }

    #[test]
    fn test_validate_bus_prefix() {
        let json = r#"{
            device: { service: "com.victronenergy.temperature.pi" },
            settings: { backend: "bus", key_prefix: "com/**" },
        }"#;

        let config: PiDeviceConfig = json5::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(DeviceError::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_validate_zero_interval() {
        let json = r#"{
            device: { service: "com.victronenergy.temperature.pi", poll_interval_secs: 0 }
        }"#;

        let config: PiDeviceConfig = json5::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }
}
