//! Device identity.

use zenvenus_common::{ServiceName, Value, ValueKind};

use crate::error::Result;
use crate::registry::{Attribute, AttributeRegistry};

/// Connection description reported on `/Mgmt/Connection`.
pub const CONNECTION: &str = "zenoh";

/// Immutable description of a device, fixed at startup.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub service: ServiceName,
    pub serial: String,
    pub device_instance: u32,
    pub product_id: i64,
    pub product_name: String,
    pub firmware_version: Value,
    pub hardware_version: Value,
    pub connected: bool,
    pub process_name: String,
    pub process_version: String,
    pub connection: String,
}

impl DeviceIdentity {
    /// Identity with connected set and the zenoh connection description.
    pub fn new(
        service: ServiceName,
        serial: impl Into<String>,
        device_instance: u32,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            service,
            serial: serial.into(),
            device_instance,
            product_id: 0,
            product_name: product_name.into(),
            firmware_version: Value::Int(0),
            hardware_version: Value::Int(0),
            connected: true,
            process_name: String::new(),
            process_version: String::new(),
            connection: CONNECTION.to_string(),
        }
    }

    /// Set the process name and version reported under `/Mgmt`.
    pub fn with_process(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.process_name = name.into();
        self.process_version = version.into();
        self
    }

    /// Device class, e.g. `temperature`.
    pub fn device_class(&self) -> &str {
        self.service.device_class()
    }

    /// Key expression prefix of the service.
    pub fn key_prefix(&self) -> String {
        self.service.key_prefix()
    }

    /// Declare the mandatory identity paths as read-only attributes.
    pub fn declare_into(&self, registry: &mut AttributeRegistry) -> Result<()> {
        let attributes = [
            Attribute::new("/Mgmt/ProcessName", ValueKind::Text)
                .with_value(self.process_name.as_str()),
            Attribute::new("/Mgmt/ProcessVersion", ValueKind::Text)
                .with_value(self.process_version.as_str()),
            Attribute::new("/Mgmt/Connection", ValueKind::Text)
                .with_value(self.connection.as_str()),
            Attribute::new("/DeviceInstance", ValueKind::Int).with_value(self.device_instance),
            Attribute::new("/ProductId", ValueKind::Int).with_value(self.product_id),
            Attribute::new("/ProductName", ValueKind::Text)
                .with_value(self.product_name.as_str()),
            Attribute::new("/FirmwareVersion", self.firmware_version.kind())
                .with_value(self.firmware_version.clone()),
            Attribute::new("/HardwareVersion", self.hardware_version.kind())
                .with_value(self.hardware_version.clone()),
            Attribute::new("/Connected", ValueKind::Int).with_value(self.connected),
            Attribute::new("/Serial", ValueKind::Text).with_value(self.serial.as_str()),
        ];

        for attribute in attributes {
            registry.declare(attribute)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        let service = ServiceName::new("com.victronenergy.temperature.pi").unwrap();
        DeviceIdentity::new(service, "10000000abcdef", 2048, "Raspberry Pi 4 Model B")
            .with_process("zenvenus-pi", "0.2.0")
    }

    #[test]
    fn test_identity_paths() {
        let mut registry = AttributeRegistry::new();
        identity().declare_into(&mut registry).unwrap();

        assert_eq!(registry.len(), 10);
        assert_eq!(
            registry.get("/DeviceInstance").unwrap(),
            Some(&Value::Int(2048))
        );
        assert_eq!(registry.get("/Connected").unwrap(), Some(&Value::Int(1)));
        assert_eq!(
            registry.get("/Mgmt/Connection").unwrap(),
            Some(&Value::from("zenoh"))
        );
        assert_eq!(
            registry.get("/Serial").unwrap(),
            Some(&Value::from("10000000abcdef"))
        );
        assert!(registry.iter().all(|attr| !attr.is_writable()));
    }

    #[test]
    fn test_device_class_from_service() {
        let identity = identity();
        assert_eq!(identity.device_class(), "temperature");
        assert_eq!(identity.key_prefix(), "com/victronenergy/temperature/pi");
    }

    #[test]
    fn test_declare_twice_fails() {
        let mut registry = AttributeRegistry::new();
        identity().declare_into(&mut registry).unwrap();
        assert!(identity().declare_into(&mut registry).is_err());
    }
}
