//! Key expression builders and parsers.
//!
//! A device service name such as `com.victronenergy.temperature.pi` maps onto
//! the key prefix `com/victronenergy/temperature/pi`. Attribute paths are
//! appended verbatim:
//!
//! ```text
//! com/victronenergy/temperature/pi/Temperature
//! com/victronenergy/temperature/pi/System/Uptime
//! com/victronenergy/temperature/pi/@/alive
//! com/victronenergy/temperature/pi/@/status
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default key prefix of the settings service.
pub const SETTINGS_KEY_PREFIX: &str = "com/victronenergy/settings";

/// Validated bus service name of the form `<vendor>.<deviceClass>.<subtype>`.
///
/// The vendor part may itself contain dots (`com.victronenergy`); the device
/// class is always the second-to-last segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

impl ServiceName {
    /// Parse and validate a service name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let segments: Vec<&str> = name.split('.').collect();

        if segments.len() < 3 {
            return Err(Error::ServiceName(format!(
                "'{}' must have the form <vendor>.<class>.<subtype>",
                name
            )));
        }

        for segment in &segments {
            if segment.is_empty() {
                return Err(Error::ServiceName(format!("'{}' has an empty segment", name)));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                return Err(Error::ServiceName(format!(
                    "'{}' contains characters not allowed in a key expression",
                    name
                )));
            }
        }

        Ok(Self(name))
    }

    /// The full dotted name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Device class, e.g. `temperature`.
    pub fn device_class(&self) -> &str {
        let mut segments = self.0.rsplit('.');
        segments.next();
        segments.next().unwrap_or_default()
    }

    /// Subtype, e.g. `pi`.
    pub fn subtype(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or_default()
    }

    /// Key prefix for this service (dots become slashes).
    ///
    /// # Example
    /// ```
    /// use zenvenus_common::keyexpr::ServiceName;
    ///
    /// let name = ServiceName::new("com.victronenergy.temperature.pi").unwrap();
    /// assert_eq!(name.key_prefix(), "com/victronenergy/temperature/pi");
    /// ```
    pub fn key_prefix(&self) -> String {
        self.0.replace('.', "/")
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServiceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ServiceName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ServiceName> for String {
    fn from(name: ServiceName) -> Self {
        name.0
    }
}

/// Build the key of an attribute under a service prefix.
///
/// # Example
/// ```
/// use zenvenus_common::keyexpr::attribute_key;
///
/// let key = attribute_key("com/victronenergy/temperature/pi", "/System/Uptime");
/// assert_eq!(key, "com/victronenergy/temperature/pi/System/Uptime");
/// ```
pub fn attribute_key(prefix: &str, path: &str) -> String {
    format!("{}/{}", prefix, path.trim_start_matches('/'))
}

/// Recover the attribute path from a concrete key under `prefix`.
///
/// Returns `None` when the key is outside the prefix or is the prefix itself.
pub fn attribute_path(prefix: &str, key: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(format!("/{}", rest))
    }
}

/// Wildcard matching every attribute of a service.
pub fn service_wildcard(prefix: &str) -> String {
    format!("{}/**", prefix)
}

/// Liveliness key claimed by the live instance of a service.
pub fn alive_key(prefix: &str) -> String {
    format!("{}/@/alive", prefix)
}

/// Key for device status messages.
pub fn status_key(prefix: &str) -> String {
    format!("{}/@/status", prefix)
}
