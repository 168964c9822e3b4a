//! Settings collaborator.
//!
//! Settable attributes and the device instance are stored by an external
//! settings service that survives restarts. [`Settings`] is the seam; three
//! backends implement it:
//!
//! - [`BusSettings`] talks to a settings service on the Zenoh bus
//! - [`FileSettings`] keeps a JSON file on local storage
//! - [`MemorySettings`] keeps everything in process memory
//!
//! Setting paths follow the `/Settings/Devices/<unique_key>/...` layout.

mod bus;
mod file;

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Mutex;

use zenvenus_common::Value;

use crate::error::{DeviceError, Result};

pub use bus::BusSettings;
pub use file::FileSettings;

const DEVICES_PREFIX: &str = "/Settings/Devices/";
const INSTANCE_SUFFIX: &str = "/ClassAndVrmInstance";

/// Durable key/value settings store.
pub trait Settings: Send + Sync {
    /// Load a setting, falling back to `default` when nothing is stored.
    fn load_setting(
        &self,
        path: &str,
        default: Option<Value>,
    ) -> impl Future<Output = Result<Option<Value>>> + Send;

    /// Persist a setting. Returns only once the value is stored.
    fn save_setting(&self, path: &str, value: &Value) -> impl Future<Output = Result<()>> + Send;

    /// All stored device instance claims as `(setting path, "class:instance")`.
    fn instance_claims(&self) -> impl Future<Output = Result<Vec<(String, String)>>> + Send;
}

/// Setting path holding a device's `class:instance` claim.
pub fn instance_setting_path(unique_key: &str) -> String {
    format!("{}{}{}", DEVICES_PREFIX, unique_key, INSTANCE_SUFFIX)
}

/// Setting path backing a settable attribute of a device.
///
/// # Example
/// ```
/// use zenvenus_device::settings::device_setting_path;
///
/// assert_eq!(
///     device_setting_path("cpu_10000000abcdef", "/CustomName"),
///     "/Settings/Devices/cpu_10000000abcdef/CustomName"
/// );
/// ```
pub fn device_setting_path(unique_key: &str, attribute_path: &str) -> String {
    format!(
        "{}{}/{}",
        DEVICES_PREFIX,
        unique_key,
        attribute_path.trim_start_matches('/')
    )
}

/// Whether a setting path is a device instance claim.
pub fn is_instance_setting(path: &str) -> bool {
    path.starts_with(DEVICES_PREFIX) && path.ends_with(INSTANCE_SUFFIX)
}

/// Split a `class:instance` claim.
pub fn parse_class_instance(claim: &str) -> Option<(&str, u32)> {
    let (class, instance) = claim.split_once(':')?;
    let instance = instance.trim().parse().ok()?;
    Some((class.trim(), instance))
}

/// Get the device instance for `unique_key`, allocating one on first use.
///
/// A stored claim of the same class is returned as is, so the same key
/// yields the same instance across restarts. Otherwise the lowest instance at
/// or above `preferred` that no other device of the class claims is stored
/// and returned.
pub async fn get_or_create_instance_id<S: Settings>(
    settings: &S,
    device_class: &str,
    unique_key: &str,
    preferred: u32,
) -> Result<u32> {
    let path = instance_setting_path(unique_key);

    if let Some(stored) = settings.load_setting(&path, None).await? {
        match stored.as_str().and_then(parse_class_instance) {
            Some((class, instance)) if class == device_class => {
                tracing::debug!(%path, instance, "Reusing stored device instance");
                return Ok(instance);
            }
            _ => {
                tracing::warn!(%path, stored = %stored, "Ignoring stored instance of another class");
            }
        }
    }

    let taken: BTreeSet<u32> = settings
        .instance_claims()
        .await?
        .iter()
        .filter(|(claim_path, _)| *claim_path != path)
        .filter_map(|(_, claim)| parse_class_instance(claim))
        .filter(|(class, _)| *class == device_class)
        .map(|(_, instance)| instance)
        .collect();

    let instance = (preferred..=u32::MAX)
        .find(|candidate| !taken.contains(candidate))
        .ok_or_else(|| DeviceError::settings(format!("no free {} instance", device_class)))?;

    settings
        .save_setting(&path, &Value::Text(format!("{}:{}", device_class, instance)))
        .await?;

    tracing::info!(%path, instance, "Allocated device instance");

    Ok(instance)
}

/// Process-local settings, lost on exit.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently stored value, without default handling.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.lock().ok()?.get(path).cloned()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| DeviceError::settings("settings store poisoned"))
    }
}

impl Settings for MemorySettings {
    async fn load_setting(&self, path: &str, default: Option<Value>) -> Result<Option<Value>> {
        Ok(self.lock()?.get(path).cloned().or(default))
    }

    async fn save_setting(&self, path: &str, value: &Value) -> Result<()> {
        self.lock()?.insert(path.to_string(), value.clone());
        Ok(())
    }

    async fn instance_claims(&self) -> Result<Vec<(String, String)>> {
        Ok(claims_from(self.lock()?.iter()))
    }
}

pub(crate) fn claims_from<'a>(
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Vec<(String, String)> {
    entries
        .filter(|(path, _)| is_instance_setting(path))
        .filter_map(|(path, value)| Some((path.clone(), value.as_str()?.to_string())))
        .collect()
}
