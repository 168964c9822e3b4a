//! JSON file backend for hosts without a settings service.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zenvenus_common::Value;

use super::{Settings, claims_from};
use crate::error::{DeviceError, Result};

/// Settings persisted as a JSON object of `path -> value`.
///
/// Every save rewrites the file through a temporary sibling and a rename, so
/// a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl FileSettings {
    /// Open the store, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                DeviceError::settings(format!("corrupt settings file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(DeviceError::with_context(
                    format!("reading settings file {}", path.display()),
                    e,
                ));
            }
        };

        tracing::debug!(path = %path.display(), entries = values.len(), "Opened settings file");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let content = serde_json::to_vec_pretty(values)?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| DeviceError::settings("settings store poisoned"))
    }
}

impl Settings for FileSettings {
    async fn load_setting(&self, path: &str, default: Option<Value>) -> Result<Option<Value>> {
        Ok(self.lock()?.get(path).cloned().or(default))
    }

    async fn save_setting(&self, path: &str, value: &Value) -> Result<()> {
        let mut values = self.lock()?;
        let previous = values.insert(path.to_string(), value.clone());

        if let Err(e) = self.persist(&values) {
            // Keep memory in line with the file.
            match previous {
                Some(previous) => values.insert(path.to_string(), previous),
                None => values.remove(path),
            };
            return Err(DeviceError::settings(format!(
                "failed to write {}: {}",
                self.path.display(),
                e
            )));
        }

        Ok(())
    }

    async fn instance_claims(&self) -> Result<Vec<(String, String)>> {
        Ok(claims_from(self.lock()?.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::get_or_create_instance_id;

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let settings = FileSettings::open(&path).unwrap();
            settings
                .save_setting("/Settings/Devices/cpu_1/CustomName", &Value::from("Loft"))
                .await
                .unwrap();
        }

        let settings = FileSettings::open(&path).unwrap();
        let value = settings
            .load_setting("/Settings/Devices/cpu_1/CustomName", None)
            .await
            .unwrap();
        assert_eq!(value, Some(Value::from("Loft")));
    }

    #[tokio::test]
    async fn test_instance_stable_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let first = {
            let settings = FileSettings::open(&path).unwrap();
            get_or_create_instance_id(&settings, "temperature", "cpu_1", 2048)
                .await
                .unwrap()
        };

        let settings = FileSettings::open(&path).unwrap();
        let second = get_or_create_instance_id(&settings, "temperature", "cpu_1", 3000)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            FileSettings::open(&path),
            Err(DeviceError::Settings(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // The store path is a non-empty directory, so the final rename fails.
        let path = dir.path().join("store");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        // Opening would fail on a directory, so build the store directly.
        let broken = FileSettings {
            path: path.clone(),
            values: Mutex::new(BTreeMap::new()),
        };
        assert_eq!(broken.path(), path.as_path());

        let result = broken
            .save_setting("/Settings/Devices/cpu_1/CustomName", &Value::from("x"))
            .await;
        assert!(matches!(result, Err(DeviceError::Settings(_))));
        assert_eq!(
            broken
                .load_setting("/Settings/Devices/cpu_1/CustomName", None)
                .await
                .unwrap(),
            None
        );
    }
}
