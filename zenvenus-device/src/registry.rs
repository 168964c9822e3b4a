//! Attribute registry.
//!
//! The registry owns the schema and the current value of every attribute a
//! device publishes. Each successful change is queued until the publisher
//! drains it with [`AttributeRegistry::take_changes`].

use std::collections::{BTreeMap, BTreeSet};

use zenvenus_common::{AttributeSnapshot, Value, ValueKind};

use crate::error::{DeviceError, Result};
use crate::format::TextFormat;
use crate::settings::Settings;

/// Who may change an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Only the device itself updates the value.
    ReadOnly,
    /// Remote callers may write; the value is not persisted.
    Writable,
    /// Remote callers may write; the value is mirrored to `setting`.
    Settable { setting: String },
}

/// One named, typed slot of device state.
#[derive(Debug, Clone)]
pub struct Attribute {
    path: String,
    kind: ValueKind,
    value: Option<Value>,
    access: Access,
    format: TextFormat,
}

impl Attribute {
    /// A read-only, unset attribute with plain formatting.
    pub fn new(path: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            path: path.into(),
            kind,
            value: None,
            access: Access::ReadOnly,
            format: TextFormat::Plain,
        }
    }

    /// Set the initial value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Allow remote writes.
    pub fn writable(mut self) -> Self {
        self.access = Access::Writable;
        self
    }

    /// Allow remote writes and persist them under `setting`.
    pub fn settable(mut self, setting: impl Into<String>) -> Self {
        self.access = Access::Settable {
            setting: setting.into(),
        };
        self
    }

    /// Choose the display formatter.
    pub fn formatted(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self.access, Access::ReadOnly)
    }

    /// Settings path backing this attribute, if it is settable.
    pub fn setting(&self) -> Option<&str> {
        match &self.access {
            Access::Settable { setting } => Some(setting),
            _ => None,
        }
    }

    /// Display text of the current value.
    pub fn text(&self) -> String {
        self.format.render(self.value.as_ref())
    }

    /// Wire form of the current state.
    pub fn snapshot(&self) -> AttributeSnapshot {
        AttributeSnapshot::new(&self.path, self.value.clone(), self.text())
    }

    fn coerce(&self, value: Value) -> Result<Value> {
        let actual = value.kind();
        value
            .coerce(self.kind)
            .ok_or_else(|| DeviceError::TypeMismatch {
                path: self.path.clone(),
                expected: self.kind,
                actual,
            })
    }
}

/// Table of all attributes of a device.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    attributes: BTreeMap<String, Attribute>,
    changes: Vec<String>,
    pending: BTreeSet<String>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute.
    ///
    /// Fails on a duplicate path, a path without a leading `/`, or an initial
    /// value that does not fit the declared kind.
    pub fn declare(&mut self, mut attribute: Attribute) -> Result<()> {
        if !attribute.path.starts_with('/') {
            return Err(DeviceError::InvalidPath(attribute.path));
        }
        if self.attributes.contains_key(&attribute.path) {
            return Err(DeviceError::DuplicatePath(attribute.path));
        }
        if let Some(value) = attribute.value.take() {
            attribute.value = Some(attribute.coerce(value)?);
        }

        tracing::trace!(path = %attribute.path, kind = %attribute.kind, "Declared attribute");
        self.attributes.insert(attribute.path.clone(), attribute);
        Ok(())
    }

    /// Current value of a declared attribute, `None` while unset.
    pub fn get(&self, path: &str) -> Result<Option<&Value>> {
        self.attributes
            .get(path)
            .map(Attribute::value)
            .ok_or_else(|| DeviceError::UnknownPath(path.to_string()))
    }

    /// Look up an attribute.
    pub fn attribute(&self, path: &str) -> Option<&Attribute> {
        self.attributes.get(path)
    }

    /// Whether `path` is declared.
    pub fn contains(&self, path: &str) -> bool {
        self.attributes.contains_key(path)
    }

    /// Iterate attributes in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Local update from the device itself.
    ///
    /// Returns `true` if the stored value changed; a change is queued for
    /// publication.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<bool> {
        let attribute = self
            .attributes
            .get_mut(path)
            .ok_or_else(|| DeviceError::UnknownPath(path.to_string()))?;

        let value = attribute.coerce(value.into())?;
        if attribute.value.as_ref() == Some(&value) {
            return Ok(false);
        }

        attribute.value = Some(value);
        self.record_change(path);
        Ok(true)
    }

    /// Remote update from a bus caller.
    ///
    /// Rejects unknown and read-only paths. Settable attributes are saved
    /// through `settings` first; the local value only changes if the save
    /// succeeded.
    pub async fn write<S: Settings>(
        &mut self,
        path: &str,
        value: Value,
        settings: &S,
    ) -> Result<bool> {
        let attribute = self
            .attributes
            .get(path)
            .ok_or_else(|| DeviceError::UnknownPath(path.to_string()))?;

        if !attribute.is_writable() {
            return Err(DeviceError::ReadOnly(path.to_string()));
        }

        let value = attribute.coerce(value)?;

        if let Some(setting) = attribute.setting() {
            settings.save_setting(setting, &value).await?;
            tracing::debug!(%path, %setting, "Persisted setting");
        }

        self.set(path, value)
    }

    /// Load every settable attribute from the settings store.
    ///
    /// The declared value is the default for settings never stored, and it is
    /// kept when the stored value does not fit the attribute's kind. Returns
    /// the number of attributes loaded.
    pub async fn load_settings<S: Settings>(&mut self, settings: &S) -> Result<usize> {
        let settable: Vec<(String, String, Option<Value>)> = self
            .attributes
            .values()
            .filter_map(|attr| {
                attr.setting()
                    .map(|s| (attr.path.clone(), s.to_string(), attr.value.clone()))
            })
            .collect();

        let mut loaded = 0;
        for (path, setting, default) in settable {
            if let Some(value) = settings.load_setting(&setting, default).await? {
                match self.set(&path, value) {
                    Ok(_) => {}
                    Err(e @ DeviceError::TypeMismatch { .. }) => {
                        tracing::warn!(%path, %setting, error = %e, "Ignoring stored setting");
                    }
                    Err(e) => return Err(e),
                }
            }
            loaded += 1;
        }

        Ok(loaded)
    }

    /// Drain queued changes, in first-change order without duplicates.
    pub fn take_changes(&mut self) -> Vec<String> {
        self.pending.clear();
        std::mem::take(&mut self.changes)
    }

    /// Whether changes are waiting to be published.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Snapshot of one attribute.
    pub fn snapshot(&self, path: &str) -> Result<AttributeSnapshot> {
        self.attributes
            .get(path)
            .map(Attribute::snapshot)
            .ok_or_else(|| DeviceError::UnknownPath(path.to_string()))
    }

    /// Snapshots of every attribute in path order.
    pub fn snapshots(&self) -> Vec<AttributeSnapshot> {
        self.attributes.values().map(Attribute::snapshot).collect()
    }

    fn record_change(&mut self, path: &str) {
        if self.pending.insert(path.to_string()) {
            self.changes.push(path.to_string());
        }
    }
}
