//! Pi device schema and per-tick update.

use zenvenus_device::{
    Attribute, AttributeRegistry, Result, Sampler, TextFormat, TickReport, Value, ValueKind,
    device_setting_path,
};

use crate::source::{MetricSource, SourceError};

pub const CUSTOM_NAME: &str = "/CustomName";
pub const TEMPERATURE: &str = "/Temperature";
pub const TEMPERATURE_TYPE: &str = "/TemperatureType";
pub const MIN_TEMPERATURE: &str = "/History/MinimumTemperature";
pub const MAX_TEMPERATURE: &str = "/History/MaximumTemperature";
pub const MEMORY_FREE: &str = "/System/MemoryFree";
pub const UPTIME: &str = "/System/Uptime";

/// Samples a [`MetricSource`] into the Pi attributes.
///
/// A failed read leaves its attribute at the last good value.
pub struct PiSampler<S> {
    source: S,
    unique_key: String,
    temperature_type: i64,
}

impl<S: MetricSource> PiSampler<S> {
    pub fn new(source: S, unique_key: impl Into<String>, temperature_type: i64) -> Self {
        Self {
            source,
            unique_key: unique_key.into(),
            temperature_type,
        }
    }

    fn update(
        registry: &mut AttributeRegistry,
        report: &mut TickReport,
        path: &str,
        reading: std::result::Result<Value, SourceError>,
    ) -> Option<Value> {
        let value = match reading {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(%path, error = %e, "Source read failed, keeping last value");
                report.failed += 1;
                return None;
            }
        };

        match registry.set(path, value.clone()) {
            Ok(changed) => {
                report.updated += usize::from(changed);
                Some(value)
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "Rejected sample");
                report.failed += 1;
                None
            }
        }
    }

    fn update_extrema(registry: &mut AttributeRegistry, report: &mut TickReport, celsius: f64) {
        if stored(registry, MIN_TEMPERATURE).is_none_or(|min| celsius < min) {
            Self::update(registry, report, MIN_TEMPERATURE, Ok(Value::Float(celsius)));
        }
        if stored(registry, MAX_TEMPERATURE).is_none_or(|max| celsius > max) {
            Self::update(registry, report, MAX_TEMPERATURE, Ok(Value::Float(celsius)));
        }
    }
}

fn stored(registry: &AttributeRegistry, path: &str) -> Option<f64> {
    registry.get(path).ok().flatten().and_then(Value::as_f64)
}

impl<S: MetricSource> Sampler for PiSampler<S> {
    fn declare(&mut self, registry: &mut AttributeRegistry) -> Result<()> {
        let attributes = [
            Attribute::new(CUSTOM_NAME, ValueKind::Text)
                .with_value("")
                .settable(device_setting_path(&self.unique_key, CUSTOM_NAME)),
            Attribute::new(TEMPERATURE, ValueKind::Float),
            Attribute::new(TEMPERATURE_TYPE, ValueKind::Int).with_value(self.temperature_type),
            Attribute::new(MIN_TEMPERATURE, ValueKind::Float),
            Attribute::new(MAX_TEMPERATURE, ValueKind::Float),
            Attribute::new(MEMORY_FREE, ValueKind::Int).formatted(TextFormat::Unit("kB")),
            Attribute::new(UPTIME, ValueKind::Int).formatted(TextFormat::Duration),
        ];

        for attribute in attributes {
            registry.declare(attribute)?;
        }
        Ok(())
    }

    fn sample(&mut self, registry: &mut AttributeRegistry) -> TickReport {
        let sample = self.source.sample();
        let mut report = TickReport::default();

        let temperature = Self::update(
            registry,
            &mut report,
            TEMPERATURE,
            sample.temperature.map(Value::Float),
        );
        if let Some(celsius) = temperature.as_ref().and_then(Value::as_f64) {
            Self::update_extrema(registry, &mut report, celsius);
        }

        Self::update(
            registry,
            &mut report,
            MEMORY_FREE,
            sample.memory_available_kb.map(Value::Int),
        );
        Self::update(
            registry,
            &mut report,
            UPTIME,
            sample.uptime_secs.map(Value::Int),
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use zenvenus_device::SamplingLoop;

    /// Replays scripted readings; `None` fails the read.
    #[derive(Default)]
    struct ScriptedSource {
        temperatures: VecDeque<Option<f64>>,
        memory: VecDeque<Option<i64>>,
        uptime: VecDeque<Option<i64>>,
    }

    fn next<T>(queue: &mut VecDeque<Option<T>>, what: &'static str) -> std::result::Result<T, SourceError> {
        queue
            .pop_front()
            .flatten()
            .ok_or(SourceError::Unavailable(what))
    }

    impl MetricSource for ScriptedSource {
        fn temperature(&mut self) -> std::result::Result<f64, SourceError> {
            next(&mut self.temperatures, "temperature")
        }

        fn memory_available_kb(&mut self) -> std::result::Result<i64, SourceError> {
            next(&mut self.memory, "memory")
        }

        fn uptime_secs(&mut self) -> std::result::Result<i64, SourceError> {
            next(&mut self.uptime, "uptime")
        }
    }

    fn setup(source: ScriptedSource) -> (SamplingLoop<PiSampler<ScriptedSource>>, AttributeRegistry) {
        let mut registry = AttributeRegistry::new();
        let mut sampling = SamplingLoop::new(PiSampler::new(source, "cpu_test", 2));
        sampling.declare(&mut registry).unwrap();
        (sampling, registry)
    }

    fn float(registry: &AttributeRegistry, path: &str) -> Option<f64> {
        registry.get(path).unwrap().and_then(Value::as_f64)
    }

    #[test]
    fn test_schema() {
        let (_, registry) = setup(ScriptedSource::default());

        assert_eq!(registry.len(), 7);
        assert_eq!(registry.get(TEMPERATURE_TYPE).unwrap(), Some(&Value::Int(2)));
        assert_eq!(registry.get(CUSTOM_NAME).unwrap(), Some(&Value::from("")));
        assert_eq!(registry.get(MIN_TEMPERATURE).unwrap(), None);
        assert_eq!(
            registry.attribute(CUSTOM_NAME).unwrap().setting(),
            Some("/Settings/Devices/cpu_test/CustomName")
        );
        assert!(!registry.attribute(TEMPERATURE).unwrap().is_writable());
    }

    #[test]
    fn test_extrema_follow_readings() {
        let (mut sampling, mut registry) = setup(ScriptedSource {
            temperatures: [Some(40.0), Some(35.0), Some(45.0), Some(38.0)].into(),
            ..Default::default()
        });

        let report = sampling.tick(&mut registry);
        assert_eq!(float(&registry, MIN_TEMPERATURE), Some(40.0));
        assert_eq!(float(&registry, MAX_TEMPERATURE), Some(40.0));
        assert_eq!(report.updated, 3);

        sampling.tick(&mut registry);
        sampling.tick(&mut registry);
        sampling.tick(&mut registry);

        assert_eq!(float(&registry, TEMPERATURE), Some(38.0));
        assert_eq!(float(&registry, MIN_TEMPERATURE), Some(35.0));
        assert_eq!(float(&registry, MAX_TEMPERATURE), Some(45.0));
    }

    #[test]
    fn test_failed_read_keeps_last_value() {
        let (mut sampling, mut registry) = setup(ScriptedSource {
            temperatures: [Some(41.3), None].into(),
            memory: [Some(812345), Some(800000)].into(),
            uptime: [Some(500), Some(501)].into(),
        });

        sampling.tick(&mut registry);
        registry.take_changes();

        let report = sampling.tick(&mut registry);
        assert_eq!(report.failed, 1);
        assert_eq!(float(&registry, TEMPERATURE), Some(41.3));
        assert_eq!(registry.get(MEMORY_FREE).unwrap(), Some(&Value::Int(800000)));
        assert_eq!(
            registry.take_changes(),
            vec![MEMORY_FREE.to_string(), UPTIME.to_string()]
        );
    }

    #[test]
    fn test_failed_first_read_stays_unset() {
        let (mut sampling, mut registry) = setup(ScriptedSource {
            temperatures: [None].into(),
            memory: [Some(1024)].into(),
            uptime: [Some(5000)].into(),
        });

        let report = sampling.tick(&mut registry);
        assert_eq!(report.failed, 1);
        assert_eq!(registry.get(TEMPERATURE).unwrap(), None);
        assert_eq!(registry.get(MIN_TEMPERATURE).unwrap(), None);
        assert_eq!(registry.snapshot(TEMPERATURE).unwrap().text, "---");
        assert_eq!(registry.snapshot(MEMORY_FREE).unwrap().text, "1024kB");
        assert_eq!(registry.snapshot(UPTIME).unwrap().text, "1.4 hours");
    }

    #[test]
    fn test_raw_values_are_not_formatted() {
        let (mut sampling, mut registry) = setup(ScriptedSource {
            temperatures: [Some(41.3)].into(),
            memory: [Some(812345)].into(),
            uptime: [Some(200000)].into(),
        });

        sampling.tick(&mut registry);
        let uptime = registry.snapshot(UPTIME).unwrap();
        assert_eq!(uptime.value, Some(Value::Int(200000)));
        assert_eq!(uptime.text, "2.3 days");
    }
}
