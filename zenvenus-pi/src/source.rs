//! Host metric sources.
//!
//! Temperature, serial and model come straight from sysfs/procfs files;
//! available memory and uptime come from `sysinfo`. Every read is
//! independently fallible so one broken source never hides the others.

use std::path::{Path, PathBuf};

use sysinfo::System;
use thiserror::Error;

use crate::config::SourcesConfig;

/// Errors reading a metric source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed {what} in {path}: {content:?}")]
    Malformed {
        what: &'static str,
        path: PathBuf,
        content: String,
    },
    #[error("No {field} field in {path}")]
    MissingField { field: &'static str, path: PathBuf },
    #[error("{0} is not available on this host")]
    Unavailable(&'static str),
}

/// One reading of every sampled metric.
#[derive(Debug)]
pub struct PiSample {
    /// CPU temperature in °C.
    pub temperature: Result<f64, SourceError>,
    /// Available memory in kB.
    pub memory_available_kb: Result<i64, SourceError>,
    /// Seconds since boot.
    pub uptime_secs: Result<i64, SourceError>,
}

/// Read-only endpoints for the sampled metrics.
pub trait MetricSource: Send {
    fn temperature(&mut self) -> Result<f64, SourceError>;

    fn memory_available_kb(&mut self) -> Result<i64, SourceError>;

    fn uptime_secs(&mut self) -> Result<i64, SourceError>;

    /// Read everything once.
    fn sample(&mut self) -> PiSample {
        PiSample {
            temperature: self.temperature(),
            memory_available_kb: self.memory_available_kb(),
            uptime_secs: self.uptime_secs(),
        }
    }
}

/// Metrics of the machine the daemon runs on.
pub struct SystemSource {
    system: System,
    thermal_zone: PathBuf,
}

impl SystemSource {
    pub fn new(config: &SourcesConfig) -> Self {
        Self {
            system: System::new(),
            thermal_zone: config.thermal_zone.clone(),
        }
    }
}

impl MetricSource for SystemSource {
    fn temperature(&mut self) -> Result<f64, SourceError> {
        let content = read(&self.thermal_zone)?;
        parse_millidegrees(&content).ok_or_else(|| SourceError::Malformed {
            what: "temperature",
            path: self.thermal_zone.clone(),
            content,
        })
    }

    fn memory_available_kb(&mut self) -> Result<i64, SourceError> {
        self.system.refresh_memory();
        if self.system.total_memory() == 0 {
            return Err(SourceError::Unavailable("memory information"));
        }
        Ok((self.system.available_memory() / 1024) as i64)
    }

    fn uptime_secs(&mut self) -> Result<i64, SourceError> {
        match System::uptime() {
            0 => Err(SourceError::Unavailable("uptime")),
            secs => Ok(secs as i64),
        }
    }
}

fn read(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a sysfs thermal reading (millidegrees) into °C.
pub fn parse_millidegrees(content: &str) -> Option<f64> {
    let milli: f64 = content.trim().parse().ok()?;
    milli.is_finite().then_some(milli / 1000.0)
}

/// `Serial` field of the last `/proc/cpuinfo` section.
pub fn parse_cpuinfo_serial(cpuinfo: &str) -> Option<String> {
    let last = cpuinfo
        .trim_end()
        .split("\n\n")
        .last()?;

    last.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "Serial")
            .then(|| value.trim().to_string())
            .filter(|serial| !serial.is_empty())
    })
}

/// Hardware serial from `/proc/cpuinfo`.
pub fn read_serial(path: &Path) -> Result<String, SourceError> {
    parse_cpuinfo_serial(&read(path)?).ok_or_else(|| SourceError::MissingField {
        field: "Serial",
        path: path.to_path_buf(),
    })
}

/// Board model from the device tree, without trailing NULs.
pub fn read_model(path: &Path) -> Result<String, SourceError> {
    let model = read(path)?.trim_end_matches(['\0', '\n']).to_string();
    if model.is_empty() {
        return Err(SourceError::MissingField {
            field: "model",
            path: path.to_path_buf(),
        });
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPUINFO: &str = "processor\t: 0\nBogoMIPS\t: 108.00\nFeatures\t: fp asimd\n\n\
processor\t: 1\nBogoMIPS\t: 108.00\n\n\
Hardware\t: BCM2835\nRevision\t: c03111\nSerial\t\t: 10000000abcdef01\nModel\t\t: Raspberry Pi 4 Model B Rev 1.1\n";

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_millidegrees("47234\n"), Some(47.234));
        assert_eq!(parse_millidegrees("-5000"), Some(-5.0));
        assert_eq!(parse_millidegrees("hot"), None);
        assert_eq!(parse_millidegrees(""), None);
    }

    #[test]
    fn test_serial_from_last_section() {
        assert_eq!(
            parse_cpuinfo_serial(CPUINFO),
            Some("10000000abcdef01".to_string())
        );
    }

    #[test]
    fn test_serial_missing() {
        assert_eq!(parse_cpuinfo_serial("processor\t: 0\n\nHardware\t: BCM2835\n"), None);
        assert_eq!(parse_cpuinfo_serial("Serial\t\t: 123\n\nprocessor\t: 1\n"), None);
    }

    #[test]
    fn test_read_model_strips_nul() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");
        std::fs::write(&path, b"Raspberry Pi 4 Model B Rev 1.1\0").unwrap();

        assert_eq!(read_model(&path).unwrap(), "Raspberry Pi 4 Model B Rev 1.1");
    }

    #[test]
    fn test_read_serial_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpuinfo");
        std::fs::write(&path, CPUINFO).unwrap();

        assert_eq!(read_serial(&path).unwrap(), "10000000abcdef01");
        assert!(matches!(
            read_serial(&dir.path().join("missing")),
            Err(SourceError::Read { .. })
        ));
    }

    #[test]
    fn test_system_source_temperature() {
        let dir = tempfile::tempdir().unwrap();
        let zone = dir.path().join("temp");
        std::fs::write(&zone, "51500\n").unwrap();

        let config = SourcesConfig {
            thermal_zone: zone.clone(),
            ..SourcesConfig::default()
        };
        let mut source = SystemSource::new(&config);
        assert_eq!(source.temperature().unwrap(), 51.5);

        std::fs::write(&zone, "garbage").unwrap();
        assert!(matches!(
            source.temperature(),
            Err(SourceError::Malformed { .. })
        ));

        std::fs::remove_file(&zone).unwrap();
        assert!(matches!(source.temperature(), Err(SourceError::Read { .. })));
    }
}
