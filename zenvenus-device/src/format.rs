//! Display formatters for attribute values.
//!
//! Formatters only produce the advisory `text` of a snapshot. The stored and
//! transmitted value always stays in its raw unit.

use zenvenus_common::{UNSET_TEXT, Value};

const SECONDS_PER_HOUR: f64 = 3600.0;
const SECONDS_PER_DAY: f64 = 86400.0;

/// Formatting strategy selected per attribute at declaration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    /// The value as is.
    #[default]
    Plain,
    /// The value followed by a unit suffix, e.g. `1024kB`.
    Unit(&'static str),
    /// Seconds rendered as seconds, hours or days depending on magnitude.
    Duration,
}

impl TextFormat {
    /// Render a value. Unset values render as [`UNSET_TEXT`].
    pub fn render(&self, value: Option<&Value>) -> String {
        let Some(value) = value else {
            return UNSET_TEXT.to_string();
        };

        match self {
            TextFormat::Plain => value.to_string(),
            TextFormat::Unit(unit) => format!("{}{}", value, unit),
            TextFormat::Duration => match value.as_f64() {
                Some(secs) => format_duration(value, secs),
                None => value.to_string(),
            },
        }
    }
}

fn format_duration(raw: &Value, secs: f64) -> String {
    if secs < SECONDS_PER_HOUR {
        format!("{}s", raw)
    } else if secs < SECONDS_PER_DAY {
        format!("{:.1} hours", secs / SECONDS_PER_HOUR)
    } else {
        format!("{:.1} days", secs / SECONDS_PER_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_thresholds() {
        let fmt = TextFormat::Duration;
        assert_eq!(fmt.render(Some(&Value::Int(500))), "500s");
        assert_eq!(fmt.render(Some(&Value::Int(5000))), "1.4 hours");
        assert_eq!(fmt.render(Some(&Value::Int(200000))), "2.3 days");
        assert_eq!(fmt.render(Some(&Value::Int(3599))), "3599s");
        assert_eq!(fmt.render(Some(&Value::Int(3600))), "1.0 hours");
        assert_eq!(fmt.render(Some(&Value::Int(86400))), "1.0 days");
    }

    #[test]
    fn test_fractional_seconds_stay_raw() {
        assert_eq!(
            TextFormat::Duration.render(Some(&Value::Float(12.5))),
            "12.5s"
        );
    }

    #[test]
    fn test_unit_suffix() {
        assert_eq!(
            TextFormat::Unit("kB").render(Some(&Value::Int(812345))),
            "812345kB"
        );
    }

    #[test]
    fn test_unset_and_plain() {
        assert_eq!(TextFormat::Duration.render(None), "---");
        assert_eq!(TextFormat::Plain.render(Some(&Value::Float(41.3))), "41.3");
        assert_eq!(
            TextFormat::Duration.render(Some(&Value::Text("n/a".into()))),
            "n/a"
        );
    }

    #[test]
    fn test_render_is_pure() {
        let value = Value::Int(5000);
        let first = TextFormat::Duration.render(Some(&value));
        let second = TextFormat::Duration.render(Some(&value));
        assert_eq!(first, second);
        assert_eq!(value, Value::Int(5000));
    }
}
