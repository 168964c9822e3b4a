use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Serialization format for bus payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON format (human-readable, good for debugging).
    #[default]
    Json,

    /// CBOR format (compact binary, for constrained links).
    Cbor,
}

impl Format {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Cbor => "application/cbor",
        }
    }
}

/// Encode a value to bytes using the specified format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => serde_json::to_vec(value).map_err(Error::from),
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)?;
            Ok(buf)
        }
    }
}

/// Decode bytes to a value using the specified format.
pub fn decode<T: DeserializeOwned>(data: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => serde_json::from_slice(data).map_err(Error::from),
        Format::Cbor => ciborium::from_reader(data).map_err(|e| Error::Cbor(e.to_string())),
    }
}

/// Try to auto-detect the format from the data.
///
/// Returns `Json` if the data starts with `{` or `[`, otherwise `Cbor`.
pub fn detect_format(data: &[u8]) -> Format {
    match data.first() {
        Some(b'{') | Some(b'[') => Format::Json,
        _ => Format::Cbor,
    }
}

/// Decode bytes, auto-detecting the format.
pub fn decode_auto<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let format = detect_format(data);
    decode(data, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AttributeSnapshot, ErrorCode, ErrorReply};
    use crate::value::Value;

    fn uptime_snapshot() -> AttributeSnapshot {
        AttributeSnapshot::new("/System/Uptime", Some(Value::Int(5000)), "1.4 hours")
    }

    #[test]
    fn test_json_snapshot() {
        let snapshot = uptime_snapshot();

        let encoded = encode(&snapshot, Format::Json).unwrap();
        let decoded: AttributeSnapshot = decode(&encoded, Format::Json).unwrap();

        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_cbor_keeps_float_kind() {
        let snapshot =
            AttributeSnapshot::new("/Temperature", Some(Value::Float(48.0)), "48");

        let encoded = encode(&snapshot, Format::Cbor).unwrap();
        let decoded: AttributeSnapshot = decode(&encoded, Format::Cbor).unwrap();

        assert_eq!(decoded.value, Some(Value::Float(48.0)));
    }

    #[test]
    fn test_cbor_is_smaller() {
        let snapshot = uptime_snapshot();

        let json = encode(&snapshot, Format::Json).unwrap();
        let cbor = encode(&snapshot, Format::Cbor).unwrap();

        assert!(cbor.len() < json.len(), "CBOR should be smaller than JSON");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(detect_format(b"{\"value\": 1}"), Format::Json);
        assert_eq!(detect_format(b"[1, 2, 3]"), Format::Json);
        assert_eq!(detect_format(b"\xa1\x65value\x01"), Format::Cbor);
    }

    #[test]
    fn test_auto_decode_error_reply() {
        let reply = ErrorReply::new(ErrorCode::UnknownPath, "/Nope");

        let json = encode(&reply, Format::Json).unwrap();
        let decoded: ErrorReply = decode_auto(&json).unwrap();
        assert_eq!(decoded.code, ErrorCode::UnknownPath);

        let cbor = encode(&reply, Format::Cbor).unwrap();
        let decoded: ErrorReply = decode_auto(&cbor).unwrap();
        assert_eq!(decoded.message, "/Nope");
    }
}
