//! Property payloads and their canonical display form

use std::fmt;

/// Raw value of a single device property
///
/// Providers hand over whatever payload the platform exposes. Every variant
/// has exactly one canonical string form, used both for display and for
/// deciding whether a property changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Plain text payload
    Text(String),
    /// Opaque bytes (rendered as uppercase hex)
    Binary(Vec<u8>),
    /// Numeric payload
    Integer(i64),
    /// Boolean payload
    Flag(bool),
}

impl PropertyValue {
    /// Canonical string form of this value
    ///
    /// Binary payloads become two uppercase hex digits per byte, in order,
    /// with no separators. Everything else uses its natural representation.
    pub fn render(&self) -> String {
        match self {
            PropertyValue::Text(text) => text.clone(),
            PropertyValue::Binary(bytes) => hex::encode_upper(bytes),
            PropertyValue::Integer(n) => n.to_string(),
            PropertyValue::Flag(b) => b.to_string(),
        }
    }

    /// Build a value from bytes read off a device, keeping text when it is UTF-8
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => PropertyValue::Text(text.trim_end_matches('\n').to_string()),
            Err(err) => PropertyValue::Binary(err.into_bytes()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for PropertyValue {
    fn from(text: &str) -> Self {
        PropertyValue::Text(text.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(text: String) -> Self {
        PropertyValue::Text(text)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(bytes: Vec<u8>) -> Self {
        PropertyValue::Binary(bytes)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Integer(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Flag(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_renders_as_uppercase_hex() {
        assert_eq!(PropertyValue::Binary(vec![0x0A, 0xFF]).render(), "0AFF");
        assert_eq!(PropertyValue::Binary(vec![0x00, 0x01, 0xab]).render(), "0001AB");
        assert_eq!(PropertyValue::Binary(vec![]).render(), "");
    }

    #[test]
    fn test_natural_forms() {
        assert_eq!(PropertyValue::from("USB Hub").render(), "USB Hub");
        assert_eq!(PropertyValue::Integer(-42).render(), "-42");
        assert_eq!(PropertyValue::Flag(true).render(), "true");
        assert_eq!(PropertyValue::from("x").to_string(), "x");
    }

    #[test]
    fn test_from_bytes() {
        assert_eq!(
            PropertyValue::from_bytes(b"046d\n".to_vec()),
            PropertyValue::Text("046d".to_string())
        );
        assert_eq!(
            PropertyValue::from_bytes(vec![0x12, 0xFF, 0x01]),
            PropertyValue::Binary(vec![0x12, 0xFF, 0x01])
        );
    }
}
