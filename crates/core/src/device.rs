//! Device records and partial updates

use crate::value::PropertyValue;
use ahash::AHashMap;
use std::fmt;

/// Property map of a device (keys are case-sensitive, unordered)
pub type Properties = AHashMap<String, PropertyValue>;

/// Category of a device as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceKind {
    #[default]
    Unknown,
    /// A physical or logical device node
    Device,
    /// An interface exposed by a device
    DeviceInterface,
    /// A container grouping the functions of one physical device
    DeviceContainer,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Unknown => "Unknown",
            DeviceKind::Device => "Device",
            DeviceKind::DeviceInterface => "DeviceInterface",
            DeviceKind::DeviceContainer => "DeviceContainer",
        };
        f.write_str(name)
    }
}

/// Full description of one known device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    /// Stable identifier, unique within the registry
    pub id: String,
    pub kind: DeviceKind,
    /// Display name
    pub name: String,
    pub properties: Properties,
}

impl DeviceRecord {
    /// Create a record with no properties
    pub fn new(id: impl Into<String>, kind: DeviceKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            properties: Properties::default(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Property keys in lexicographic order
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Merge a partial update into this record
    ///
    /// Kind is replaced, every property carried by the update is replaced,
    /// every other property is left untouched. Updates never delete keys.
    pub fn apply(&mut self, update: &DeviceUpdate) {
        self.kind = update.kind;
        for (key, value) in &update.properties {
            self.properties.insert(key.clone(), value.clone());
        }
    }
}

/// Partial view of a device carried by update and removal notifications
///
/// Absent property keys mean "unchanged", never "removed".
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceUpdate {
    pub id: String,
    pub kind: DeviceKind,
    pub properties: Properties,
}

impl DeviceUpdate {
    /// Create an update that carries no property changes
    pub fn new(id: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: Properties::default(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Update that repeats every field of `record` unchanged
    pub fn from_record(record: &DeviceRecord) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            properties: record.properties.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_merges_without_deleting() {
        let mut record = DeviceRecord::new("usb/1-1", DeviceKind::Device, "Hub")
            .with_property("a", "1")
            .with_property("b", "x");

        let update = DeviceUpdate::new("usb/1-1", DeviceKind::DeviceContainer)
            .with_property("a", "2")
            .with_property("c", "new");
        record.apply(&update);

        assert_eq!(record.kind, DeviceKind::DeviceContainer);
        assert_eq!(record.properties["a"], PropertyValue::from("2"));
        assert_eq!(record.properties["b"], PropertyValue::from("x"));
        assert_eq!(record.properties["c"], PropertyValue::from("new"));
        assert_eq!(record.name, "Hub");
    }

    #[test]
    fn test_sorted_keys() {
        let record = DeviceRecord::new("1", DeviceKind::Device, "X")
            .with_property("b", "1")
            .with_property("B", "1")
            .with_property("a", "1");
        assert_eq!(record.sorted_keys(), vec!["B", "a", "b"]);
    }
}
