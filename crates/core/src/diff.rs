//! Field-level comparison between a known device and an incoming update
//!
//! Row order is fixed: `Id`, then `Kind`, then every property key of the
//! known record in lexicographic order. The known record decides which keys
//! exist; keys that only appear in the update are not listed.

use crate::device::{DeviceRecord, DeviceUpdate};

/// Label of the identifier row
pub const ID_LABEL: &str = "Id";
/// Label of the kind row
pub const KIND_LABEL: &str = "Kind";

/// One row of a before/after comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub label: String,
    pub old: String,
    pub new: String,
}

impl FieldDiff {
    /// Row whose value did not change
    pub fn unchanged(label: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: label.into(),
            old: value.clone(),
            new: value,
        }
    }

    /// Row comparing two values (may still turn out equal)
    pub fn compare(label: impl Into<String>, old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            old: old.into(),
            new: new.into(),
        }
    }

    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

/// Compare `old` against a partial `update`
///
/// A property the update does not carry is reported unchanged with its old
/// value: the provider never signals deletion, so no news is no change.
pub fn diff(old: &DeviceRecord, update: &DeviceUpdate) -> Vec<FieldDiff> {
    let mut rows = Vec::with_capacity(old.properties.len() + 2);
    rows.push(FieldDiff::compare(ID_LABEL, old.id.as_str(), update.id.as_str()));
    rows.push(FieldDiff::compare(
        KIND_LABEL,
        old.kind.to_string(),
        update.kind.to_string(),
    ));

    for key in old.sorted_keys() {
        let old_value = old.properties[key].render();
        match update.properties.get(key) {
            Some(new_value) => rows.push(FieldDiff::compare(key, old_value, new_value.render())),
            None => rows.push(FieldDiff::unchanged(key, old_value)),
        }
    }

    rows
}

/// Rows describing a full record, all unchanged
pub fn describe(record: &DeviceRecord) -> Vec<FieldDiff> {
    let mut rows = Vec::with_capacity(record.properties.len() + 2);
    rows.push(FieldDiff::unchanged(ID_LABEL, record.id.as_str()));
    rows.push(FieldDiff::unchanged(KIND_LABEL, record.kind.to_string()));
    for key in record.sorted_keys() {
        rows.push(FieldDiff::unchanged(key, record.properties[key].render()));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;

    fn hub() -> DeviceRecord {
        DeviceRecord::new("2", DeviceKind::Device, "Y")
            .with_property("b", "beta")
            .with_property("a", "1")
            .with_property("blob", vec![0x0A_u8, 0xFF])
    }

    fn labels(rows: &[FieldDiff]) -> Vec<&str> {
        rows.iter().map(|row| row.label.as_str()).collect()
    }

    #[test]
    fn test_row_order_is_id_kind_then_sorted_keys() {
        let rows = diff(&hub(), &DeviceUpdate::new("2", DeviceKind::Device));
        assert_eq!(labels(&rows), vec!["Id", "Kind", "a", "b", "blob"]);
    }

    #[test]
    fn test_changed_property_is_a_transition() {
        let update = DeviceUpdate::new("2", DeviceKind::Device).with_property("a", "2");
        let rows = diff(&hub(), &update);

        assert_eq!(rows[2], FieldDiff::compare("a", "1", "2"));
        assert!(rows[2].is_changed());
        assert!(!rows[3].is_changed());
    }

    #[test]
    fn test_empty_patch_leaves_everything_unchanged() {
        let rows = diff(&hub(), &DeviceUpdate::new("2", DeviceKind::Device));
        assert!(rows.iter().all(|row| !row.is_changed()));
        assert_eq!(rows[2], FieldDiff::unchanged("a", "1"));
        assert_eq!(rows[4], FieldDiff::unchanged("blob", "0AFF"));
    }

    #[test]
    fn test_diff_is_idempotent_for_a_full_repeat() {
        let record = hub();
        let rows = diff(&record, &DeviceUpdate::from_record(&record));
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row.old == row.new));
    }

    #[test]
    fn test_keys_only_in_update_are_not_listed() {
        let update = DeviceUpdate::new("2", DeviceKind::Device).with_property("zzz", "new");
        let rows = diff(&hub(), &update);
        assert!(!labels(&rows).contains(&"zzz"));
    }

    #[test]
    fn test_kind_change_is_reported() {
        let update = DeviceUpdate::new("2", DeviceKind::DeviceInterface);
        let rows = diff(&hub(), &update);
        assert_eq!(rows[1], FieldDiff::compare("Kind", "Device", "DeviceInterface"));
    }

    #[test]
    fn test_describe_matches_diff_layout() {
        let record = hub();
        let rows = describe(&record);
        assert_eq!(labels(&rows), vec!["Id", "Kind", "a", "b", "blob"]);
        assert!(rows.iter().all(|row| !row.is_changed()));
    }
}
