//! In-memory snapshot of currently attached devices
//!
//! Records live in a `Vec` and every lookup is a linear scan; keeping
//! duplicates representable is what lets lookups report ambiguity.

use crate::device::{DeviceRecord, DeviceUpdate};
use crate::error::{CorrelationError, RegistryError};

/// Authoritative set of known devices
///
/// Lookups count every record carrying the requested id, so a broken
/// uniqueness invariant surfaces as [`CorrelationError::Ambiguous`] instead
/// of silently picking one of the duplicates.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    records: Vec<DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new device
    ///
    /// Rejects a record whose id is already present and leaves the registry
    /// unchanged.
    pub fn add(&mut self, record: DeviceRecord) -> Result<(), RegistryError> {
        if self.contains(&record.id) {
            return Err(RegistryError::Duplicate(record.id));
        }
        self.records.push(record);
        Ok(())
    }

    /// Resolve exactly one record for `id`
    pub fn find(&self, id: &str) -> Result<&DeviceRecord, CorrelationError> {
        let index = self.position(id)?;
        Ok(&self.records[index])
    }

    /// Merge a partial update into the record for `update.id`
    pub fn update(&mut self, update: &DeviceUpdate) -> Result<&DeviceRecord, CorrelationError> {
        let index = self.position(&update.id)?;
        let record = &mut self.records[index];
        record.apply(update);
        Ok(&*record)
    }

    /// Delete the record for `id`, returning it
    pub fn remove(&mut self, id: &str) -> Result<DeviceRecord, CorrelationError> {
        let index = self.position(id)?;
        Ok(self.records.swap_remove(index))
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Known ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    fn position(&self, id: &str) -> Result<usize, CorrelationError> {
        let mut matches = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.id == id)
            .map(|(index, _)| index);

        let first = matches.next().ok_or_else(|| CorrelationError::NotFound {
            id: id.to_string(),
        })?;

        let extra = matches.count();
        if extra > 0 {
            return Err(CorrelationError::Ambiguous {
                id: id.to_string(),
                count: extra + 1,
            });
        }

        Ok(first)
    }

    #[cfg(test)]
    fn push_unchecked(&mut self, record: DeviceRecord) {
        self.records.push(record);
    }
}
