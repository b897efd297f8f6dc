//! Device model for the sentry
//!
//! This crate provides:
//! - Property payloads and their canonical display form
//! - Device records and partial updates
//! - The in-memory device registry
//! - Field-level diffs between a record and an update

pub mod device;
pub mod diff;
pub mod error;
pub mod registry;
pub mod value;

// Re-exports
pub use device::{DeviceKind, DeviceRecord, DeviceUpdate, Properties};
pub use diff::{describe, diff, FieldDiff};
pub use error::{CorrelationError, RegistryError};
pub use registry::DeviceRegistry;
pub use value::PropertyValue;
