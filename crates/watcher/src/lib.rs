//! Device watching for the sentry
//!
//! This crate provides:
//! - The provider interface (notifications in, start/stop out)
//! - The watcher lifecycle state machine
//! - Event correlation against the device registry
//! - A polling provider over Linux sysfs

pub mod correlator;
pub mod lifecycle;
pub mod provider;
pub mod sysfs;

pub use correlator::{EventBlock, EventKind, Outcome, Session, SessionError};
pub use lifecycle::{Lifecycle, LifecycleError, Toggle, WatcherState};
pub use provider::{DeviceProvider, FinalStatus, Notification, NotificationReceiver, NotificationSender};
pub use sysfs::{ProviderConfig, SysfsProvider};
