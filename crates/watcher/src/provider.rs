//! Provider-facing interface: notifications in, start/stop out

use anyhow::Result;
use sentry_core::{DeviceRecord, DeviceUpdate};
use tokio::sync::mpsc;

/// How a provider run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalStatus {
    /// Stopped on request
    Stopped,
    /// Terminated by a failure on the provider side
    Aborted,
}

/// Raw event pushed by a device provider
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Added(DeviceRecord),
    Updated(DeviceUpdate),
    Removed(DeviceUpdate),
    /// Initial population of the current run is finished
    EnumerationCompleted,
    Stopped(FinalStatus),
}

/// Sending half handed to providers
pub type NotificationSender = mpsc::UnboundedSender<Notification>;
/// Receiving half owned by the control loop
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Create a notification channel
pub fn channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}

/// Source of device notifications
///
/// A provider enumerates the current devices after `start` (one `Added`
/// each, then `EnumerationCompleted`), reports changes until `stop`, and
/// always finishes a run with exactly one `Stopped`.
pub trait DeviceProvider: Send {
    /// Begin a new run
    fn start(&mut self) -> Result<()>;

    /// Request the current run to end
    ///
    /// Completion is reported asynchronously through `Notification::Stopped`.
    fn stop(&mut self) -> Result<()>;
}
