//! Event correlation: notifications in, registry mutations and render blocks out

use crate::lifecycle::{Lifecycle, LifecycleError, Toggle, WatcherState};
use crate::provider::{FinalStatus, Notification};
use sentry_core::{describe, diff, CorrelationError, DeviceRegistry, FieldDiff, RegistryError};
use thiserror::Error;
use tracing::{debug, info};

/// Kind of device event shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Updated,
    Removed,
}

impl EventKind {
    /// Header text for the event
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Added => "Device Added",
            EventKind::Updated => "Device Updated",
            EventKind::Removed => "Device Removed",
        }
    }
}

/// Everything needed to render one device event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    pub kind: EventKind,
    /// Display name of the device
    pub name: String,
    pub rows: Vec<FieldDiff>,
}

/// Result of handling one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Applied without producing output
    Silent,
    /// Dropped because it belongs to a run that was already paused
    Ignored,
    Render(EventBlock),
    EnumerationCompleted,
    /// The provider finished a run normally
    Stopped,
    /// The provider terminated unexpectedly
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Owned watcher state: the device registry and its lifecycle
///
/// All mutation goes through `&mut self`, so whoever owns the session is the
/// single point of serialization for notifications and operator commands.
#[derive(Debug, Default)]
pub struct Session {
    registry: DeviceRegistry,
    lifecycle: Lifecycle,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn state(&self) -> WatcherState {
        self.lifecycle.state()
    }

    pub fn toggle(&self) -> Toggle {
        self.lifecycle.toggle()
    }

    /// Enter a new run
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle.start()?;
        info!("Watcher started");
        Ok(())
    }

    /// Leave the current run and invalidate the snapshot
    ///
    /// The next run re-enumerates every device, so the registry is cleared.
    pub fn pause(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle.stop()?;
        let dropped = self.registry.len();
        self.registry.clear();
        info!("Watcher stopping, cleared {} devices", dropped);
        Ok(())
    }

    /// Correlate a notification with the registry and apply it
    ///
    /// A failed correlation leaves the registry untouched.
    pub fn handle(&mut self, notification: Notification) -> Result<Outcome, SessionError> {
        match notification {
            Notification::Stopped(status) => Ok(self.provider_stopped(status)),
            _ if !self.lifecycle.is_running() => {
                debug!(
                    "Dropping stale notification while {}: {:?}",
                    self.lifecycle.state(),
                    notification
                );
                Ok(Outcome::Ignored)
            }
            Notification::EnumerationCompleted => {
                self.lifecycle.complete_enumeration();
                info!("Enumeration completed with {} devices", self.registry.len());
                Ok(Outcome::EnumerationCompleted)
            }
            Notification::Added(record) => {
                debug!("Device added: {}", record.id);
                if self.lifecycle.renders_additions() {
                    let block = EventBlock {
                        kind: EventKind::Added,
                        name: record.name.clone(),
                        rows: describe(&record),
                    };
                    self.registry.add(record)?;
                    Ok(Outcome::Render(block))
                } else {
                    self.registry.add(record)?;
                    Ok(Outcome::Silent)
                }
            }
            Notification::Updated(update) => {
                debug!("Device updated: {}", update.id);
                let known = self.registry.find(&update.id)?;
                let block = EventBlock {
                    kind: EventKind::Updated,
                    name: known.name.clone(),
                    rows: diff(known, &update),
                };
                self.registry.update(&update)?;
                Ok(Outcome::Render(block))
            }
            Notification::Removed(update) => {
                debug!("Device removed: {}", update.id);
                let known = self.registry.find(&update.id)?;
                let block = EventBlock {
                    kind: EventKind::Removed,
                    name: known.name.clone(),
                    rows: diff(known, &update),
                };
                self.registry.remove(&update.id)?;
                Ok(Outcome::Render(block))
            }
        }
    }

    fn provider_stopped(&mut self, status: FinalStatus) -> Outcome {
        if self.lifecycle.is_running() {
            // Stopped without being asked: nothing will refresh this snapshot.
            self.registry.clear();
        }
        self.lifecycle.provider_stopped(status);
        match self.lifecycle.state() {
            WatcherState::Aborted => {
                info!("Watcher aborted");
                Outcome::Aborted
            }
            _ => {
                info!("Watcher stopped");
                Outcome::Stopped
            }
        }
    }
}
