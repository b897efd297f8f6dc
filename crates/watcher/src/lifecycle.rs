//! Watcher lifecycle state machine
//!
//! ```text
//! Stopped --start--> Started --(enumeration done)--> EnumerationCompleted
//!    ^                  |                                  |
//!    |                  +--------------stop----------------+
//!    |                                 v
//!    +------(provider stopped)---- Stopping
//!
//! any running state --(provider aborted)--> Aborted (terminal)
//! ```

use crate::provider::FinalStatus;
use std::fmt;
use thiserror::Error;

/// Current status of the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatcherState {
    #[default]
    Stopped,
    Started,
    EnumerationCompleted,
    Stopping,
    Aborted,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatcherState::Stopped => "stopped",
            WatcherState::Started => "started",
            WatcherState::EnumerationCompleted => "enumeration completed",
            WatcherState::Stopping => "stopping",
            WatcherState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What a pause/resume request means in the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Resume,
    Pause,
    /// A pause is already in flight; nothing to do
    AlreadyPausing,
    /// The watcher aborted and cannot be restarted
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {command} the watcher while it is {state}")]
    InvalidTransition {
        command: &'static str,
        state: WatcherState,
    },

    #[error("the watcher is currently pausing")]
    Pausing,
}

/// Tracks the watcher status and gates rendering of additions
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: WatcherState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Provider is producing notifications for the current snapshot
    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            WatcherState::Started | WatcherState::EnumerationCompleted
        )
    }

    /// Added notifications are rendered only after the initial enumeration
    pub fn renders_additions(&self) -> bool {
        self.state == WatcherState::EnumerationCompleted
    }

    pub fn toggle(&self) -> Toggle {
        match self.state {
            WatcherState::Stopped => Toggle::Resume,
            WatcherState::Started | WatcherState::EnumerationCompleted => Toggle::Pause,
            WatcherState::Stopping => Toggle::AlreadyPausing,
            WatcherState::Aborted => Toggle::Terminated,
        }
    }

    /// Stopped -> Started
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            WatcherState::Stopped => {
                self.state = WatcherState::Started;
                Ok(())
            }
            WatcherState::Stopping => Err(LifecycleError::Pausing),
            state => Err(LifecycleError::InvalidTransition {
                command: "start",
                state,
            }),
        }
    }

    /// Started | EnumerationCompleted -> Stopping
    ///
    /// Leaving EnumerationCompleted also resets the rendering gate, so the
    /// next run buffers its enumeration again.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        if self.is_running() {
            self.state = WatcherState::Stopping;
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                command: "stop",
                state: self.state,
            })
        }
    }

    /// Started -> EnumerationCompleted; returns false when not applicable
    pub fn complete_enumeration(&mut self) -> bool {
        if self.state == WatcherState::Started {
            self.state = WatcherState::EnumerationCompleted;
            true
        } else {
            false
        }
    }

    /// Apply the provider's end-of-run report
    pub fn provider_stopped(&mut self, status: FinalStatus) {
        if self.state == WatcherState::Aborted {
            return;
        }
        self.state = match status {
            FinalStatus::Stopped => WatcherState::Stopped,
            FinalStatus::Aborted => WatcherState::Aborted,
        };
    }
}
