//! Device sentry terminal front end
//!
//! Wires the watcher to the operator: keyboard commands, terminal
//! rendering, configuration and logging, and the control loop that merges
//! them all.

pub mod config;
pub mod control;
pub mod keys;
pub mod logging;
pub mod render;

pub use config::{Overrides, SentryConfig};
pub use control::{ControlLoop, Exit};
pub use keys::Command;
pub use render::Renderer;
