//! The control loop: merges device notifications, operator commands and the
//! interrupt signal into one ordered stream of state transitions
//!
//! The loop owns the session and the renderer outright. Every notification
//! and every command is handled to completion before the next wait is
//! issued, so no registry or lifecycle state is ever shared.

use crate::keys::{Command, CommandReceiver};
use crate::render::Renderer;
use anyhow::{Context, Result};
use sentry_watcher::{
    DeviceProvider, FinalStatus, Notification, NotificationReceiver, Outcome, Session, Toggle,
};
use std::future::Future;
use std::io::Write;
use tracing::{debug, info, warn};

pub const USAGE: &str =
    "Press the space bar to pause or resume the sentry, 'C' to clear the history, or 'Q' to exit.";
pub const RESUMING: &str = "Resuming the sentry.";
pub const PAUSING: &str = "Pausing the sentry.";
pub const ALREADY_PAUSING: &str = "The sentry is pausing.";
pub const STOPPING: &str = "Stopping the sentry.";
pub const CANCELLED: &str = "User cancelled. Stopping the sentry.";
pub const UNEXPECTED_STOP: &str = "The sentry stopped unexpectedly.";

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Operator pressed `Q` (or the keyboard went away)
    Quit,
    /// Interrupt signal
    Cancelled,
    /// The provider terminated on its own
    Aborted,
}

pub struct ControlLoop<P: DeviceProvider, W: Write> {
    provider: P,
    session: Session,
    renderer: Renderer<W>,
    notifications: NotificationReceiver,
    commands: CommandReceiver,
}

impl<P: DeviceProvider, W: Write> ControlLoop<P, W> {
    pub fn new(
        provider: P,
        notifications: NotificationReceiver,
        commands: CommandReceiver,
        renderer: Renderer<W>,
    ) -> Self {
        Self {
            provider,
            session: Session::new(),
            renderer,
            notifications,
            commands,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Start watching and run until quit, interrupt or abort
    ///
    /// `interrupt` resolves when the process receives an interrupt signal.
    pub async fn run<F>(&mut self, interrupt: F) -> Result<Exit>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);

        self.renderer.line(&format!("Starting the sentry. {}", USAGE))?;
        self.resume()?;

        loop {
            // Interrupt first, then pending device notifications, then operator
            // input: a keystroke never overtakes a notification already queued.
            tokio::select! {
                biased;

                _ = &mut interrupt => return self.cancel(),
                notification = self.notifications.recv() => {
                    // A provider that drops its sender mid-run has died.
                    let notification = notification
                        .unwrap_or(Notification::Stopped(FinalStatus::Aborted));
                    if let Some(exit) = self.dispatch(notification)? {
                        return Ok(exit);
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Toggle) => self.toggle()?,
                        Some(Command::Clear) => {
                            self.renderer.clear_screen()?;
                            self.renderer.line(USAGE)?;
                        }
                        Some(Command::Quit) | None => {
                            self.renderer.blank()?;
                            self.renderer.line(STOPPING)?;
                            self.shutdown();
                            return Ok(Exit::Quit);
                        }
                        Some(Command::Interrupt) => return self.cancel(),
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, notification: Notification) -> Result<Option<Exit>> {
        match self.session.handle(notification) {
            Ok(Outcome::Render(block)) => self.renderer.event(&block)?,
            Ok(Outcome::Aborted) => {
                info!("Device provider aborted");
                self.renderer.blank()?;
                self.renderer.line(UNEXPECTED_STOP)?;
                return Ok(Some(Exit::Aborted));
            }
            Ok(_) => {}
            Err(e) => {
                // Already shown to the operator as a diagnostic line.
                debug!("Skipping notification: {}", e);
                self.renderer.diagnostic(&format!("Skipped event: {}", e))?;
            }
        }
        Ok(None)
    }

    fn toggle(&mut self) -> Result<()> {
        match self.session.toggle() {
            Toggle::Resume => {
                self.renderer.line(RESUMING)?;
                self.resume()?;
            }
            Toggle::Pause => {
                self.renderer.line(PAUSING)?;
                self.session.pause()?;
                self.provider.stop().context("Failed to stop device provider")?;
            }
            Toggle::AlreadyPausing => self.renderer.line(ALREADY_PAUSING)?,
            Toggle::Terminated => debug!("Toggle ignored, the watcher has terminated"),
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.session.start()?;
        self.provider
            .start()
            .context("Failed to start device provider")
    }

    fn cancel(&mut self) -> Result<Exit> {
        self.renderer.blank()?;
        self.renderer.line(CANCELLED)?;
        self.shutdown();
        Ok(Exit::Cancelled)
    }

    /// Orderly stop on the way out; failures are logged, not raised
    fn shutdown(&mut self) {
        if let Toggle::Pause = self.session.toggle() {
            if let Err(e) = self.session.pause() {
                warn!("Failed to pause session: {}", e);
            }
        }
        if let Err(e) = self.provider.stop() {
            warn!("Failed to stop device provider: {:#}", e);
        }
        info!("Sentry stopped");
    }
}
