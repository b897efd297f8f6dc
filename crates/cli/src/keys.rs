//! Operator keystrokes: a single background reader feeding a command channel
//!
//! Exactly one task reads the terminal, so a read abandoned by the control
//! loop can never race a newer one; commands simply queue in the channel.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Pause or resume the watcher (space bar)
    Toggle,
    /// Exit (`Q`)
    Quit,
    /// Clear the visible output (`C`)
    Clear,
    /// Ctrl+C delivered as a keystroke while in raw mode
    Interrupt,
}

pub type CommandSender = mpsc::UnboundedSender<Command>;
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

pub fn channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Map a key press to a command
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::Interrupt),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char(' ') => Some(Command::Toggle),
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(Command::Clear),
        _ => None,
    }
}

/// Background keyboard reader, stopped when dropped
pub struct KeyReader {
    cancel: CancellationToken,
}

impl KeyReader {
    /// Spawn the reader task; commands are sent to `tx`
    pub fn spawn(tx: CommandSender) -> Self {
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut events = EventStream::new();

            loop {
                let event = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    event = events.next() => event,
                };

                let key = match event {
                    Some(Ok(Event::Key(key))) => key,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("Keyboard read failed: {}", e);
                        break;
                    }
                    None => break,
                };

                if let Some(command) = command_for(&key) {
                    debug!("Key {:?} -> {:?}", key.code, command);
                    if tx.send(command).is_err() {
                        break;
                    }
                }
            }
        });

        Self { cancel }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Raw terminal mode for the guard's lifetime
///
/// Keys arrive one at a time without echo; Ctrl+C arrives as a key.
pub struct RawMode {
    _private: (),
}

impl RawMode {
    /// Enable raw mode; `None` when stdin is not a terminal
    pub fn enable() -> Option<Self> {
        match terminal::enable_raw_mode() {
            Ok(()) => Some(Self { _private: () }),
            Err(e) => {
                debug!("Raw mode unavailable: {}", e);
                None
            }
        }
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_command_mapping() {
        let none = KeyModifiers::NONE;
        assert_eq!(command_for(&press(KeyCode::Char(' '), none)), Some(Command::Toggle));
        assert_eq!(command_for(&press(KeyCode::Char('q'), none)), Some(Command::Quit));
        assert_eq!(
            command_for(&press(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            Some(Command::Quit)
        );
        assert_eq!(command_for(&press(KeyCode::Char('c'), none)), Some(Command::Clear));
        assert_eq!(command_for(&press(KeyCode::Char('x'), none)), None);
        assert_eq!(command_for(&press(KeyCode::Enter, none)), None);
    }

    #[test]
    fn test_ctrl_c_is_interrupt() {
        assert_eq!(
            command_for(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Interrupt)
        );
        assert_eq!(
            command_for(&press(KeyCode::Char('q'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn test_release_is_ignored() {
        let mut key = press(KeyCode::Char(' '), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(command_for(&key), None);
    }
}
