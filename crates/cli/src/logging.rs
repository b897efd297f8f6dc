//! Tracing subscriber setup
//!
//! The terminal belongs to the event trail, so logs go to stderr (quiet by
//! default) or to a file when one is given.

use anyhow::{Context, Result};
use crossterm::terminal;
use std::io::{self, Write};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber
///
/// Returns the appender guard when logging to a file; keep it alive until
/// exit so buffered lines are flushed.
pub fn init(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;

            std::fs::create_dir_all(dir).context("Failed to create log directory")?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(terminal_stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

            Ok(None)
        }
    }
}

/// Stderr for one log event, matching the terminal's current line discipline
fn terminal_stderr() -> LineEndings<io::Stderr> {
    LineEndings {
        out: io::stderr(),
        raw: terminal::is_raw_mode_enabled().unwrap_or(false),
    }
}

/// Writer that ends lines with CRLF while the terminal is in raw mode
///
/// Raw mode disables output post-processing, so a bare `\n` moves down a
/// line without returning to column 0.
struct LineEndings<W: Write> {
    out: W,
    raw: bool,
}

impl<W: Write> Write for LineEndings<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.raw {
            return self.out.write(buf);
        }
        for (i, chunk) in buf.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                self.out.write_all(b"\r\n")?;
            }
            self.out.write_all(chunk)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(raw: bool, text: &str) -> String {
        let mut writer = LineEndings {
            out: Vec::new(),
            raw,
        };
        writer.write_all(text.as_bytes()).unwrap();
        String::from_utf8(writer.out).unwrap()
    }

    #[test]
    fn test_raw_mode_log_lines_return_to_column_zero() {
        assert_eq!(
            written(true, "WARN rescan failed\nWARN again\n"),
            "WARN rescan failed\r\nWARN again\r\n"
        );
        assert_eq!(written(true, "no newline"), "no newline");
    }

    #[test]
    fn test_cooked_mode_passes_through() {
        assert_eq!(written(false, "WARN a\nWARN b\n"), "WARN a\nWARN b\n");
    }
}
