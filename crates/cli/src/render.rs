//! Terminal rendering of device events and status lines

use chrono::{DateTime, Local};
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use owo_colors::{OwoColorize, Style};
use sentry_core::FieldDiff;
use sentry_watcher::{EventBlock, EventKind};
use std::io::{self, Write};

/// Leading glyph of every event line
const BAR: &str = "\u{2588}";
/// Separator between old and new values
const ARROW: &str = "\u{2192}";

mod palette {
    use owo_colors::Style;

    pub fn added() -> Style {
        Style::new().green()
    }
    pub fn updated() -> Style {
        Style::new().yellow()
    }
    pub fn removed() -> Style {
        Style::new().red()
    }
    pub fn timestamp() -> Style {
        Style::new().magenta()
    }
    pub fn label() -> Style {
        Style::new().cyan()
    }
    pub fn old_value() -> Style {
        Style::new().red()
    }
    pub fn new_value() -> Style {
        Style::new().green()
    }
    pub fn diagnostic() -> Style {
        Style::new().dimmed()
    }
}

/// Format an event timestamp ("3/7/26 2:5:9 PM")
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%-m/%-d/%y %-I:%-M:%-S %p").to_string()
}

/// Writes sentry output to a terminal (or any writer)
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
    newline: &'static str,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            newline: "\n",
        }
    }

    /// Terminate lines with CRLF (needed while the terminal is in raw mode)
    pub fn raw_mode(mut self, raw: bool) -> Self {
        self.newline = if raw { "\r\n" } else { "\n" };
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print one line of plain text
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}{}", text, self.newline)?;
        self.out.flush()
    }

    pub fn blank(&mut self) -> io::Result<()> {
        self.line("")
    }

    /// Print a de-emphasized diagnostic line
    pub fn diagnostic(&mut self, text: &str) -> io::Result<()> {
        let text = self.paint(text, palette::diagnostic());
        self.line(&text)
    }

    /// Clear the screen and the scrollback, cursor to the top-left corner
    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), Clear(ClearType::Purge), MoveTo(0, 0))?;
        self.out.flush()
    }

    /// Render an event stamped with the current local time
    pub fn event(&mut self, block: &EventBlock) -> io::Result<()> {
        self.event_at(block, &Local::now())
    }

    /// Render an event: header, one row per field, blank line
    pub fn event_at(&mut self, block: &EventBlock, at: &DateTime<Local>) -> io::Result<()> {
        let style = match block.kind {
            EventKind::Added => palette::added(),
            EventKind::Updated => palette::updated(),
            EventKind::Removed => palette::removed(),
        };

        let header = format!(
            "{} ({}) {} - {}",
            BAR,
            self.paint(&format_timestamp(at), palette::timestamp()),
            self.paint(block.kind.label(), style),
            block.name
        );
        write!(self.out, "{}{}", header, self.newline)?;

        for row in &block.rows {
            let row = self.format_row(row);
            write!(self.out, "{}{}", row, self.newline)?;
        }

        write!(self.out, "{}", self.newline)?;
        self.out.flush()
    }

    fn format_row(&self, row: &FieldDiff) -> String {
        let label = self.paint(&row.label, palette::label());
        if row.is_changed() {
            format!(
                "{} {}: {} {} {}",
                BAR,
                label,
                self.paint(&row.old, palette::old_value()),
                ARROW,
                self.paint(&row.new, palette::new_value())
            )
        } else {
            format!("{} {}: {}", BAR, label, row.new)
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }
}
