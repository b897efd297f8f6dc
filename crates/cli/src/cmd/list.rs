//! List the devices currently present

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sentry_cli::{Renderer, SentryConfig};
use sentry_core::describe;
use sentry_watcher::sysfs;
use sentry_watcher::{EventBlock, EventKind};

pub fn run(config: &SentryConfig) -> Result<()> {
    let records = sysfs::scan(&config.provider).context("Failed to enumerate devices")?;

    let mut renderer = Renderer::new(std::io::stdout(), config.display.color);

    for record in &records {
        let block = EventBlock {
            kind: EventKind::Added,
            name: record.name.clone(),
            rows: describe(record),
        };
        renderer.event(&block)?;
    }

    let summary = format!(
        "{} devices under {}",
        records.len(),
        config.provider.root.display()
    );
    if config.display.color {
        println!("{}", summary.dimmed());
    } else {
        println!("{}", summary);
    }

    Ok(())
}
