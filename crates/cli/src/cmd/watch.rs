//! Watch devices interactively

use anyhow::Result;
use sentry_cli::control::{ControlLoop, Exit};
use sentry_cli::keys::{self, KeyReader, RawMode};
use sentry_cli::{Renderer, SentryConfig};
use sentry_watcher::{provider, SysfsProvider};
use tracing::warn;

pub async fn run(config: SentryConfig) -> Result<Exit> {
    let (tx, notifications) = provider::channel();
    let provider = SysfsProvider::new(config.provider.clone(), tx);

    let raw_mode = RawMode::enable();
    let renderer = Renderer::new(std::io::stdout(), config.display.color)
        .raw_mode(raw_mode.is_some());

    let (command_tx, commands) = keys::channel();
    let reader = KeyReader::spawn(command_tx);

    let mut control = ControlLoop::new(provider, notifications, commands, renderer);
    let exit = control
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for interrupt signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    reader.stop();
    drop(raw_mode);
    exit
}
