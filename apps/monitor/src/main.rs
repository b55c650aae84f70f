use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use readiness_core::{catalog::ActionKind, ClientEvent, ReadinessClient, ReadinessHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream, StreamExt};
use tracing::{debug, info, warn};

mod board;
mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long, default_value = "monitor.toml")]
    config: PathBuf,
    #[arg(long)]
    log_filter: Option<String>,
    /// Paint feedbacks in their default styles.
    #[arg(long)]
    color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config);
    if let Some(host) = args.host {
        settings.host = Some(host);
    }
    if let Some(port) = args.port {
        settings.port = Some(port);
    }
    if let Some(filter) = args.log_filter {
        settings.log_filter = filter;
    }
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let Some((host, port)) = settings.endpoint() else {
        warn!("monitor: host or port not configured");
        return Ok(());
    };

    info!(%host, port, "monitor: connecting");
    let (client, writer) = ReadinessClient::connect(&host, port)
        .await
        .with_context(|| format!("failed to reach checklist app at {host}:{port}"))?;

    let result = run(&client, args.color).await;
    client.disconnect().await;
    writer.abort();
    result
}

async fn run(client: &ReadinessClient, colour: bool) -> Result<()> {
    let model = client.model();
    let mut events = BroadcastStream::new(client.subscribe_events());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("monitor: interrupted");
                return Ok(());
            }
            event = events.next() => match event {
                Some(Ok(ClientEvent::Disconnected { reason })) => {
                    warn!(%reason, "monitor: connection closed");
                    return Ok(());
                }
                Some(Ok(ClientEvent::Error(message))) => warn!(%message, "monitor: client error"),
                Some(Ok(ClientEvent::Connected)) => info!("monitor: connected"),
                Some(Ok(_)) => print!("{}", board::render(&model.snapshot(), colour)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    debug!(skipped, "monitor: fell behind on events");
                    print!("{}", board::render(&model.snapshot(), colour));
                }
                None => return Ok(()),
            },
            line = lines.next_line(), if stdin_open => match line.context("failed to read stdin")? {
                Some(line) => run_command(client, &line).await,
                None => stdin_open = false,
            },
        }
    }
}

/// `<action> [argument]`, e.g. `toggle 3` or `reset_all`.
async fn run_command(client: &ReadinessClient, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let (name, argument) = match line.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, Some(argument)),
        None => (line, None),
    };

    let Some(kind) = ActionKind::from_id(name) else {
        let known: Vec<&str> = ActionKind::ALL.iter().map(|kind| kind.id()).collect();
        warn!(action = name, known = ?known, "monitor: unknown action");
        return;
    };
    match kind.command(argument) {
        // Failures are already logged and broadcast by the client.
        Ok(command) => {
            let _ = client.send_command(command).await;
        }
        Err(err) => warn!(action = name, %err, "monitor: invalid action"),
    }
}
