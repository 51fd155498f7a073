use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{load_settings, ControllerEvent, HttpBlogApi, SessionController};
use tokio::{
    io::{stdin, AsyncBufReadExt, BufReader},
    sync::broadcast::{error::RecvError, Receiver},
};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::{dispatch, parse_line, Flow, HELP};
use display::{render_notice, render_view};

#[derive(Parser, Debug)]
#[command(about = "Terminal client for the blog backend")]
struct Args {
    /// Overrides the configured server url.
    #[arg(long)]
    server_url: Option<String>,
    /// Config file; defaults to ./blog_client.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(server_url) = &args.server_url {
        settings.set_server_url(server_url, "--server-url");
    }
    let api = HttpBlogApi::new(&settings)
        .with_context(|| format!("failed to build client for {}", settings.server_url))?;
    tracing::info!(server_url = %api.base_url(), "starting blog client");

    let controller = SessionController::new(Arc::new(api), settings.event_buffer);
    let printer = tokio::spawn(print_events(controller.subscribe()));

    controller.initialize().await;
    println!("{HELP}");

    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{}", err.render());
                continue;
            }
        };
        if dispatch(&controller, command).await == Flow::Quit {
            break;
        }
    }

    drop(controller);
    let _ = printer.await;
    Ok(())
}

async fn print_events(mut events: Receiver<ControllerEvent>) {
    loop {
        match events.recv().await {
            Ok(ControllerEvent::Rendered(view)) => println!("{}", render_view(&view)),
            Ok(ControllerEvent::Notice(notice)) => println!("{}", render_notice(&notice)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "display fell behind; older views dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
