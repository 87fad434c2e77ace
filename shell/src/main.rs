//! Interactive terminal client for the auth and books services.

mod app;
mod args;
mod command;
mod indicator;
mod table;
mod worker;

use std::io::Write;

use anyhow::Context;
use bookdesk_core::SettingsStore;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::app::{App, Flow};
use crate::args::Args;
use crate::command::parse_line;

const PROMPT: &str = "bookdesk> ";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_filter()))
        .with_writer(std::io::stderr)
        .init();

    let store = match args.config {
        Some(path) => SettingsStore::at(path),
        None => SettingsStore::new(),
    };
    let mut app = App::new(store, std::io::stdout());

    println!("type `help` for commands, `quit` to leave");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("reading stdin")? else {
            break;
        };
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                // Help output is also delivered as an error.
                e.print()?;
                continue;
            }
        };
        match app.handle(command).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("error: {e:#}"),
        }
    }
    Ok(())
}
