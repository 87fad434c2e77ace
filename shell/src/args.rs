use std::fmt::Display;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "bookdesk", version, about = "Terminal client for the auth and books services")]
pub struct Args {
    /// `debug` shows every request and response.
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Settings file to use instead of ~/.bookdesk_config.json.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn log_filter(&self) -> String {
        format!("bookdesk={0},bookdesk_core={0}", self.log_level)
    }
}
