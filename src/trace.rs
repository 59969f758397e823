use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "loopsync=info";

/// Where log lines go
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    /// Drop everything (the TUI owns the terminal)
    Off,
}

pub fn setup(target: LogTarget<'_>) -> Result<()> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let filter = EnvFilter::builder().parse_lossy(directives);

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_target(false)
                .with_ansi(false)
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::Off => {}
    }

    Ok(())
}
