use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;

use rttview::config::Args;

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    // The terminal belongs to the view, so diagnostics only go to a file.
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create log file '{}'", path.display()))?;
    let env = std::env::var("RTTVIEW_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let options = match args.into_options() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(2);
        }
    };

    init_tracing(options.log_file.as_deref())?;
    rttview::app::run(options)?;
    Ok(())
}

fn main() {
    if let Err(err) = run(Args::parse()) {
        eprintln!("rttview failed: {:#}", err);
        std::process::exit(1);
    }
}
