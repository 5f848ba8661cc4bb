//! usersvc CLI - drive the user service from the command line
//!
//! Every invocation plays one request against the user service. The
//! session, the client's cookies and the server-side tokens are kept in a
//! state file between invocations.

mod app;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usersvc_common::Config;

use crate::app::{App, Commands};
use crate::state::ClientState;

#[derive(Parser, Debug)]
#[command(name = "usersvc-cli")]
#[command(about = "usersvc user service CLI")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "USERSVC_CONFIG")]
    config: Option<PathBuf>,

    /// State file carrying the session and cookies between invocations
    #[arg(short, long, default_value = ".usersvc-state.json")]
    state: PathBuf,

    /// Log level, overriding the configured one
    #[arg(long)]
    log_level: Option<String>,

    /// Start with a fresh session, keeping cookies
    #[arg(long)]
    new_session: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut state = ClientState::load(&args.state)?;
    if args.new_session {
        state.drop_session();
    }

    let app = App::new(config, &state)?;
    let ctx = app.request(&state, &args.command)?;
    let result = app.execute(&ctx, &args.command);

    // Persist even on failure: a failed login still rotates the session id
    app.persist(&ctx, &mut state);
    state.save(&args.state)?;

    println!("{}", result?);
    Ok(())
}
