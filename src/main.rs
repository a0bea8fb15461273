//! gh-profile-stats: generate a self-updating GitHub profile README.
//!
//! A single-entry-point binary (no subcommands, per §6): reads configuration
//! from the environment and two flags, runs the fetch-and-aggregate
//! pipeline, renders charts, rewrites the README's tagged regions, and —
//! unless `--dry-run` is set — commits and pushes the result.

use clap::Parser;
use gh_profile_stats::config::{Args, Config};
use gh_profile_stats::workflow;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_directive = Config::resolve_log_directive(std::env::var("LOG_LEVEL").ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_directive))
        .init();

    let config = Config::from_env_and_args(args)?;

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    if let Err(e) = workflow::run(config, cancel).await {
        error!(error = %e, kind = ?e.kind(), "run failed");
        return Err(e.into());
    }

    Ok(())
}
