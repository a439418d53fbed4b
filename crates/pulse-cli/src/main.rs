use anyhow::{Context, Result};
use clap::Parser;
use pulse_cli::{init_tracing, run, Cli};
use pulse_core::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling in-flight requests");
            signal_cancel.cancel();
        }
    });

    let report = run(&cli, &cancel).await?;
    for failure in &report.failures {
        eprintln!("failed to fetch {}: {}", failure.issue, failure.error);
    }
    let rendered =
        serde_json::to_string_pretty(&report).context("failed to render pulse report")?;
    println!("{rendered}");
    Ok(())
}
