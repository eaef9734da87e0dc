use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use token_distributor::args::Args;
use token_distributor::batch::load_batch;
use token_distributor::config::Config;
use token_distributor::context::RunContext;
use token_distributor::dispatch::run_batch;
use token_distributor::ledger;
use token_distributor::sender::http_provider;
use token_distributor::types::{LoopState, Mode};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Usage errors exit here, before any file or network access
    let args = Args::parse();
    let kind = args.kind();
    info!("distribute {} token", kind);

    let config = Config::load(&args.config, kind)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let rows = load_batch(&args.receivers)
        .with_context(|| format!("fatal error in file {:?}", args.receivers))?;
    info!("Loaded {} payouts from {:?}", rows.len(), args.receivers);

    let cancel = CancellationToken::new();
    let ctx = RunContext::new(&config, kind, args.mode(), cancel.clone())
        .context("Failed to prepare run")?;
    let provider = http_provider(&config.rpc, config.rpc_timeout())
        .context("Failed to create RPC provider")?;

    if ctx.mode == Mode::DryRun {
        info!("test mode: transactions are signed but not sent, add --send to broadcast");
    }

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received shutdown signal, stopping after the current payout...");
            cancel.cancel();
        }
    });

    let report = run_batch(&rows, &ctx, &provider).await;
    ledger::persist(&report.results, &ledger::ledger_path(&args.receivers));

    // Display results
    println!("\n{:-^80}", " RESULTS SUMMARY ");
    println!(
        "{:<5} {:<10} {:<44} {:<10} {:<8}",
        "No.", "Status", "Address", "Value", "Nonce"
    );
    println!("{:-^80}", "");
    for (i, result) in report.results.iter().enumerate() {
        println!(
            "{:<5} {:<10} {:<44} {:<10} {:<8}",
            i + 1,
            if result.success { "SENT" } else { "FAILED" },
            result.address,
            result.amount,
            result.nonce
        );
        if let Some(reference) = &result.reference {
            println!("      {}", reference);
        }
    }

    println!("\n{:-^80}", " STATISTICS ");
    println!("Total payouts: {}", rows.len());
    println!("Dispatched: {}", report.succeeded().count());
    println!("Not attempted: {}", rows.len() - report.results.len());
    println!(
        "Outcome: {}",
        match report.state {
            LoopState::Completed => "completed",
            LoopState::HaltedOnError => "halted on error",
            LoopState::Cancelled => "cancelled",
            LoopState::Running => "running",
        }
    );

    info!("Run Completed!");
    Ok(())
}
