//! shipwright entry point.

mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shipwright_deploy::{Deployer, check_host};
use shipwright_ssh::with_session;
use shipwright_uploader::TransportError;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload the project, write the env file and start containers.
    Deploy,
    /// Run read-only diagnostics to see if the host can take a deploy.
    Check,
}

fn main() -> anyhow::Result<ExitCode> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?cli.command,
        "starting shipwright"
    );

    let config = Config::load(&cli.config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let ok = match cli.command {
        Command::Deploy => rt.block_on(deploy(config))?,
        Command::Check => rt.block_on(check(config))?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn deploy(config: Config) -> anyhow::Result<bool> {
    config.validate_deploy()?;
    let plan = config.deploy_plan();
    let ssh = config.deploy_ssh();

    let (events_tx, events_rx) = mpsc::channel(256);
    let printer = tokio::spawn(output::print_deploy_events(events_rx));

    let result = with_session(&ssh, move |transport| {
        Box::pin(async move {
            let outcome = Deployer::new(transport).run(&plan, &events_tx).await;
            drop(events_tx);
            outcome
        })
    })
    .await;

    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "event printer task failed");
    }

    let outcome = result?;
    output::print_deploy_summary(&outcome);
    Ok(outcome.is_success())
}

async fn check(config: Config) -> anyhow::Result<bool> {
    config.validate_ssh()?;
    let sections = config.check_sections();

    let result = with_session(&config.ssh, move |transport| {
        Box::pin(async move { Ok::<_, TransportError>(check_host(transport, &sections).await) })
    })
    .await;

    match result {
        Ok(report) => {
            output::print_check_report(&report);
            let failed = report.failed_commands().len();
            if failed > 0 {
                println!("\n{failed} check command(s) reported a failure");
            }
            println!("\nOK: {} is reachable", config.ssh);
            Ok(report.reachable)
        }
        Err(e) => {
            eprintln!("{} is not reachable: {e}", config.ssh);
            Ok(false)
        }
    }
}
