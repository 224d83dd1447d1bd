//! Restack - self-updating redeploy daemon for a compose stack
//!
//! Usage:
//!   restack run       # One update cycle (exit nonzero on failure)
//!   restack daemon    # Polling loop until terminated
//!   restack install   # Register the daemon as a systemd service (root)
//!   restack cleanup   # Stop the daemon and tear down the stack

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restack_core::install::Systemctl;
use restack_core::prelude::*;

#[derive(Parser)]
#[command(name = "restack")]
#[command(about = "Watch a git branch and redeploy a compose stack", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single update cycle
    ///
    /// Exits nonzero if the cycle fails; up-to-date and successful updates
    /// both exit clean.
    Run,

    /// Run the polling daemon until terminated
    Daemon,

    /// Install the daemon as a systemd service with log rotation
    ///
    /// Requires root for the writes under /etc and the systemctl calls.
    Install,

    /// Stop the daemon and tear down the stack
    ///
    /// Best-effort: every step is reported individually and the command
    /// always exits clean. The persistent data volume is left untouched.
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restack=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;

    match cli.command {
        Commands::Run => run_once(&settings).await,
        Commands::Daemon => run_forever(&settings).await,
        Commands::Install => run_install(&settings),
        Commands::Cleanup => run_teardown(&settings),
    }
}

async fn run_once(settings: &Settings) -> Result<()> {
    let source = GitSource::new(&settings.repo_dir);
    let stack = ComposeStack::new(&settings.compose_file);
    let notifier = Notifier::from_settings(settings)?;
    let log = CycleLog::new(Some(settings.updater_log()), true);

    let updater = Updater::new(settings, &source, &stack, &notifier);
    let outcome = updater.run_cycle(&log).await;
    if outcome.is_failed() {
        anyhow::bail!("Update cycle failed");
    }
    Ok(())
}

async fn run_forever(settings: &Settings) -> Result<()> {
    let source = GitSource::new(&settings.repo_dir);
    let stack = ComposeStack::new(&settings.compose_file);
    let notifier = Notifier::from_settings(settings)?;
    let daemon_log = CycleLog::new(Some(settings.daemon_log()), false);
    let cycle_log = CycleLog::new(Some(settings.updater_log()), true);

    let updater = Updater::new(settings, &source, &stack, &notifier);
    let policy = FixedInterval::new(settings.poll_interval);
    run_daemon(&updater, &policy, &daemon_log, &cycle_log).await
}

fn run_install(settings: &Settings) -> Result<()> {
    Installer::new(settings).install()?;
    println!(
        "Installed and started {}",
        style(&settings.unit_name).green()
    );
    Ok(())
}

fn run_teardown(settings: &Settings) -> Result<()> {
    let stack = ComposeStack::new(&settings.compose_file);
    let service = Systemctl::new(&settings.unit_name);
    let log = CycleLog::new(None, true);

    let report = run_cleanup(settings, &stack, &service, &log);
    for step in &report.steps {
        let mark = match step.status {
            StepStatus::Ok => style("ok").green(),
            StepStatus::Skipped => style("skipped").dim(),
            StepStatus::Failed => style("failed").red(),
        };
        println!("  {:<16} {mark}  {}", step.name, step.detail);
    }
    // Always exits clean: converging to the report is the contract.
    println!("Clean. Volume {} preserved.", settings.volume_name);
    Ok(())
}
