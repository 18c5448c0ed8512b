//! SelfHeal CLI - Main Entry Point
//!
//! Audits pages, runs self-healing E2E specs, and analyses failure
//! patterns in test results.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use selfheal_common::SelfHealConfig;

mod commands;
mod output;

use commands::{audit, config, patterns, run};

/// SelfHeal CLI - self-healing tests and page audits
#[derive(Parser)]
#[command(name = "selfheal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(
        long,
        env = "SELFHEAL_CONFIG",
        default_value = "selfheal.toml",
        global = true
    )]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a page source file
    Audit(audit::AuditArgs),

    /// Detect failure patterns in a test outcome file
    Patterns(patterns::PatternsArgs),

    /// Run YAML specs with self-healing locators
    Run(run::RunArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Audit(args) => {
            audit::execute(args, &SelfHealConfig::load(&cli.config)?, cli.format).await?
        }
        Commands::Patterns(args) => {
            patterns::execute(args, &SelfHealConfig::load(&cli.config)?, cli.format)?
        }
        Commands::Run(args) => {
            run::execute(args, SelfHealConfig::load(&cli.config)?, cli.format).await?
        }
        Commands::Config(cmd) => config::execute(cmd, &cli.config, cli.format)?,
        Commands::Version => {
            println!("SelfHeal CLI v{}", selfheal_common::VERSION);
        }
    }

    Ok(())
}
