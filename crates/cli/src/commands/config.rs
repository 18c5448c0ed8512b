//! Config Commands

use std::path::Path;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use selfheal_common::SelfHealConfig;

use crate::output::{print_structured, print_success, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Init(InitArgs),

    /// Show the effective configuration
    Show,
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn execute(cmd: ConfigCommands, path: &Path, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Init(args) => init(path, args.force),
        ConfigCommands::Show => show(path, format),
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    SelfHealConfig::default().save(path)?;
    print_success(&format!("Wrote {}", path.display()));
    Ok(())
}

fn show(path: &Path, format: OutputFormat) -> Result<()> {
    let config = SelfHealConfig::load(path)?;
    if !print_structured(&config, format) {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
