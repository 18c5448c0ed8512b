//! Run Commands
//!
//! Executes YAML specs through Playwright with self-healing locators and
//! writes the run, healing and pattern reports.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use selfheal_common::SelfHealConfig;
use selfheal_e2e::{TestOutcome, TestRunner, TestStatus};

use crate::output::{print_error, print_list, print_structured, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Run only tests matching this tag
    #[arg(short, long, conflicts_with = "name")]
    pub tag: Option<String>,

    /// Run only a specific test by name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Path to test specs directory
    #[arg(short, long)]
    pub specs: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Base URL of the application under test
    #[arg(long)]
    pub base_url: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

#[derive(Serialize)]
struct OutcomeRow<'a>(&'a TestOutcome);

impl TableDisplay for OutcomeRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Test", "Status", "Duration", "Error"]
    }

    fn row(&self) -> Vec<String> {
        let outcome = self.0;
        let status = match outcome.status {
            TestStatus::Passed => "✓ passed".green().to_string(),
            TestStatus::Failed => "✗ failed".red().to_string(),
            TestStatus::Skipped => "- skipped".dimmed().to_string(),
        };
        vec![
            outcome.name.clone(),
            status,
            format!("{} ms", outcome.duration_ms),
            outcome.error.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

pub async fn execute(args: RunArgs, mut config: SelfHealConfig, format: OutputFormat) -> Result<()> {
    if let Some(specs) = args.specs {
        config.runner.specs_dir = specs;
    }
    if let Some(output) = args.output {
        config.runner.output_dir = output;
    }
    if let Some(base_url) = args.base_url {
        config.runner.base_url = base_url;
    }
    if let Some(browser) = args.browser {
        config.runner.browser = browser;
    }
    if args.headed {
        config.runner.headless = false;
    }

    let mut runner = TestRunner::new(config)?;

    let summary = if let Some(name) = &args.name {
        runner.run_test(name).await?
    } else if let Some(tag) = &args.tag {
        runner.run_tagged(tag).await?
    } else {
        runner.run_all().await?
    };

    let written = runner.write_reports(&summary)?;

    if !print_structured(&summary, format) {
        let rows: Vec<OutcomeRow<'_>> = summary.outcomes.iter().map(OutcomeRow).collect();
        print_list(&rows, format);

        let healing = &summary.healing;
        println!();
        println!(
            "Locator: {} lookup(s), {} primary, {} fallback, {} ai, {} failed ({:.1}% resolved)",
            healing.total,
            healing.primary,
            healing.fallback,
            healing.ai,
            healing.failed,
            healing.success_rate * 100.0
        );
        println!();
        print!("{}", runner.detector().report());

        for path in &written {
            println!("  wrote {}", path.display());
        }
    }

    if summary.failed > 0 {
        print_error(&format!("{} of {} test(s) failed", summary.failed, summary.total));
        bail!("test run failed");
    }
    print_success(&format!("{} test(s) passed", summary.passed));
    Ok(())
}
