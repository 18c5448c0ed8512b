//! Pattern Commands
//!
//! Feeds a JSON file of test outcomes through the pattern detector.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use selfheal_common::SelfHealConfig;
use selfheal_e2e::{OutcomeSummary, Pattern, PatternDetector, RunSummary, TestOutcome};

use crate::output::{print_list, print_structured, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct PatternsArgs {
    /// Outcome file: a JSON array of outcomes or a `selfheal run` results file
    pub results: PathBuf,

    /// Also write the JSON pattern report here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Accepted shapes of the outcome file
#[derive(Deserialize)]
#[serde(untagged)]
enum OutcomeFile {
    Outcomes(Vec<TestOutcome>),
    Run(RunSummary),
}

#[derive(Serialize)]
struct PatternsOutput<'a> {
    summary: OutcomeSummary,
    patterns: &'a [Pattern],
}

impl TableDisplay for Pattern {
    fn headers() -> Vec<&'static str> {
        vec!["Pattern", "Severity", "Count", "Examples", "Remediation"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            format!("{} {}", self.severity.icon(), self.pattern_type),
            self.severity.as_str().to_string(),
            self.count.to_string(),
            self.affected_tests
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
            self.remediation.clone(),
        ]
    }
}

/// Read outcomes from either accepted file shape
pub fn load_outcomes(path: &Path) -> Result<Vec<TestOutcome>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: OutcomeFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not an outcome list or run summary", path.display()))?;

    Ok(match file {
        OutcomeFile::Outcomes(outcomes) => outcomes,
        OutcomeFile::Run(summary) => summary.outcomes,
    })
}

pub fn execute(args: PatternsArgs, config: &SelfHealConfig, format: OutputFormat) -> Result<()> {
    let mut detector = PatternDetector::new(config.patterns.clone());
    detector.add_outcomes(load_outcomes(&args.results)?);

    if let Some(path) = &args.output {
        detector.write_report(path)?;
    }

    let output = PatternsOutput {
        summary: detector.summary(),
        patterns: detector.patterns(),
    };
    if print_structured(&output, format) {
        return Ok(());
    }

    match format {
        OutputFormat::Plain => print!("{}", detector.report()),
        _ => {
            let summary = detector.summary();
            println!(
                "{} outcome(s): {} passed, {} failed, {} skipped ({:.1}% pass rate)",
                summary.total, summary.passed, summary.failed, summary.skipped, summary.pass_rate
            );
            if detector.patterns().is_empty() {
                print_success("No failure patterns detected");
            } else {
                print_list(detector.patterns(), format);
            }
        }
    }

    if let Some(path) = &args.output {
        print_success(&format!("Pattern report written to {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_plain_outcome_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outcomes.json");
        fs::write(
            &path,
            r#"[{"name": "login", "status": "failed", "error": "401"}]"#,
        )
        .unwrap();

        let outcomes = load_outcomes(&path).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "login");
    }

    #[test]
    fn test_load_run_summary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test-results.json");
        fs::write(
            &path,
            r#"{
                "total": 1, "passed": 1, "failed": 0, "skipped": 0, "duration_ms": 12,
                "healing": {"total": 0, "primary": 0, "fallback": 0, "ai": 0, "failed": 0, "success_rate": 0.0},
                "outcomes": [{"name": "home", "status": "passed", "duration_ms": 12}]
            }"#,
        )
        .unwrap();

        let outcomes = load_outcomes(&path).unwrap();
        assert_eq!(outcomes[0].name, "home");
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"hello": "world"}"#).unwrap();
        assert!(load_outcomes(&path).is_err());
        assert!(load_outcomes(&dir.path().join("missing.json")).is_err());
    }
}
