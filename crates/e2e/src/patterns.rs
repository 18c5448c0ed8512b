//! Failure pattern detection over test-run history

use std::fmt;
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use selfheal_common::PatternThresholds;

use crate::error::E2eResult;

const REPORT_WIDTH: usize = 60;
const MAX_EXAMPLES: usize = 3;

static AUTH_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:401|unauthori[sz]ed|authentication)\b").expect("valid auth regex")
});

// Prefix match so `TimeoutError` and `timeouts` count.
static TIMEOUT_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btime(?:d )?out").expect("valid timeout regex"));

static SELECTOR_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\belement not found\b|\bdata-testid\b").expect("valid selector regex")
});

static API_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:500|api|fetch failed)\b").expect("valid api regex")
});

static THEME_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:theme|colou?r|dark[ -]mode|light[ -]mode)").expect("valid theme regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

/// One test's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
}

impl TestOutcome {
    pub fn passed(name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            duration_ms,
            error: None,
            screenshot: None,
            page_url: None,
        }
    }

    pub fn failed(name: impl Into<String>, duration_ms: u64, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            status: TestStatus::Failed,
            ..Self::passed(name, duration_ms)
        }
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Skipped,
            ..Self::passed(name, 0)
        }
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn with_screenshot(mut self, path: impl Into<String>) -> Self {
        self.screenshot = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    AuthFailure,
    Timeout,
    SelectorMissing,
    ApiError,
    ThemeMismatch,
}

impl PatternType {
    /// Detection and report order
    pub const ALL: [PatternType; 5] = [
        PatternType::AuthFailure,
        PatternType::Timeout,
        PatternType::SelectorMissing,
        PatternType::ApiError,
        PatternType::ThemeMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::AuthFailure => "auth_failure",
            PatternType::Timeout => "timeout",
            PatternType::SelectorMissing => "selector_missing",
            PatternType::ApiError => "api_error",
            PatternType::ThemeMismatch => "theme_mismatch",
        }
    }

    pub fn severity(&self) -> PatternSeverity {
        match self {
            PatternType::AuthFailure | PatternType::ApiError => PatternSeverity::Critical,
            PatternType::Timeout => PatternSeverity::High,
            PatternType::SelectorMissing | PatternType::ThemeMismatch => PatternSeverity::Medium,
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            PatternType::AuthFailure => {
                "Check session configuration, the auth secret, and test-user credentials"
            }
            PatternType::Timeout => {
                "Raise timeouts, check for slow network requests, and prefer explicit waits"
            }
            PatternType::SelectorMissing => {
                "Add data-testid attributes and resolve elements through the self-healing locator"
            }
            PatternType::ApiError => "Check API routes, database connectivity, and server logs",
            PatternType::ThemeMismatch => {
                "Verify theme variables and theme-aware component styles"
            }
        }
    }

    /// Case-insensitive whole-word matcher for this pattern's failure tokens
    fn token_pattern(&self) -> &'static Regex {
        match self {
            PatternType::AuthFailure => &AUTH_TOKENS,
            PatternType::Timeout => &TIMEOUT_TOKENS,
            PatternType::SelectorMissing => &SELECTOR_TOKENS,
            PatternType::ApiError => &API_TOKENS,
            PatternType::ThemeMismatch => &THEME_TOKENS,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl PatternSeverity {
    pub fn icon(&self) -> &'static str {
        match self {
            PatternSeverity::Critical => "🔴",
            PatternSeverity::High => "🟠",
            PatternSeverity::Medium => "🟡",
            PatternSeverity::Low => "🟢",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternSeverity::Critical => "critical",
            PatternSeverity::High => "high",
            PatternSeverity::Medium => "medium",
            PatternSeverity::Low => "low",
        }
    }
}

/// A recurring failure class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub pattern_type: PatternType,
    pub severity: PatternSeverity,
    pub count: usize,
    pub affected_tests: Vec<String>,
    pub remediation: String,
}

/// Outcome totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Percentage of passed outcomes
    pub pass_rate: f64,
}

#[derive(Serialize)]
struct PatternReport<'a> {
    generated_at: DateTime<Utc>,
    summary: OutcomeSummary,
    patterns: &'a [Pattern],
    outcomes: &'a [TestOutcome],
}

/// Accumulates outcomes and keeps the pattern set current
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    thresholds: PatternThresholds,
    outcomes: Vec<TestOutcome>,
    patterns: Vec<Pattern>,
}

impl PatternDetector {
    pub fn new(thresholds: PatternThresholds) -> Self {
        Self {
            thresholds,
            outcomes: Vec::new(),
            patterns: Vec::new(),
        }
    }

    /// Record an outcome and recompute every pattern
    pub fn add_outcome(&mut self, outcome: TestOutcome) {
        self.outcomes.push(outcome);
        self.patterns = self.detect();
    }

    pub fn add_outcomes(&mut self, outcomes: impl IntoIterator<Item = TestOutcome>) {
        self.outcomes.extend(outcomes);
        self.patterns = self.detect();
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn summary(&self) -> OutcomeSummary {
        let count = |status: TestStatus| self.outcomes.iter().filter(|o| o.status == status).count();
        let total = self.outcomes.len();
        let passed = count(TestStatus::Passed);

        OutcomeSummary {
            total,
            passed,
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            pass_rate: if total == 0 {
                0.0
            } else {
                passed as f64 * 100.0 / total as f64
            },
        }
    }

    fn detect(&self) -> Vec<Pattern> {
        PatternType::ALL
            .iter()
            .filter_map(|&pattern_type| {
                let affected: Vec<String> = self
                    .outcomes
                    .iter()
                    .filter(|o| self.matches(pattern_type, o))
                    .map(|o| o.name.clone())
                    .collect();

                let triggered = match pattern_type {
                    PatternType::Timeout => affected.len() > self.thresholds.timeout_count_above,
                    _ => affected.len() >= self.thresholds.min_matches,
                };

                triggered.then(|| Pattern {
                    pattern_type,
                    severity: pattern_type.severity(),
                    count: affected.len(),
                    affected_tests: affected,
                    remediation: pattern_type.remediation().to_string(),
                })
            })
            .collect()
    }

    fn matches(&self, pattern_type: PatternType, outcome: &TestOutcome) -> bool {
        let tokens = pattern_type.token_pattern();
        let in_error = outcome
            .error
            .as_deref()
            .is_some_and(|error| tokens.is_match(error));

        match pattern_type {
            PatternType::Timeout => in_error || outcome.duration_ms > self.thresholds.slow_test_ms,
            PatternType::ThemeMismatch => in_error || tokens.is_match(&outcome.name),
            _ => in_error,
        }
    }

    /// Fixed-width text summary
    pub fn report(&self) -> String {
        let summary = self.summary();
        let rule = "=".repeat(REPORT_WIDTH);
        let thin = "-".repeat(REPORT_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:^width$}", "TEST FAILURE PATTERN REPORT", width = REPORT_WIDTH);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Total:     {}", summary.total);
        let _ = writeln!(out, "Passed:    {}", summary.passed);
        let _ = writeln!(out, "Failed:    {}", summary.failed);
        let _ = writeln!(out, "Skipped:   {}", summary.skipped);
        let _ = writeln!(out, "Pass rate: {:.1}%", summary.pass_rate);
        let _ = writeln!(out, "{}", thin);

        if self.patterns.is_empty() {
            let _ = writeln!(out, "No failure patterns detected");
        } else {
            for pattern in &self.patterns {
                let _ = writeln!(
                    out,
                    "{} {} ({})",
                    pattern.severity.icon(),
                    pattern.pattern_type,
                    pattern.severity.as_str()
                );
                let _ = writeln!(out, "   Affected tests: {}", pattern.count);
                let _ = writeln!(out, "   Fix: {}", pattern.remediation);
                for name in pattern.affected_tests.iter().take(MAX_EXAMPLES) {
                    let _ = writeln!(out, "   - {}", name);
                }
                if pattern.affected_tests.len() > MAX_EXAMPLES {
                    let _ = writeln!(
                        out,
                        "   ... and {} more",
                        pattern.affected_tests.len() - MAX_EXAMPLES
                    );
                }
                let _ = writeln!(out);
            }
        }
        let _ = writeln!(out, "{}", rule);
        out
    }

    /// Write `{generated_at, summary, patterns, outcomes}` as pretty JSON
    pub fn write_report(&self, path: &Path) -> E2eResult<()> {
        let report = PatternReport {
            generated_at: Utc::now(),
            summary: self.summary(),
            patterns: &self.patterns,
            outcomes: &self.outcomes,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;

        info!("Pattern report written to: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PatternDetector {
        PatternDetector::new(PatternThresholds::default())
    }

    fn types(detector: &PatternDetector) -> Vec<PatternType> {
        detector.patterns().iter().map(|p| p.pattern_type).collect()
    }

    #[test]
    fn test_passing_outcome_matches_on_name_and_duration() {
        let mut d = detector();
        d.add_outcome(TestOutcome::passed("dark mode toggle", 45_000));
        assert_eq!(types(&d), vec![PatternType::ThemeMismatch]);
        assert_eq!(d.summary().pass_rate, 100.0);
    }

    #[test]
    fn test_tokens_match_whole_words() {
        let mut d = detector();
        d.add_outcome(TestOutcome::failed("composer", 10, "expected capitalized heading"));
        d.add_outcome(TestOutcome::failed("upload", 10, "payload of 5000 bytes rejected"));
        d.add_outcome(TestOutcome::failed("chart", 10, "rapid clicks dropped"));
        assert!(d.patterns().is_empty());

        d.add_outcome(TestOutcome::failed("posts", 10, "API returned 500"));
        assert_eq!(types(&d), vec![PatternType::ApiError]);
    }

    #[test]
    fn test_timeout_error_class_counts() {
        let mut d = PatternDetector::new(PatternThresholds {
            timeout_count_above: 0,
            ..PatternThresholds::default()
        });
        d.add_outcome(TestOutcome::failed("feed", 10, "TimeoutError: locator.click"));
        assert_eq!(types(&d), vec![PatternType::Timeout]);
    }

    #[test]
    fn test_case_insensitive_tokens() {
        let mut d = detector();
        d.add_outcome(TestOutcome::failed("login", 10, "Unauthorized"));
        d.add_outcome(TestOutcome::failed("feed", 10, "Element Not Found: feed-list"));
        let types: Vec<_> = d.patterns().iter().map(|p| p.pattern_type).collect();
        assert_eq!(types, vec![PatternType::AuthFailure, PatternType::SelectorMissing]);
    }

    #[test]
    fn test_theme_matches_test_name() {
        let mut d = detector();
        d.add_outcome(TestOutcome::failed("light mode header", 10, "expected visible"));
        assert_eq!(d.patterns()[0].pattern_type, PatternType::ThemeMismatch);
        assert_eq!(d.patterns()[0].severity, PatternSeverity::Medium);
    }

    #[test]
    fn test_empty_report() {
        let report = detector().report();
        assert!(report.contains("No failure patterns detected"));
        assert!(report.contains("Pass rate: 0.0%"));
        assert!(report.lines().all(|l| l.chars().count() <= REPORT_WIDTH));
    }
}
