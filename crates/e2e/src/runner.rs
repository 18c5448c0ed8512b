//! Test runner that resolves targets through the self-healing locator,
//! drives Playwright, and feeds outcomes to the pattern detector

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use selfheal_common::SelfHealConfig;

use crate::error::{E2eError, E2eResult};
use crate::locator::{HealingContext, LocatorStats, PageProbe, SelfHealingLocator};
use crate::patterns::{PatternDetector, TestOutcome, TestStatus};
use crate::playwright::{Action, PlaywrightConfig, PlaywrightHandle};
use crate::spec::{Target, TestSpec, TestStep};

pub const RESULTS_FILE: &str = "test-results.json";
pub const HEALING_REPORT_FILE: &str = "healing-report.json";
pub const PATTERN_REPORT_FILE: &str = "pattern-report.json";

/// Browser backend used by the runner
#[async_trait]
pub trait StepDriver: Send + Sync {
    /// Probe for the page state after `prelude` has run
    fn probe(&self, prelude: &[Action]) -> Box<dyn PageProbe>;

    /// Execute the actions in one browser session
    async fn execute(&self, actions: &[Action]) -> E2eResult<()>;
}

#[async_trait]
impl StepDriver for PlaywrightHandle {
    fn probe(&self, prelude: &[Action]) -> Box<dyn PageProbe> {
        Box::new(self.page_probe(prelude))
    }

    async fn execute(&self, actions: &[Action]) -> E2eResult<()> {
        self.run_actions(actions).await
    }
}

/// Result of running a set of specs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub healing: LocatorStats,
    pub outcomes: Vec<TestOutcome>,
}

/// Main E2E test runner
pub struct TestRunner {
    driver: Arc<dyn StepDriver>,
    locator: SelfHealingLocator,
    healing: HealingContext,
    detector: PatternDetector,
    config: SelfHealConfig,
}

impl TestRunner {
    /// Runner backed by a local Playwright installation
    pub fn new(config: SelfHealConfig) -> E2eResult<Self> {
        let handle = PlaywrightHandle::new(PlaywrightConfig::from_config(&config)?)?;
        Ok(Self::with_driver(config, Arc::new(handle)))
    }

    pub fn with_driver(config: SelfHealConfig, driver: Arc<dyn StepDriver>) -> Self {
        Self {
            driver,
            locator: SelfHealingLocator::new(config.locator.clone()),
            healing: HealingContext::new(),
            detector: PatternDetector::new(config.patterns.clone()),
            config,
        }
    }

    pub fn healing(&self) -> &HealingContext {
        &self.healing
    }

    pub fn detector(&self) -> &PatternDetector {
        &self.detector
    }

    /// Run all tests in the specs directory
    pub async fn run_all(&mut self) -> E2eResult<RunSummary> {
        let specs = TestSpec::load_all(&self.config.runner.specs_dir)?;
        Ok(self.run_specs(&specs).await)
    }

    /// Run tests matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<RunSummary> {
        let specs = TestSpec::load_all(&self.config.runner.specs_dir)?;
        let filtered: Vec<TestSpec> = TestSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        Ok(self.run_specs(&filtered).await)
    }

    /// Run a specific test by name
    pub async fn run_test(&mut self, name: &str) -> E2eResult<RunSummary> {
        let specs = TestSpec::load_all(&self.config.runner.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        Ok(self.run_specs(std::slice::from_ref(&spec)).await)
    }

    /// Run a list of specs as one run, starting from a clean healing log
    pub async fn run_specs(&mut self, specs: &[TestSpec]) -> RunSummary {
        let start = Instant::now();
        self.healing.reset();
        self.detector = PatternDetector::new(self.config.patterns.clone());

        info!("Running {} test(s)...", specs.len());

        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            let outcome = self.run_spec(spec).await;
            match outcome.status {
                TestStatus::Passed => info!("✓ {} ({} ms)", outcome.name, outcome.duration_ms),
                TestStatus::Failed => error!(
                    "✗ {} - {}",
                    outcome.name,
                    outcome.error.as_deref().unwrap_or("unknown error")
                ),
                TestStatus::Skipped => info!("- {} (skipped)", outcome.name),
            }
            self.detector.add_outcome(outcome.clone());
            outcomes.push(outcome);
        }

        let count = |status: TestStatus| outcomes.iter().filter(|o| o.status == status).count();
        let summary = RunSummary {
            total: outcomes.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
            duration_ms: start.elapsed().as_millis() as u64,
            healing: self.healing.stats(),
            outcomes,
        };

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            summary.passed, summary.failed, summary.skipped, summary.duration_ms
        );
        if summary.healing.healed() > 0 {
            info!(
                "{} element(s) resolved through a backup strategy",
                summary.healing.healed()
            );
        }

        summary
    }

    /// Run a single spec; every failure becomes a failed outcome
    pub async fn run_spec(&mut self, spec: &TestSpec) -> TestOutcome {
        if spec.skip {
            return TestOutcome::skipped(&spec.name);
        }

        let start = Instant::now();
        debug!("Running test: {}", spec.name);
        self.healing.begin_test(&spec.name);

        let result = self.execute_spec(spec).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(()) => TestOutcome::passed(&spec.name, duration_ms),
            Err(e) => TestOutcome::failed(&spec.name, duration_ms, e.to_string()),
        };
        match self.healing.page_url() {
            Some(url) => outcome.with_page_url(url),
            None => outcome,
        }
    }

    async fn execute_spec(&mut self, spec: &TestSpec) -> E2eResult<()> {
        let mut actions = Vec::with_capacity(spec.steps.len());

        for step in &spec.steps {
            let action = match step {
                TestStep::Navigate {
                    url,
                    wait_for_selector,
                } => {
                    self.healing
                        .set_page_url(format!("{}{}", self.config.runner.base_url, url));
                    Action::Navigate {
                        url: url.clone(),
                        wait_for_selector: wait_for_selector.clone(),
                    }
                }
                TestStep::Click { target, timeout_ms } => Action::Click {
                    selector: self.resolve(target, &actions).await?,
                    timeout_ms: timeout_ms.unwrap_or(5000),
                },
                TestStep::Fill {
                    target,
                    value,
                    clear_first,
                } => Action::Fill {
                    selector: self.resolve(target, &actions).await?,
                    value: value.clone(),
                    clear_first: *clear_first,
                },
                TestStep::Wait {
                    target,
                    timeout_ms,
                    state,
                } => Action::Wait {
                    selector: self.resolve(target, &actions).await?,
                    timeout_ms: *timeout_ms,
                    state: *state,
                },
                TestStep::Assert {
                    target,
                    visible,
                    text,
                    text_contains,
                    count,
                } => Action::Assert {
                    selector: self.resolve(target, &actions).await?,
                    visible: *visible,
                    text: text.clone(),
                    text_contains: text_contains.clone(),
                    count: *count,
                },
                TestStep::Sleep { ms } => Action::Sleep { ms: *ms },
                TestStep::Log { message } => {
                    info!("[TEST LOG] {}", message);
                    Action::Log {
                        message: message.clone(),
                    }
                }
            };
            actions.push(action);
        }

        self.driver.execute(&actions).await
    }

    /// Raw selectors are used as given; locator targets go through healing
    async fn resolve(&mut self, target: &Target, prelude: &[Action]) -> E2eResult<String> {
        match target {
            Target::Selector(selector) => Ok(selector.clone()),
            Target::Locator(spec) => {
                let probe = self.driver.probe(prelude);
                let handle = self
                    .locator
                    .resolve(probe.as_ref(), spec, &mut self.healing)
                    .await?;
                Ok(handle.selector)
            }
        }
    }

    /// Write run results plus healing and pattern reports to the output directory
    pub fn write_reports(&self, summary: &RunSummary) -> E2eResult<Vec<PathBuf>> {
        self.write_reports_to(&self.config.runner.output_dir, summary)
    }

    pub fn write_reports_to(&self, dir: &Path, summary: &RunSummary) -> E2eResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let results = dir.join(RESULTS_FILE);
        std::fs::write(&results, serde_json::to_string_pretty(summary)?)?;
        info!("Results written to: {}", results.display());

        let healing = dir.join(HEALING_REPORT_FILE);
        self.healing.write_report(&healing)?;

        let patterns = dir.join(PATTERN_REPORT_FILE);
        self.detector.write_report(&patterns)?;

        Ok(vec![results, healing, patterns])
    }
}
