//! Spec runner tests against a scripted browser driver

use std::collections::HashSet;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use selfheal_common::SelfHealConfig;
use selfheal_e2e::runner::{HEALING_REPORT_FILE, PATTERN_REPORT_FILE, RESULTS_FILE};
use selfheal_e2e::{
    Action, E2eError, E2eResult, HealingStrategy, PageProbe, PatternType, StepDriver,
    TestRunner, TestSpec, TestStatus,
};

/// Page where a fixed set of selectors exists regardless of prior actions
struct StaticPage {
    selectors: Arc<HashSet<String>>,
}

#[async_trait]
impl PageProbe for StaticPage {
    async fn find_by_test_id(&self, test_id: &str, _timeout: Duration) -> E2eResult<bool> {
        Ok(self
            .selectors
            .contains(&format!("[data-testid=\"{}\"]", test_id)))
    }

    async fn find_by_selector(&self, selector: &str, _timeout: Duration) -> E2eResult<bool> {
        Ok(self.selectors.contains(selector))
    }
}

#[derive(Default)]
struct ScriptedDriver {
    selectors: Arc<HashSet<String>>,
    fail_with: Option<String>,
    executed: Mutex<Vec<Vec<Action>>>,
}

#[async_trait]
impl StepDriver for ScriptedDriver {
    fn probe(&self, _prelude: &[Action]) -> Box<dyn PageProbe> {
        Box::new(StaticPage {
            selectors: Arc::clone(&self.selectors),
        })
    }

    async fn execute(&self, actions: &[Action]) -> E2eResult<()> {
        self.executed.lock().unwrap().push(actions.to_vec());
        match &self.fail_with {
            Some(message) => Err(E2eError::Playwright(message.clone())),
            None => Ok(()),
        }
    }
}

fn driver(selectors: &[&str]) -> ScriptedDriver {
    ScriptedDriver {
        selectors: Arc::new(selectors.iter().map(|s| s.to_string()).collect()),
        ..ScriptedDriver::default()
    }
}

const COMPOSE_SPEC: &str = r#"
name: compose-post
tags: [smoke]
steps:
  - action: navigate
    url: /feed
  - action: fill
    target:
      primary_id: post-composer
      fallback_selectors: ['textarea[name=body]']
    value: hello
  - action: click
    target:
      primary_id: button-publish
      ai_suggest: true
  - action: assert
    target: '.post'
    text_contains: hello
"#;

#[tokio::test]
async fn test_run_resolves_targets_before_executing() {
    let driver = Arc::new(driver(&[
        "textarea[name=body]",
        "button:has-text(\"publish\")",
    ]));
    let mut runner = TestRunner::with_driver(SelfHealConfig::default(), driver.clone());
    let spec = TestSpec::from_yaml(COMPOSE_SPEC).unwrap();

    let summary = runner.run_specs(&[spec]).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.healing.fallback, 1);
    assert_eq!(summary.healing.ai, 1);
    assert_eq!(
        summary.outcomes[0].page_url.as_deref(),
        Some("http://127.0.0.1:3000/feed")
    );

    let executed = driver.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0][1],
        Action::Fill {
            selector: "textarea[name=body]".to_string(),
            value: "hello".to_string(),
            clear_first: false,
        }
    );
    assert_eq!(
        executed[0][2],
        Action::Click {
            selector: "button:has-text(\"publish\")".to_string(),
            timeout_ms: 5000,
        }
    );

    let events = runner.healing().events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].strategy, HealingStrategy::Fallback);
    assert_eq!(events[0].test_name.as_deref(), Some("compose-post"));
}

#[tokio::test]
async fn test_unresolved_target_fails_spec_without_executing() {
    let driver = Arc::new(driver(&["textarea[name=body]"]));
    let mut runner = TestRunner::with_driver(SelfHealConfig::default(), driver.clone());
    let spec = TestSpec::from_yaml(COMPOSE_SPEC).unwrap();

    let summary = runner.run_specs(&[spec]).await;

    assert_eq!(summary.failed, 1);
    let error = summary.outcomes[0].error.as_deref().unwrap();
    assert!(error.contains("button-publish"));
    assert!(driver.executed.lock().unwrap().is_empty());
    assert_eq!(summary.healing.failed, 1);
    assert_eq!(
        runner.detector().patterns()[0].pattern_type,
        PatternType::SelectorMissing
    );
}

#[tokio::test]
async fn test_driver_failure_and_skip() {
    let driver = Arc::new(ScriptedDriver {
        fail_with: Some("401 Unauthorized on /api/session".to_string()),
        ..ScriptedDriver::default()
    });
    let mut runner = TestRunner::with_driver(SelfHealConfig::default(), driver);
    let specs = vec![
        TestSpec::from_yaml("name: login\nsteps:\n  - action: navigate\n    url: /login").unwrap(),
        TestSpec::from_yaml("name: wip\nskip: true\nsteps: []").unwrap(),
    ];

    let summary = runner.run_specs(&specs).await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.outcomes[1].status, TestStatus::Skipped);
    assert_eq!(summary.outcomes[1].page_url, None);
    let types: Vec<_> = runner
        .detector()
        .patterns()
        .iter()
        .map(|p| p.pattern_type)
        .collect();
    assert_eq!(types, vec![PatternType::AuthFailure, PatternType::ApiError]);
}

#[tokio::test]
async fn test_run_all_and_write_reports() {
    let dir = TempDir::new().unwrap();
    let specs_dir = dir.path().join("specs");
    fs::create_dir_all(&specs_dir).unwrap();
    fs::write(specs_dir.join("b.yaml"), COMPOSE_SPEC).unwrap();
    fs::write(
        specs_dir.join("a.yml"),
        "name: home\ntags: [smoke]\nsteps:\n  - action: navigate\n    url: /\n",
    )
    .unwrap();
    fs::write(specs_dir.join("notes.txt"), "not a spec").unwrap();

    let mut config = SelfHealConfig::default();
    config.runner.specs_dir = specs_dir;
    config.runner.output_dir = dir.path().join("out");

    let driver = Arc::new(driver(&[
        "[data-testid=\"post-composer\"]",
        "[data-testid=\"button-publish\"]",
    ]));
    let mut runner = TestRunner::with_driver(config, driver);

    let summary = runner.run_all().await.unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.outcomes[0].name, "home");
    assert_eq!(summary.healing.primary, 2);

    let written = runner.write_reports(&summary).unwrap();
    assert_eq!(written.len(), 3);
    for file in [RESULTS_FILE, HEALING_REPORT_FILE, PATTERN_REPORT_FILE] {
        assert!(dir.path().join("out").join(file).exists(), "{} missing", file);
    }

    let single = runner.run_test("home").await.unwrap();
    assert_eq!(single.total, 1);
    assert_eq!(runner.healing().events().len(), 0);

    assert!(matches!(
        runner.run_test("nope").await,
        Err(E2eError::SpecParse(_))
    ));
}
