//! Self-healing element resolution
//!
//! A [`LocatorSpec`] names a UI element by its stable test identifier and
//! carries an ordered list of backup selectors. [`SelfHealingLocator`] tries,
//! in order:
//!
//! 1. the test identifier itself,
//! 2. each fallback selector (first match wins),
//! 3. a selector guessed from the identifier, when `ai_suggest` is set.
//!
//! Every resolution appends exactly one [`HealingEvent`] to the run-scoped
//! [`HealingContext`], so a run can report which elements only resolved
//! through a backup tier.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use selfheal_common::LocatorConfig;

use crate::error::{E2eError, E2eResult};

/// Symbolic description of a UI target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSpec {
    /// Stable test identifier (`data-testid` value)
    pub primary_id: String,

    /// Backup selectors, tried in order
    #[serde(default, alias = "fallbacks")]
    pub fallback_selectors: Vec<String>,

    /// Guess a selector from the identifier when everything else misses
    #[serde(default)]
    pub ai_suggest: bool,

    /// Overrides the primary and AI tier timeouts
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Free-text hint recorded with the healing event
    #[serde(default)]
    pub context: Option<String>,
}

impl LocatorSpec {
    pub fn new(primary_id: impl Into<String>) -> Self {
        Self {
            primary_id: primary_id.into(),
            fallback_selectors: Vec::new(),
            ai_suggest: false,
            timeout_ms: None,
            context: None,
        }
    }

    pub fn with_fallback(mut self, selector: impl Into<String>) -> Self {
        self.fallback_selectors.push(selector.into());
        self
    }

    pub fn with_fallbacks<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_selectors
            .extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn with_ai_suggest(mut self, enabled: bool) -> Self {
        self.ai_suggest = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Number of tiers a full miss walks through
    pub fn attempt_count(&self) -> usize {
        1 + self.fallback_selectors.len() + usize::from(self.ai_suggest)
    }
}

/// Tier that resolved (or failed to resolve) an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealingStrategy {
    Primary,
    Fallback,
    Ai,
    Failed,
}

impl HealingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealingStrategy::Primary => "primary",
            HealingStrategy::Fallback => "fallback",
            HealingStrategy::Ai => "ai",
            HealingStrategy::Failed => "failed",
        }
    }
}

impl fmt::Display for HealingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealingStrategy {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(HealingStrategy::Primary),
            "fallback" => Ok(HealingStrategy::Fallback),
            "ai" => Ok(HealingStrategy::Ai),
            "failed" => Ok(HealingStrategy::Failed),
            other => Err(E2eError::SpecParse(format!(
                "unknown healing strategy: {}",
                other
            ))),
        }
    }
}

/// One recorded resolution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingEvent {
    pub timestamp: DateTime<Utc>,
    pub identifier: String,
    pub strategy: HealingStrategy,
    /// Selector that matched, empty on failure
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
}

/// Aggregate view over a healing event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocatorStats {
    pub total: usize,
    pub primary: usize,
    pub fallback: usize,
    pub ai: usize,
    pub failed: usize,
    pub success_rate: f64,
}

impl LocatorStats {
    pub fn from_events(events: &[HealingEvent]) -> Self {
        let mut stats = Self {
            total: events.len(),
            ..Self::default()
        };

        for event in events {
            match event.strategy {
                HealingStrategy::Primary => stats.primary += 1,
                HealingStrategy::Fallback => stats.fallback += 1,
                HealingStrategy::Ai => stats.ai += 1,
                HealingStrategy::Failed => stats.failed += 1,
            }
        }

        if stats.total > 0 {
            stats.success_rate = (stats.total - stats.failed) as f64 / stats.total as f64;
        }
        stats
    }

    /// Resolutions that needed a backup tier
    pub fn healed(&self) -> usize {
        self.fallback + self.ai
    }
}

#[derive(Serialize)]
struct HealingReport<'a> {
    generated_at: DateTime<Utc>,
    stats: LocatorStats,
    events: &'a [HealingEvent],
}

/// Run-scoped healing state: the event log plus the current test and page
#[derive(Debug, Clone, Default)]
pub struct HealingContext {
    events: Vec<HealingEvent>,
    test_name: Option<String>,
    page_url: Option<String>,
}

impl HealingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_test_name(&mut self, name: impl Into<String>) {
        self.test_name = Some(name.into());
    }

    /// Switch to a new test, forgetting the previous test's page
    pub fn begin_test(&mut self, name: impl Into<String>) {
        self.test_name = Some(name.into());
        self.page_url = None;
    }

    pub fn set_page_url(&mut self, url: impl Into<String>) {
        self.page_url = Some(url.into());
    }

    pub fn test_name(&self) -> Option<&str> {
        self.test_name.as_deref()
    }

    pub fn page_url(&self) -> Option<&str> {
        self.page_url.as_deref()
    }

    pub fn events(&self) -> &[HealingEvent] {
        &self.events
    }

    pub fn stats(&self) -> LocatorStats {
        LocatorStats::from_events(&self.events)
    }

    /// Clear the log and the current test/page for a new run
    pub fn reset(&mut self) {
        self.events.clear();
        self.test_name = None;
        self.page_url = None;
    }

    /// Write `{generated_at, stats, events}` as pretty JSON
    pub fn write_report(&self, path: &Path) -> E2eResult<()> {
        let report = HealingReport {
            generated_at: Utc::now(),
            stats: self.stats(),
            events: &self.events,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;

        info!("Healing report written to: {}", path.display());
        Ok(())
    }

    fn record(
        &mut self,
        spec: &LocatorSpec,
        strategy: HealingStrategy,
        selector: &str,
        fallback_index: Option<usize>,
    ) {
        self.events.push(HealingEvent {
            timestamp: Utc::now(),
            identifier: spec.primary_id.clone(),
            strategy,
            selector: selector.to_string(),
            fallback_index,
            context: spec.context.clone(),
            page_url: self.page_url.clone(),
            test_name: self.test_name.clone(),
        });
    }
}

/// Element lookups against a live page
#[async_trait]
pub trait PageProbe: Send + Sync {
    /// Whether an element with the given test identifier appears in time
    async fn find_by_test_id(&self, test_id: &str, timeout: Duration) -> E2eResult<bool>;

    /// Whether an element matching the selector appears in time
    async fn find_by_selector(&self, selector: &str, timeout: Duration) -> E2eResult<bool>;
}

/// A resolved element reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    /// Concrete selector usable by the driver
    pub selector: String,
    pub strategy: HealingStrategy,
    pub fallback_index: Option<usize>,
}

impl ElementHandle {
    pub fn healed(&self) -> bool {
        matches!(
            self.strategy,
            HealingStrategy::Fallback | HealingStrategy::Ai
        )
    }
}

/// Three-tier element resolver
#[derive(Debug, Clone, Default)]
pub struct SelfHealingLocator {
    config: LocatorConfig,
}

impl SelfHealingLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Selector for an element carrying the given test identifier
    pub fn test_id_selector(&self, test_id: &str) -> String {
        format!("[{}=\"{}\"]", self.config.test_id_attribute, test_id)
    }

    /// Resolve `spec` on `page`, recording the outcome in `ctx`
    pub async fn resolve(
        &self,
        page: &dyn PageProbe,
        spec: &LocatorSpec,
        ctx: &mut HealingContext,
    ) -> E2eResult<ElementHandle> {
        let primary_timeout =
            Duration::from_millis(spec.timeout_ms.unwrap_or(self.config.primary_timeout_ms));
        let fallback_timeout = Duration::from_millis(self.config.fallback_timeout_ms);
        let ai_timeout =
            Duration::from_millis(spec.timeout_ms.unwrap_or(self.config.ai_timeout_ms));

        if probe(page.find_by_test_id(&spec.primary_id, primary_timeout).await, &spec.primary_id) {
            let selector = self.test_id_selector(&spec.primary_id);
            ctx.record(spec, HealingStrategy::Primary, &selector, None);
            return Ok(ElementHandle {
                selector,
                strategy: HealingStrategy::Primary,
                fallback_index: None,
            });
        }

        for (index, selector) in spec.fallback_selectors.iter().enumerate() {
            if probe(page.find_by_selector(selector, fallback_timeout).await, selector) {
                info!(
                    "Healed '{}' with fallback #{}: {}",
                    spec.primary_id, index, selector
                );
                ctx.record(spec, HealingStrategy::Fallback, selector, Some(index));
                return Ok(ElementHandle {
                    selector: selector.clone(),
                    strategy: HealingStrategy::Fallback,
                    fallback_index: Some(index),
                });
            }
        }

        if spec.ai_suggest {
            let selector = suggest_selector(&spec.primary_id, &self.config.test_id_attribute);
            if probe(page.find_by_selector(&selector, ai_timeout).await, &selector) {
                info!("Healed '{}' with suggested selector: {}", spec.primary_id, selector);
                ctx.record(spec, HealingStrategy::Ai, &selector, None);
                return Ok(ElementHandle {
                    selector,
                    strategy: HealingStrategy::Ai,
                    fallback_index: None,
                });
            }
        }

        let attempts = spec.attempt_count();
        warn!(
            "Could not resolve '{}' after {} strategies",
            spec.primary_id, attempts
        );
        ctx.record(spec, HealingStrategy::Failed, "", None);
        Err(E2eError::ElementNotFound {
            identifier: spec.primary_id.clone(),
            attempts,
        })
    }
}

fn probe(result: E2eResult<bool>, target: &str) -> bool {
    match result {
        Ok(found) => found,
        Err(e) => {
            debug!("Probe for '{}' failed: {}", target, e);
            false
        }
    }
}

/// Guess a selector from a `kind-some-words` identifier
///
/// `button-save-draft` becomes `button:has-text("save draft")`. Identifiers
/// with an unknown kind or no text part fall back to a partial match on
/// `test_id_attribute`.
pub fn suggest_selector(identifier: &str, test_id_attribute: &str) -> String {
    let (kind, rest) = identifier.split_once('-').unwrap_or((identifier, ""));
    let target = rest.replace('-', " ");

    if target.is_empty() {
        return format!("[{}*=\"{}\"]", test_id_attribute, identifier);
    }

    match kind {
        "button" => format!("button:has-text(\"{}\")", target),
        "input" => format!("input[placeholder*=\"{}\" i]", target),
        "link" => format!("a:has-text(\"{}\")", target),
        "card" => format!("[class*=\"card\"]:has-text(\"{}\")", target),
        "text" => format!("text={}", target),
        _ => format!("[{}*=\"{}\"]", test_id_attribute, identifier),
    }
}
