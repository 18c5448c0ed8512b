//! SelfHeal E2E Framework
//!
//! This crate provides the browser-facing half of SelfHeal:
//! - Resolves element references with a tiered self-healing locator
//! - Controls Playwright via generated Node scripts
//! - Parses declarative YAML test specs
//! - Detects recurring failure patterns across a run
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── resolve(target) -> SelfHealingLocator -> selector    │
//! │    ├── execute(actions) -> StepDriver (Playwright)          │
//! │    ├── run_spec(spec) -> TestOutcome                        │
//! │    └── write_reports() -> results, healing, patterns        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SelfHealingLocator                                         │
//! │    primary data-testid -> fallbacks -> suggested selector   │
//! │    every attempt -> HealingEvent in HealingContext          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PatternDetector                                            │
//! │    add_outcome -> recompute auth / timeout / selector /     │
//! │    api / theme patterns -> text + JSON report               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod locator;
pub mod patterns;
pub mod playwright;
pub mod runner;
pub mod spec;

pub use error::{E2eError, E2eResult};
pub use locator::{
    suggest_selector, ElementHandle, HealingContext, HealingEvent, HealingStrategy, LocatorSpec,
    LocatorStats, PageProbe, SelfHealingLocator,
};
pub use patterns::{
    OutcomeSummary, Pattern, PatternDetector, PatternSeverity, PatternType, TestOutcome,
    TestStatus,
};
pub use playwright::{Action, PlaywrightConfig, PlaywrightHandle, PlaywrightProbe};
pub use runner::{RunSummary, StepDriver, TestRunner};
pub use spec::{Target, TestSpec, TestStep};
