//! Playwright browser automation
//!
//! Steps are compiled into a standalone Node script and executed with
//! `node`. Element probes replay the actions run so far and then wait for
//! the candidate selector, so the locator sees the page in the state the
//! next step would.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use selfheal_common::{LocatorConfig, SelfHealConfig};

use crate::error::{E2eError, E2eResult};
use crate::locator::PageProbe;
use crate::spec::WaitState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Playwright(format!("unknown browser: {}", other))),
        }
    }
}

/// A step with its element reference already resolved to a selector
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate {
        url: String,
        wait_for_selector: Option<String>,
    },
    Click {
        selector: String,
        timeout_ms: u64,
    },
    Fill {
        selector: String,
        value: String,
        clear_first: bool,
    },
    Wait {
        selector: String,
        timeout_ms: u64,
        state: WaitState,
    },
    Assert {
        selector: String,
        visible: Option<bool>,
        text: Option<String>,
        text_contains: Option<String>,
        count: Option<usize>,
    },
    Sleep {
        ms: u64,
    },
    Log {
        message: String,
    },
}

impl Action {
    /// Short label used in generated script comments
    pub fn label(&self) -> String {
        match self {
            Action::Navigate { url, .. } => format!("navigate:{}", url),
            Action::Click { selector, .. } => format!("click:{}", selector),
            Action::Fill { selector, .. } => format!("fill:{}", selector),
            Action::Wait { selector, .. } => format!("wait:{}", selector),
            Action::Assert { selector, .. } => format!("assert:{}", selector),
            Action::Sleep { ms } => format!("sleep:{}ms", ms),
            Action::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    /// Attribute the primary locator tier matches on
    pub test_id_attribute: String,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            test_id_attribute: LocatorConfig::default().test_id_attribute,
        }
    }
}

impl PlaywrightConfig {
    pub fn from_config(config: &SelfHealConfig) -> E2eResult<Self> {
        Ok(Self {
            base_url: config.runner.base_url.clone(),
            screenshot_dir: config.runner.output_dir.join("screenshots"),
            browser: config.runner.browser.parse()?,
            headless: config.runner.headless,
            test_id_attribute: config.locator.test_id_attribute.clone(),
            ..Self::default()
        })
    }
}

/// Playwright browser handle
#[derive(Debug, Clone)]
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

#[derive(Deserialize)]
struct ProbeReply {
    found: bool,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        Ok(Self { config })
    }

    /// Handle that skips the installation check, for script generation only
    pub fn offline(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Probe that sees the page after `prelude` has run
    pub fn page_probe(&self, prelude: &[Action]) -> PlaywrightProbe {
        PlaywrightProbe {
            handle: self.clone(),
            prelude: prelude.to_vec(),
        }
    }

    fn header(&self) -> String {
        format!(
            r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const {{ expect }} = require('@playwright/test');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            base_url = js_str(&self.config.base_url),
        )
    }

    fn push_actions(&self, script: &mut String, actions: &[Action]) {
        for (i, action) in actions.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, action.label()));
            script.push_str(&action_to_js(action));
            script.push('\n');
        }
    }

    /// Build the Playwright script for a sequence of actions
    pub fn build_script(&self, actions: &[Action]) -> String {
        let mut script = self.header();
        self.push_actions(&mut script, actions);

        script.push_str(
            r#"
    console.log(JSON.stringify({ success: true }));
  } catch (error) {
    console.error(JSON.stringify({ success: false, error: error.message }));
    process.exit(1);
  } finally {
    await browser.close();
  }
})();
"#,
        );
        script
    }

    /// Build a script that replays `prelude` and reports whether `selector` appears
    pub fn build_probe_script(&self, prelude: &[Action], selector: &str, timeout: Duration) -> String {
        let mut script = self.header();
        self.push_actions(&mut script, prelude);

        script.push_str(&format!(
            r#"
    let found = true;
    try {{
      await page.waitForSelector({selector}, {{ state: 'attached', timeout: {timeout} }});
    }} catch (probeError) {{
      if (probeError.name !== 'TimeoutError') throw probeError;
      found = false;
    }}
    console.log(JSON.stringify({{ found }}));
  }} catch (error) {{
    console.error(JSON.stringify({{ success: false, error: error.message }}));
    process.exit(1);
  }} finally {{
    await browser.close();
  }}
}})();
"#,
            selector = js_str(selector),
            timeout = timeout.as_millis(),
        ));
        script
    }

    /// Execute a script with node and return its stdout
    pub async fn run_script(&self, script: &str) -> E2eResult<String> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("test.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        Ok(stdout)
    }

    /// Run a full action sequence in one browser session
    pub async fn run_actions(&self, actions: &[Action]) -> E2eResult<()> {
        let script = self.build_script(actions);
        self.run_script(&script).await.map(|_| ())
    }
}

/// [`PageProbe`] backed by a fresh Playwright session per lookup
#[derive(Debug, Clone)]
pub struct PlaywrightProbe {
    handle: PlaywrightHandle,
    prelude: Vec<Action>,
}

impl PlaywrightProbe {
    async fn wait_for(&self, selector: &str, timeout: Duration) -> E2eResult<bool> {
        let script = self.handle.build_probe_script(&self.prelude, selector, timeout);
        let stdout = self.handle.run_script(&script).await?;

        let reply = stdout
            .lines()
            .rev()
            .find_map(|line| serde_json::from_str::<ProbeReply>(line).ok())
            .ok_or_else(|| {
                E2eError::Playwright(format!("no probe result in output: {}", stdout.trim()))
            })?;
        Ok(reply.found)
    }
}

#[async_trait]
impl PageProbe for PlaywrightProbe {
    async fn find_by_test_id(&self, test_id: &str, timeout: Duration) -> E2eResult<bool> {
        let selector = format!(
            "[{}=\"{}\"]",
            self.handle.config.test_id_attribute, test_id
        );
        self.wait_for(&selector, timeout).await
    }

    async fn find_by_selector(&self, selector: &str, timeout: Duration) -> E2eResult<bool> {
        self.wait_for(selector, timeout).await
    }
}

/// JavaScript string literal for `value`
fn js_str(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn action_to_js(action: &Action) -> String {
    match action {
        Action::Navigate {
            url,
            wait_for_selector,
        } => {
            let wait = wait_for_selector
                .as_ref()
                .map(|s| format!("\n    await page.waitForSelector({});", js_str(s)))
                .unwrap_or_default();
            format!("    await page.goto(baseUrl + {});{}", js_str(url), wait)
        }
        Action::Click {
            selector,
            timeout_ms,
        } => format!(
            "    await page.click({}, {{ timeout: {} }});",
            js_str(selector),
            timeout_ms
        ),
        Action::Fill {
            selector,
            value,
            clear_first,
        } => {
            let fill = format!("    await page.fill({}, {});", js_str(selector), js_str(value));
            if *clear_first {
                format!("    await page.fill({}, '');\n{}", js_str(selector), fill)
            } else {
                fill
            }
        }
        Action::Wait {
            selector,
            timeout_ms,
            state,
        } => format!(
            "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
            js_str(selector),
            state.as_str(),
            timeout_ms
        ),
        Action::Assert {
            selector,
            visible,
            text,
            text_contains,
            count,
        } => {
            let locator = format!("page.locator({})", js_str(selector));
            let mut assertions = Vec::new();

            match visible {
                Some(true) => {
                    assertions.push(format!("    await expect({}).toBeVisible();", locator))
                }
                Some(false) => {
                    assertions.push(format!("    await expect({}).toBeHidden();", locator))
                }
                None => {}
            }
            if let Some(t) = text {
                assertions.push(format!(
                    "    await expect({}).toHaveText({});",
                    locator,
                    js_str(t)
                ));
            }
            if let Some(t) = text_contains {
                assertions.push(format!(
                    "    await expect({}).toContainText({});",
                    locator,
                    js_str(t)
                ));
            }
            if let Some(c) = count {
                assertions.push(format!("    await expect({}).toHaveCount({});", locator, c));
            }
            if assertions.is_empty() {
                assertions.push(format!("    await expect({}).toBeVisible();", locator));
            }
            assertions.join("\n")
        }
        Action::Sleep { ms } => format!("    await page.waitForTimeout({});", ms),
        Action::Log { message } => format!("    console.log('[TEST] ' + {});", js_str(message)),
    }
}
