//! SelfHeal configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level configuration, usually read from `selfheal.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfHealConfig {
    /// Self-healing locator timeouts
    pub locator: LocatorConfig,

    /// Failure pattern thresholds
    pub patterns: PatternThresholds,

    /// Page audit settings
    pub audit: AuditConfig,

    /// Chat-completion endpoint used by the deep audit
    pub llm: LlmConfig,

    /// Spec runner settings
    pub runner: RunnerSettings,
}

/// Per-tier timeouts for element resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub primary_timeout_ms: u64,
    pub fallback_timeout_ms: u64,
    pub ai_timeout_ms: u64,
    /// Attribute carrying the stable test identifier
    pub test_id_attribute: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            primary_timeout_ms: 2000,
            fallback_timeout_ms: 1000,
            ai_timeout_ms: 2000,
            test_id_attribute: "data-testid".to_string(),
        }
    }
}

/// Thresholds for failure pattern detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternThresholds {
    /// Duration above which a test counts as a timeout
    pub slow_test_ms: u64,
    /// Timeout pattern needs strictly more matches than this
    pub timeout_count_above: usize,
    /// Minimum matches for every other pattern
    pub min_matches: usize,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            slow_test_ms: 30_000,
            timeout_count_above: 3,
            min_matches: 1,
        }
    }
}

/// Page audit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Root the derived e2e test paths are resolved against
    pub project_root: PathBuf,
    /// Directory (relative to the root) holding e2e specs
    pub e2e_dir: String,
    /// Characters of page source embedded in the deep-audit prompt
    pub prompt_source_chars: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            e2e_dir: "e2e".to_string(),
            prompt_source_chars: 3000,
        }
    }
}

/// Chat-completion endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Falls back to `OPENAI_API_KEY` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            timeout_secs: 30,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured key, or the environment fallback
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

/// Spec runner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Base URL of the application under test
    pub base_url: String,
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
    /// chromium, firefox or webkit
    pub browser: String,
    pub headless: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            specs_dir: PathBuf::from("tests/e2e/specs"),
            output_dir: PathBuf::from("test-results"),
            browser: "chromium".to_string(),
            headless: true,
        }
    }
}

impl SelfHealConfig {
    /// Load configuration from file, defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.locator.test_id_attribute.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "locator.test_id_attribute must not be empty".to_string(),
            ));
        }
        if self.patterns.min_matches == 0 {
            return Err(Error::InvalidConfig(
                "patterns.min_matches must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::InvalidConfig(format!(
                "llm.temperature out of range: {}",
                self.llm.temperature
            )));
        }
        Ok(())
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        PathBuf::from("selfheal.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_preserve_thresholds() {
        let config = SelfHealConfig::default();
        assert_eq!(config.locator.primary_timeout_ms, 2000);
        assert_eq!(config.locator.fallback_timeout_ms, 1000);
        assert_eq!(config.patterns.slow_test_ms, 30_000);
        assert_eq!(config.patterns.timeout_count_above, 3);
        assert_eq!(config.audit.prompt_source_chars, 3000);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SelfHealConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SelfHealConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/selfheal.toml");

        let mut config = SelfHealConfig::default();
        config.patterns.timeout_count_above = 5;
        config.runner.base_url = "http://localhost:4000".to_string();
        config.save(&path).unwrap();

        let loaded = SelfHealConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfheal.toml");
        std::fs::write(&path, "[locator]\nprimary_timeout_ms = 500\n").unwrap();

        let config = SelfHealConfig::load(&path).unwrap();
        assert_eq!(config.locator.primary_timeout_ms, 500);
        assert_eq!(config.locator.fallback_timeout_ms, 1000);
        assert_eq!(config.llm.max_tokens, 2000);
    }

    #[test]
    fn test_validate_rejects_zero_min_matches() {
        let mut config = SelfHealConfig::default();
        config.patterns.min_matches = 0;
        assert!(config.validate().is_err());
    }
}
