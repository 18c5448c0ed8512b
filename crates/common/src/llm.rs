//! LLM deep audit
//!
//! The deep audit asks a chat-completion model for qualitative findings the
//! rule engine cannot see (error handling, performance, security, UX, code
//! quality). Model output is untrusted: [`decode_llm_issues`] is the only
//! place raw text is turned into [`AuditIssue`]s, and [`deep_audit`] folds
//! every failure into an empty result.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::types::{
    AuditCategory, AuditIssue, AuditSeverity, FixDescriptor, IssueLocation, PageType,
};

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completion endpoint
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the assistant's text for the conversation
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` client
pub struct HttpChatClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl HttpChatClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self.config.resolve_api_key().ok_or_else(|| {
            Error::Llm("no API key: set llm.api_key or OPENAI_API_KEY".to_string())
        })?;

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("endpoint returned {}: {}", status, body)));
        }

        let result: serde_json::Value = response.json().await?;
        result["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| Error::Llm("response carried no message content".to_string()))
    }
}

/// Failure to turn model output into issues
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no JSON array found in response")]
    NoArray,

    #[error("malformed JSON array: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inputs to the deep-audit prompt
#[derive(Debug, Clone, Copy)]
pub struct DeepAuditInput<'a> {
    pub page_path: &'a str,
    pub source: &'a str,
    pub page_type: PageType,
    pub reference: Option<&'a str>,
    /// Maximum characters of source embedded in the prompt
    pub source_budget: usize,
}

const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Build the user prompt for the deep audit
pub fn build_deep_audit_prompt(input: &DeepAuditInput<'_>) -> String {
    let excerpt = truncate_source(input.source, input.source_budget);
    let reference = input
        .reference
        .map(|r| format!("\nCompliance reference: {}\n", r))
        .unwrap_or_default();

    format!(
        r#"Audit the following page component.

Page: {path}
Page type: {page_type}
{reference}
```tsx
{excerpt}
```

Look for issues in these areas:
1. Error handling (missing error states, unhandled promise rejections)
2. Performance (unnecessary re-renders, missing memoization, large lists)
3. Security (unsanitized input, exposed secrets, unsafe HTML)
4. UX (missing feedback, confusing flows, inaccessible controls)
5. Code quality (dead code, duplicated logic, unclear naming)

Respond with a JSON array only. Each element:
{{"category": "performance|security|accessibility|ui-ux|data-fetching|component-structure", "severity": "critical|error|warning|info", "title": "...", "description": "...", "line": 1, "expected": "...", "actual": "..."}}
Return [] if there is nothing to report."#,
        path = input.page_path,
        page_type = input.page_type,
        reference = reference,
        excerpt = excerpt,
    )
}

fn truncate_source(source: &str, budget: usize) -> String {
    match source.char_indices().nth(budget) {
        Some((cut, _)) => format!("{}{}", &source[..cut], TRUNCATION_MARKER),
        None => source.to_string(),
    }
}

static JSON_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"));

/// Decode model output into issues located in `page_path`.
///
/// Extracts the first bracketed JSON array in `raw` and coerces each object
/// entry with defaults; non-object entries are skipped.
pub fn decode_llm_issues(raw: &str, page_path: &str) -> std::result::Result<Vec<AuditIssue>, DecodeError> {
    let array_text = JSON_ARRAY
        .find(raw)
        .map(|m| m.as_str())
        .ok_or(DecodeError::NoArray)?;
    let entries: Vec<serde_json::Value> = serde_json::from_str(array_text)?;

    Ok(entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| coerce_issue(entry, page_path))
        .collect())
}

fn coerce_issue(entry: &serde_json::Value, page_path: &str) -> AuditIssue {
    let text = |key: &str| entry[key].as_str().unwrap_or_default().to_string();

    let category = entry["category"]
        .as_str()
        .and_then(|c| c.parse::<AuditCategory>().ok())
        .unwrap_or(AuditCategory::ComponentStructure);
    let severity = entry["severity"]
        .as_str()
        .and_then(|s| s.parse::<AuditSeverity>().ok())
        .unwrap_or(AuditSeverity::Warning);
    let title = entry["title"]
        .as_str()
        .filter(|t| !t.is_empty())
        .unwrap_or("AI-detected issue");

    let mut location = IssueLocation::file(page_path);
    location.line = entry["line"].as_u64().and_then(|l| u32::try_from(l).ok());

    let mut issue = AuditIssue::new(category, severity, title, text("description"), location)
        .expecting(text("expected"), text("actual"));

    let fix = serde_json::from_value::<FixDescriptor>(entry["fix"].clone()).ok();
    let fixable = entry["autoFixable"]
        .as_bool()
        .or_else(|| entry["auto_fixable"].as_bool())
        .unwrap_or(false);
    if let (true, Some(fix)) = (fixable, fix) {
        issue = issue.with_fix(fix);
    }
    issue
}

/// Run the deep audit; any failure yields no issues
pub async fn deep_audit(
    client: &dyn ChatClient,
    input: DeepAuditInput<'_>,
    timeout: Duration,
) -> Vec<AuditIssue> {
    let messages = [
        ChatMessage::system(
            "You are a senior frontend reviewer. You answer with JSON arrays only.",
        ),
        ChatMessage::user(build_deep_audit_prompt(&input)),
    ];

    let response = match tokio::time::timeout(timeout, client.complete(&messages)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!("Deep audit unavailable for {}: {}", input.page_path, e);
            return Vec::new();
        }
        Err(_) => {
            warn!(
                "Deep audit for {} timed out after {:?}",
                input.page_path, timeout
            );
            return Vec::new();
        }
    };

    match decode_llm_issues(&response, input.page_path) {
        Ok(issues) => {
            debug!("Deep audit returned {} issue(s)", issues.len());
            issues
        }
        Err(e) => {
            warn!("Discarding deep audit response for {}: {}", input.page_path, e);
            Vec::new()
        }
    }
}
