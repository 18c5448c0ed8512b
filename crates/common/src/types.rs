//! Core audit types for SelfHeal

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Audit finding category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditCategory {
    ComponentStructure,
    DataFetching,
    Forms,
    UiUx,
    Routing,
    ApiIntegration,
    Database,
    Testing,
    Documentation,
    Performance,
    Security,
    Accessibility,
}

impl AuditCategory {
    /// Categories that have built-in rule checks, in execution order
    pub const BUILT_IN: [AuditCategory; 6] = [
        AuditCategory::ComponentStructure,
        AuditCategory::DataFetching,
        AuditCategory::Forms,
        AuditCategory::UiUx,
        AuditCategory::Testing,
        AuditCategory::Accessibility,
    ];

    pub const ALL: [AuditCategory; 12] = [
        AuditCategory::ComponentStructure,
        AuditCategory::DataFetching,
        AuditCategory::Forms,
        AuditCategory::UiUx,
        AuditCategory::Routing,
        AuditCategory::ApiIntegration,
        AuditCategory::Database,
        AuditCategory::Testing,
        AuditCategory::Documentation,
        AuditCategory::Performance,
        AuditCategory::Security,
        AuditCategory::Accessibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::ComponentStructure => "component-structure",
            AuditCategory::DataFetching => "data-fetching",
            AuditCategory::Forms => "forms",
            AuditCategory::UiUx => "ui-ux",
            AuditCategory::Routing => "routing",
            AuditCategory::ApiIntegration => "api-integration",
            AuditCategory::Database => "database",
            AuditCategory::Testing => "testing",
            AuditCategory::Documentation => "documentation",
            AuditCategory::Performance => "performance",
            AuditCategory::Security => "security",
            AuditCategory::Accessibility => "accessibility",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::invalid("category", s))
    }
}

/// Which categories an audit should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(AuditCategory),
}

impl CategoryFilter {
    pub fn includes(&self, category: AuditCategory) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(CategoryFilter::All)
        } else {
            s.parse().map(CategoryFilter::Only)
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(c) => c.fmt(f),
        }
    }
}

/// Audit finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSeverity::Info => "info",
            AuditSeverity::Warning => "warning",
            AuditSeverity::Error => "error",
            AuditSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditSeverity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(AuditSeverity::Info),
            "warning" => Ok(AuditSeverity::Warning),
            "error" => Ok(AuditSeverity::Error),
            "critical" => Ok(AuditSeverity::Critical),
            other => Err(Error::invalid("severity", other)),
        }
    }
}

/// Coarse structural role of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageType {
    DataDisplay,
    Form,
    Detail,
    Admin,
    Unknown,
}

impl Default for PageType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageType::DataDisplay => write!(f, "data-display"),
            PageType::Form => write!(f, "form"),
            PageType::Detail => write!(f, "detail"),
            PageType::Admin => write!(f, "admin"),
            PageType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Kind of mechanical change a fix performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixKind {
    AddImport,
    AddHook,
    AddGuard,
    WrapComponent,
    CreateFile,
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixKind::AddImport => write!(f, "add-import"),
            FixKind::AddHook => write!(f, "add-hook"),
            FixKind::AddGuard => write!(f, "add-guard"),
            FixKind::WrapComponent => write!(f, "wrap-component"),
            FixKind::CreateFile => write!(f, "create-file"),
        }
    }
}

/// Proposed mechanical fix for an issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixDescriptor {
    pub kind: FixKind,
    pub code: String,
    pub explanation: String,
}

impl FixDescriptor {
    pub fn new(kind: FixKind, code: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            explanation: explanation.into(),
        }
    }
}

/// Where an issue was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl IssueLocation {
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }
}

/// One audit finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    pub category: AuditCategory,
    pub severity: AuditSeverity,
    pub title: String,
    pub description: String,
    pub location: IssueLocation,
    pub expected: String,
    pub actual: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_reference: Option<String>,
    pub auto_fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<FixDescriptor>,
}

impl AuditIssue {
    pub fn new(
        category: AuditCategory,
        severity: AuditSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
        location: IssueLocation,
    ) -> Self {
        Self {
            category,
            severity,
            title: title.into(),
            description: description.into(),
            location,
            expected: String::new(),
            actual: String::new(),
            doc_reference: None,
            auto_fixable: false,
            fix: None,
        }
    }

    pub fn expecting(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = expected.into();
        self.actual = actual.into();
        self
    }

    pub fn with_docs(mut self, reference: impl Into<String>) -> Self {
        self.doc_reference = Some(reference.into());
        self
    }

    pub fn at_line(mut self, line: u32, column: u32) -> Self {
        self.location.line = Some(line);
        self.location.column = Some(column);
        self
    }

    /// Marks the issue auto-fixable with the given fix
    pub fn with_fix(mut self, fix: FixDescriptor) -> Self {
        self.auto_fixable = true;
        self.fix = Some(fix);
        self
    }

    /// Whether auto-fix can act on this issue
    pub fn is_applicable(&self) -> bool {
        self.auto_fixable && self.fix.is_some()
    }
}

/// Issue counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn tally(issues: &[AuditIssue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                AuditSeverity::Critical => counts.critical += 1,
                AuditSeverity::Error => counts.error += 1,
                AuditSeverity::Warning => counts.warning += 1,
                AuditSeverity::Info => counts.info += 1,
            }
        }
        counts
    }
}

/// Usage patterns detected in the page source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFlags {
    pub uses_fetch_hook: bool,
    pub uses_form_hook: bool,
    pub uses_card_layout: bool,
    pub uses_layout_wrapper: bool,
    pub uses_test_ids: bool,
}

/// Handoff compliance summary against a reference document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffCompliance {
    pub reference: String,
    pub compliance_percentage: f64,
    pub missing_features: Vec<String>,
}

/// Aggregate audit result for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAuditReport {
    pub page_path: String,
    pub page_type: PageType,
    pub total_issues: usize,
    pub severity_counts: SeverityCounts,
    pub auto_fixable: usize,
    pub issues: Vec<AuditIssue>,
    pub patterns: PatternFlags,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_compliance: Option<HandoffCompliance>,
}

/// Outcome of a batch auto-fix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSummary {
    pub fixed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_rejects_unknown() {
        assert_eq!("ui-ux".parse::<AuditCategory>().unwrap(), AuditCategory::UiUx);
        assert!("styling".parse::<AuditCategory>().is_err());
    }

    #[test]
    fn test_category_filter_parse() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "forms".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(AuditCategory::Forms)
        );
        assert!(CategoryFilter::Only(AuditCategory::Forms).includes(AuditCategory::Forms));
        assert!(!CategoryFilter::Only(AuditCategory::Forms).includes(AuditCategory::Testing));
    }

    #[test]
    fn test_severity_serde_names() {
        let json = serde_json::to_string(&AuditSeverity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
        assert!("fatal".parse::<AuditSeverity>().is_err());
    }

    #[test]
    fn test_severity_counts_tally() {
        let loc = IssueLocation::file("page.tsx");
        let issues = vec![
            AuditIssue::new(AuditCategory::Forms, AuditSeverity::Error, "a", "", loc.clone()),
            AuditIssue::new(AuditCategory::Forms, AuditSeverity::Error, "b", "", loc.clone()),
            AuditIssue::new(AuditCategory::Testing, AuditSeverity::Info, "c", "", loc),
        ];
        let counts = SeverityCounts::tally(&issues);
        assert_eq!(counts.error, 2);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.critical + counts.warning, 0);
    }

    #[test]
    fn test_with_fix_marks_fixable() {
        let issue = AuditIssue::new(
            AuditCategory::UiUx,
            AuditSeverity::Warning,
            "t",
            "d",
            IssueLocation::file("p.tsx"),
        );
        assert!(!issue.is_applicable());
        let issue = issue.with_fix(FixDescriptor::new(FixKind::WrapComponent, "Layout", "wrap"));
        assert!(issue.is_applicable());
    }
}
