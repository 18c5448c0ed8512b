//! Audit Commands
//!
//! Runs the page audit engine on one page source file and optionally
//! applies the proposed fixes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::warn;

use selfheal_common::{
    auto_fix_issues, AuditIssue, AuditRequest, AuditSeverity, CategoryFilter, FileFixApplier,
    FixSummary, HttpChatClient, PageAuditReport, PageAuditor, SelfHealConfig,
};

use crate::output::{
    print_info, print_list, print_structured, print_success, print_warning, OutputFormat,
    TableDisplay,
};

#[derive(Args)]
pub struct AuditArgs {
    /// Page source file to audit
    pub page: PathBuf,

    /// Restrict the rules to one category ("all" for every category)
    #[arg(short, long, default_value = "all")]
    pub category: CategoryFilter,

    /// Handoff document the page is checked against
    #[arg(long)]
    pub reference: Option<String>,

    /// Compliance percentage reported for the handoff document
    #[arg(long, requires = "reference")]
    pub compliance: Option<f64>,

    /// Feature listed in the handoff document but missing from the page (repeatable)
    #[arg(long = "missing", requires = "reference")]
    pub missing_features: Vec<String>,

    /// Request fixes, which also enables the LLM deep audit
    #[arg(long)]
    pub auto_fix: bool,

    /// Write the proposed fixes to disk
    #[arg(long, requires = "auto_fix")]
    pub apply: bool,

    /// Exit with an error when any issue at or above this severity is found
    #[arg(long)]
    pub fail_on: Option<AuditSeverity>,
}

#[derive(Serialize)]
struct AuditOutput<'a> {
    report: &'a PageAuditReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    fixes: Option<FixSummary>,
}

/// Table row for one issue
#[derive(Serialize)]
struct IssueRow<'a>(&'a AuditIssue);

impl TableDisplay for IssueRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Severity", "Category", "Title", "Location", "Fix"]
    }

    fn row(&self) -> Vec<String> {
        let issue = self.0;
        let location = match issue.location.line {
            Some(line) => format!("{}:{}", issue.location.file, line),
            None => issue.location.file.clone(),
        };
        vec![
            severity_label(issue.severity),
            issue.category.to_string(),
            issue.title.clone(),
            location,
            issue
                .fix
                .as_ref()
                .map(|f| f.kind.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]
    }
}

fn severity_label(severity: AuditSeverity) -> String {
    match severity {
        AuditSeverity::Critical => "critical".red().bold().to_string(),
        AuditSeverity::Error => "error".red().to_string(),
        AuditSeverity::Warning => "warning".yellow().to_string(),
        AuditSeverity::Info => "info".blue().to_string(),
    }
}

pub async fn execute(args: AuditArgs, config: &SelfHealConfig, format: OutputFormat) -> Result<()> {
    let mut auditor = PageAuditor::new(config.audit.clone())
        .with_test_id_attribute(config.locator.test_id_attribute.clone());

    if args.auto_fix {
        if config.llm.resolve_api_key().is_some() {
            let client = HttpChatClient::new(config.llm.clone())?;
            auditor = auditor.with_chat_client(Arc::new(client), config.llm.timeout());
        } else {
            warn!("No LLM API key configured; running rule-based checks only");
        }
    }

    let mut request = AuditRequest::new(&args.page)
        .with_category(args.category)
        .with_auto_fix(args.auto_fix);
    if let Some(reference) = args.reference {
        request = request.with_reference(reference);
    }
    request.compliance_percentage = args.compliance;
    request.missing_features = args.missing_features;

    let report = auditor.audit_page(&request).await?;

    let fixes = if args.apply {
        Some(auto_fix_issues(&report, &FileFixApplier::new()))
    } else {
        None
    };

    let output = AuditOutput {
        report: &report,
        fixes,
    };
    if !print_structured(&output, format) {
        print_report(&report, format);
        if let Some(summary) = fixes {
            print_fix_summary(summary);
        }
    }

    if let Some(threshold) = args.fail_on {
        let blocking = report
            .issues
            .iter()
            .filter(|i| i.severity >= threshold)
            .count();
        if blocking > 0 {
            bail!("{} issue(s) at or above {}", blocking, threshold);
        }
    }

    Ok(())
}

fn print_report(report: &PageAuditReport, format: OutputFormat) {
    println!(
        "{} {} ({})",
        "Page:".bold(),
        report.page_path,
        report.page_type
    );
    println!(
        "Issues: {} total, {} critical, {} error, {} warning, {} info, {} auto-fixable",
        report.total_issues,
        report.severity_counts.critical,
        report.severity_counts.error,
        report.severity_counts.warning,
        report.severity_counts.info,
        report.auto_fixable
    );
    println!();

    let rows: Vec<IssueRow<'_>> = report.issues.iter().map(IssueRow).collect();
    if rows.is_empty() {
        print_success("No issues found");
    } else {
        print_list(&rows, format);
    }

    if let Some(compliance) = &report.handoff_compliance {
        println!();
        println!(
            "Handoff compliance ({}): {:.1}%",
            compliance.reference, compliance.compliance_percentage
        );
        for feature in &compliance.missing_features {
            println!("  missing: {}", feature);
        }
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("{}", "Recommendations:".bold());
        for recommendation in &report.recommendations {
            print_info(recommendation);
        }
    }
}

fn print_fix_summary(summary: FixSummary) {
    println!();
    if summary.failed == 0 {
        print_success(&format!("Applied {} fix(es)", summary.fixed));
    } else {
        print_warning(&format!(
            "Applied {} fix(es), {} failed",
            summary.fixed, summary.failed
        ));
    }
}
