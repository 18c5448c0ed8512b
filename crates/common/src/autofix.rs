//! Best-effort auto-fix for audit issues
//!
//! Each fixable issue is applied independently. A failing fix is logged and
//! counted; it never stops the remaining fixes.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::types::{AuditIssue, FixKind, FixSummary, PageAuditReport};

/// Applies a single issue's fix
pub trait FixApplier {
    fn apply(&self, issue: &AuditIssue) -> Result<()>;
}

/// Apply every applicable fix in `report`
pub fn auto_fix_issues(report: &PageAuditReport, applier: &dyn FixApplier) -> FixSummary {
    let mut summary = FixSummary::default();

    for issue in report.issues.iter().filter(|i| i.is_applicable()) {
        match applier.apply(issue) {
            Ok(()) => {
                debug!("Fixed '{}' in {}", issue.title, issue.location.file);
                summary.fixed += 1;
            }
            Err(e) => {
                warn!("Could not fix '{}' in {}: {}", issue.title, issue.location.file, e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Auto-fix for {}: {} fixed, {} failed",
        report.page_path, summary.fixed, summary.failed
    );
    summary
}

/// Applies fixes to files on disk, resolving issue locations against `root`
#[derive(Debug, Clone, Default)]
pub struct FileFixApplier {
    root: Option<PathBuf>,
}

impl FileFixApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, file: &str) -> PathBuf {
        match &self.root {
            Some(root) if Path::new(file).is_relative() => root.join(file),
            _ => PathBuf::from(file),
        }
    }
}

impl FixApplier for FileFixApplier {
    fn apply(&self, issue: &AuditIssue) -> Result<()> {
        let fix = issue
            .fix
            .as_ref()
            .ok_or_else(|| Error::Fix(format!("'{}' has no fix", issue.title)))?;
        let path = self.resolve(&issue.location.file);

        if fix.kind == FixKind::CreateFile {
            if path.exists() {
                return Err(Error::Fix(format!("{} already exists", path.display())));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &fix.code)?;
            return Ok(());
        }

        let source = std::fs::read_to_string(&path)?;
        let patched = patch_source(&source, fix.kind, &fix.code)?;
        std::fs::write(&path, patched)?;
        Ok(())
    }
}

/// Apply an in-place fix to page source
pub fn patch_source(source: &str, kind: FixKind, code: &str) -> Result<String> {
    match kind {
        FixKind::AddImport => Ok(format!("{}\n{}", code, source)),
        FixKind::AddHook => {
            let brace = component_body_start(source)
                .ok_or_else(|| Error::Fix("no default-exported component".to_string()))?;
            Ok(format!(
                "{}\n  {}{}",
                &source[..=brace],
                code,
                &source[brace + 1..]
            ))
        }
        FixKind::AddGuard => {
            let ret = source
                .find("return (")
                .ok_or_else(|| Error::Fix("no `return (` to guard".to_string()))?;
            let line_start = source[..ret].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let indent = &source[line_start..ret];
            let indent = if indent.trim().is_empty() { indent } else { "" };
            Ok(format!(
                "{}{}{}\n{}",
                &source[..line_start],
                indent,
                code,
                &source[line_start..]
            ))
        }
        FixKind::WrapComponent => {
            let open = source
                .find("return (")
                .map(|i| i + "return ".len())
                .ok_or_else(|| Error::Fix("no `return (` to wrap".to_string()))?;
            let close = matching_paren(source, open)
                .ok_or_else(|| Error::Fix("unbalanced `return (`".to_string()))?;
            Ok(format!(
                "{}\n<{w}>{}</{w}>\n{}",
                &source[..=open],
                &source[open + 1..close],
                &source[close..],
                w = code
            ))
        }
        FixKind::CreateFile => Err(Error::Fix("create-file is not an in-place fix".to_string())),
    }
}

/// Byte offset of the opening brace of the default-exported component
fn component_body_start(source: &str) -> Option<usize> {
    let export = source.find("export default function")?;
    let params_open = export + source[export..].find('(')?;
    let params_close = matching_paren(source, params_open)?;
    let brace = params_close + source[params_close..].find('{')?;
    Some(brace)
}

fn matching_paren(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in source[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}
