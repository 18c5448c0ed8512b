//! Page Audit Engine
//!
//! Audits one UI page from its source text:
//! - classifies the page type from textual markers
//! - runs rule-based checks per category (structure, data fetching, forms,
//!   UI conventions, test instrumentation, accessibility)
//! - optionally layers an LLM deep audit on top (see [`crate::llm`])
//! - merges everything into a [`PageAuditReport`]
//!
//! Rule checks are pure text inspection and cannot fail. Only reading the
//! page source from disk can.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AuditConfig;
use crate::error::{Error, Result};
use crate::llm::{deep_audit, ChatClient, DeepAuditInput};
use crate::types::{
    AuditCategory, AuditIssue, AuditSeverity, CategoryFilter, FixDescriptor, FixKind,
    HandoffCompliance, IssueLocation, PageAuditReport, PageType, PatternFlags, SeverityCounts,
};

// ============================================================================
// Request
// ============================================================================

/// One audit invocation
#[derive(Debug, Clone, Default)]
pub struct AuditRequest {
    /// Page file, also used for path-based rules
    pub page_path: PathBuf,
    /// Inline source; read from `page_path` when absent
    pub source: Option<String>,
    pub category: CategoryFilter,
    /// Handoff document the page is checked against
    pub reference: Option<String>,
    pub compliance_percentage: Option<f64>,
    pub missing_features: Vec<String>,
    /// Request fixes; also enables the deep audit
    pub auto_fix: bool,
}

impl AuditRequest {
    pub fn new(page_path: impl Into<PathBuf>) -> Self {
        Self {
            page_path: page_path.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_auto_fix(mut self, auto_fix: bool) -> Self {
        self.auto_fix = auto_fix;
        self
    }

    fn load_source(&self) -> Result<String> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }
        std::fs::read_to_string(&self.page_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound {
                kind: "page".to_string(),
                id: self.page_path.display().to_string(),
            },
            _ => Error::Io(e),
        })
    }
}

// ============================================================================
// Markers
// ============================================================================

const QUERY_HOOKS: &[&str] = &["useQuery(", "useSWR(", "useInfiniteQuery("];
const LOADING_MARKERS: &[&str] = &["isLoading", "isPending", "loading"];
const ERROR_MARKERS: &[&str] = &["isError", "if (error", "error &&", "error ?"];
const RESOLVER_MARKERS: &[&str] = &["zodResolver", "yupResolver", "resolver:"];
const DYNAMIC_PARAM_MARKERS: &[&str] = &[
    "useParams(",
    "params.id",
    "params.slug",
    "searchParams",
    "[id]",
];

/// Characters after a `.map(` searched for a card wrapper
const CARD_LOOKAHEAD: usize = 300;

fn contains_any(source: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| source.contains(m))
}

fn has_query_hook(source: &str) -> bool {
    contains_any(source, QUERY_HOOKS)
}

fn fetches_data(source: &str) -> bool {
    has_query_hook(source) || (source.contains("useEffect(") && source.contains("fetch("))
}

fn has_layout(source: &str) -> bool {
    source.contains("Layout")
}

fn has_card(source: &str) -> bool {
    source.contains("Card")
}

/// Classify a page. Rules are checked in fixed priority order.
pub fn classify_page(page_path: &str, source: &str) -> PageType {
    let path_is_dynamic = page_path.contains('[') && page_path.contains(']');
    let path_is_admin = page_path.contains("/admin") || page_path.starts_with("admin/");

    if source.contains("useForm(") || source.contains("<form") {
        PageType::Form
    } else if path_is_dynamic || contains_any(source, DYNAMIC_PARAM_MARKERS) {
        PageType::Detail
    } else if (source.contains("AdminLayout") || path_is_admin)
        && (source.contains("<table") || source.contains("<Table"))
    {
        PageType::Admin
    } else if fetches_data(source) && source.contains(".map(") {
        PageType::DataDisplay
    } else {
        PageType::Unknown
    }
}

/// Usage-pattern flags from simple textual presence
pub fn detect_patterns(source: &str, test_id_attribute: &str) -> PatternFlags {
    PatternFlags {
        uses_fetch_hook: has_query_hook(source),
        uses_form_hook: source.contains("useForm("),
        uses_card_layout: has_card(source),
        uses_layout_wrapper: has_layout(source),
        uses_test_ids: source.contains(test_id_attribute),
    }
}

/// 1-based line and column of a byte offset
fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
    (line as u32, column as u32)
}

// A JSX tag whose attributes may hold `{...}` expressions (two levels deep),
// so `onClick={() => open()}` does not end the tag early.
const JSX_ATTRS: &str = r"(?:[^>{]|\{(?:[^{}]|\{[^{}]*\})*\})*";

static BUTTON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s)<button\b({})>(.*?)</button>", JSX_ATTRS))
        .expect("valid button regex")
});

static IMG: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"<img\b{}>", JSX_ATTRS)).expect("valid img regex"));

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"<{}>", JSX_ATTRS)).expect("valid tag regex"));

/// Slug for the e2e spec of a page, e.g. `app/profile/[id]/page.tsx` -> `profile-id`
pub fn page_slug(page_path: &str) -> String {
    let without_ext = Path::new(page_path).with_extension("");
    let mut parts: Vec<String> = without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .map(|s| s.trim_matches(|ch| ch == '[' || ch == ']').to_string())
        .filter(|s| !s.is_empty())
        .collect();

    while parts
        .first()
        .map(|p| matches!(p.as_str(), "src" | "app" | "pages"))
        .unwrap_or(false)
    {
        parts.remove(0);
    }
    if parts
        .last()
        .map(|p| matches!(p.as_str(), "page" | "index"))
        .unwrap_or(false)
    {
        parts.pop();
    }

    if parts.is_empty() {
        "home".to_string()
    } else {
        parts.join("-")
    }
}

// ============================================================================
// Page Auditor
// ============================================================================

/// Rule-based page auditor with an optional deep-audit client
pub struct PageAuditor {
    config: AuditConfig,
    test_id_attribute: String,
    chat: Option<Arc<dyn ChatClient>>,
    chat_timeout: Duration,
}

impl PageAuditor {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            test_id_attribute: "data-testid".to_string(),
            chat: None,
            chat_timeout: Duration::from_secs(30),
        }
    }

    /// Enable the deep audit through `client`
    pub fn with_chat_client(mut self, client: Arc<dyn ChatClient>, timeout: Duration) -> Self {
        self.chat = Some(client);
        self.chat_timeout = timeout;
        self
    }

    pub fn with_test_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.test_id_attribute = attribute.into();
        self
    }

    /// Audit one page
    pub async fn audit_page(&self, request: &AuditRequest) -> Result<PageAuditReport> {
        let source = request.load_source()?;
        let page_path = request.page_path.to_string_lossy().replace('\\', "/");

        info!("Auditing page: {}", page_path);

        let page_type = classify_page(&page_path, &source);
        let mut issues = self.run_rules(&page_path, &source, page_type, request.category);

        if request.auto_fix {
            match &self.chat {
                Some(client) => {
                    let input = DeepAuditInput {
                        page_path: &page_path,
                        source: &source,
                        page_type,
                        reference: request.reference.as_deref(),
                        source_budget: self.config.prompt_source_chars,
                    };
                    issues.extend(deep_audit(client.as_ref(), input, self.chat_timeout).await);
                }
                None => debug!("Deep audit requested but no chat client configured"),
            }
        }

        let severity_counts = SeverityCounts::tally(&issues);
        let auto_fixable = issues.iter().filter(|i| i.auto_fixable).count();
        let patterns = detect_patterns(&source, &self.test_id_attribute);
        let recommendations =
            build_recommendations(page_type, &patterns, &severity_counts, auto_fixable);

        let handoff_compliance = request.reference.as_ref().map(|reference| HandoffCompliance {
            reference: reference.clone(),
            compliance_percentage: request.compliance_percentage.unwrap_or(0.0),
            missing_features: request.missing_features.clone(),
        });

        info!(
            "Audit of {} found {} issue(s) ({} auto-fixable)",
            page_path,
            issues.len(),
            auto_fixable
        );

        Ok(PageAuditReport {
            page_path,
            page_type,
            total_issues: issues.len(),
            severity_counts,
            auto_fixable,
            issues,
            patterns,
            recommendations,
            handoff_compliance,
        })
    }

    /// Run the rule-based checks selected by `filter`
    pub fn run_rules(
        &self,
        page_path: &str,
        source: &str,
        page_type: PageType,
        filter: CategoryFilter,
    ) -> Vec<AuditIssue> {
        let mut issues = Vec::new();

        for category in AuditCategory::BUILT_IN {
            if !filter.includes(category) {
                continue;
            }
            match category {
                AuditCategory::ComponentStructure => {
                    self.check_component_structure(page_path, source, &mut issues)
                }
                AuditCategory::DataFetching => {
                    self.check_data_fetching(page_path, source, page_type, &mut issues)
                }
                AuditCategory::Forms => self.check_forms(page_path, source, &mut issues),
                AuditCategory::UiUx => self.check_ui_ux(page_path, source, &mut issues),
                AuditCategory::Testing => self.check_testing(page_path, source, &mut issues),
                AuditCategory::Accessibility => {
                    self.check_accessibility(page_path, source, &mut issues)
                }
                _ => {}
            }
        }

        issues
    }

    fn check_component_structure(&self, page_path: &str, source: &str, issues: &mut Vec<AuditIssue>) {
        if !source.contains("export default") {
            issues.push(
                AuditIssue::new(
                    AuditCategory::ComponentStructure,
                    AuditSeverity::Error,
                    "Missing default export",
                    "Pages must default-export their component so the router can mount them",
                    IssueLocation::file(page_path),
                )
                .expecting("export default function Page()", "no default export"),
            );
        }

        let typed = Path::new(page_path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "tsx" || e == "ts")
            .unwrap_or(false);
        if !typed {
            issues.push(
                AuditIssue::new(
                    AuditCategory::ComponentStructure,
                    AuditSeverity::Warning,
                    "Untyped source file",
                    "Page components should be written in TypeScript",
                    IssueLocation::file(page_path),
                )
                .expecting(".tsx", page_path.rsplit('/').next().unwrap_or(page_path)),
            );
        }
    }

    fn check_data_fetching(
        &self,
        page_path: &str,
        source: &str,
        page_type: PageType,
        issues: &mut Vec<AuditIssue>,
    ) {
        if page_type != PageType::DataDisplay {
            return;
        }

        if !has_query_hook(source) {
            issues.push(
                AuditIssue::new(
                    AuditCategory::DataFetching,
                    AuditSeverity::Error,
                    "No data-fetching hook",
                    "Data-display pages should load data through useQuery for caching and state handling",
                    IssueLocation::file(page_path),
                )
                .expecting("useQuery({ queryKey, queryFn })", "manual fetch or none")
                .with_docs("https://tanstack.com/query/latest/docs/framework/react/guides/queries")
                .with_fix(FixDescriptor::new(
                    FixKind::AddHook,
                    "const { data, isLoading, error } = useQuery({ queryKey: ['items'], queryFn: fetchItems });",
                    "Load the page data through useQuery",
                )),
            );
            return;
        }

        if !contains_any(source, LOADING_MARKERS) {
            issues.push(
                AuditIssue::new(
                    AuditCategory::DataFetching,
                    AuditSeverity::Warning,
                    "Missing loading state",
                    "The page fetches data but never renders a loading state",
                    IssueLocation::file(page_path),
                )
                .expecting("if (isLoading) return <LoadingSpinner />", "no loading check")
                .with_fix(FixDescriptor::new(
                    FixKind::AddGuard,
                    "if (isLoading) return <LoadingSpinner />;",
                    "Render a spinner while the query is in flight",
                )),
            );
        }

        if !contains_any(source, ERROR_MARKERS) {
            issues.push(
                AuditIssue::new(
                    AuditCategory::DataFetching,
                    AuditSeverity::Warning,
                    "Missing error state",
                    "The page fetches data but never renders an error state",
                    IssueLocation::file(page_path),
                )
                .expecting("if (error) return <ErrorState error={error} />", "no error check")
                .with_fix(FixDescriptor::new(
                    FixKind::AddGuard,
                    "if (error) return <ErrorState error={error} />;",
                    "Render an error state when the query fails",
                )),
            );
        }
    }

    fn check_forms(&self, page_path: &str, source: &str, issues: &mut Vec<AuditIssue>) {
        let uses_form_hook = source.contains("useForm(");

        if let Some(offset) = source.find("<form") {
            if !uses_form_hook {
                let (line, column) = line_col(source, offset);
                issues.push(
                    AuditIssue::new(
                        AuditCategory::Forms,
                        AuditSeverity::Error,
                        "Form without form management",
                        "Form markup is handled manually instead of through useForm",
                        IssueLocation::file(page_path),
                    )
                    .at_line(line, column)
                    .expecting("useForm() from react-hook-form", "uncontrolled <form>")
                    .with_docs("https://react-hook-form.com/docs/useform"),
                );
            }
        }

        if uses_form_hook && !contains_any(source, RESOLVER_MARKERS) {
            issues.push(
                AuditIssue::new(
                    AuditCategory::Forms,
                    AuditSeverity::Warning,
                    "Form without schema validation",
                    "useForm is configured without a schema resolver",
                    IssueLocation::file(page_path),
                )
                .expecting("useForm({ resolver: zodResolver(schema) })", "useForm() without resolver"),
            );
        }
    }

    fn check_ui_ux(&self, page_path: &str, source: &str, issues: &mut Vec<AuditIssue>) {
        if !has_layout(source) && !has_card(source) {
            issues.push(
                AuditIssue::new(
                    AuditCategory::UiUx,
                    AuditSeverity::Warning,
                    "No layout wrapper",
                    "The page renders outside the shared Layout and Card components",
                    IssueLocation::file(page_path),
                )
                .expecting("<Layout>...</Layout>", "bare markup")
                .with_fix(FixDescriptor::new(
                    FixKind::WrapComponent,
                    "Layout",
                    "Wrap the returned markup in <Layout> (import Layout from '@/components/Layout')",
                )),
            );
        }

        let bare_list = source.match_indices(".map(").find(|(offset, _)| {
            let window: String = source[*offset..].chars().take(CARD_LOOKAHEAD).collect();
            !window.contains("Card")
        });
        if let Some((offset, _)) = bare_list {
            let (line, column) = line_col(source, offset);
            issues.push(
                AuditIssue::new(
                    AuditCategory::UiUx,
                    AuditSeverity::Info,
                    "List items without cards",
                    "Mapped list items are rendered without a Card wrapper",
                    IssueLocation::file(page_path),
                )
                .at_line(line, column)
                .expecting("items.map(item => <Card key={item.id}>...)", "items.map(...) without Card"),
            );
        }
    }

    fn check_testing(&self, page_path: &str, source: &str, issues: &mut Vec<AuditIssue>) {
        if !source.contains(&self.test_id_attribute) {
            issues.push(
                AuditIssue::new(
                    AuditCategory::Testing,
                    AuditSeverity::Warning,
                    "No test identifiers",
                    format!(
                        "No element carries a {} attribute; locators fall back to brittle selectors",
                        self.test_id_attribute
                    ),
                    IssueLocation::file(page_path),
                )
                .expecting(format!("{}=\"...\" on interactive elements", self.test_id_attribute), "none"),
            );
        }

        let relative = Path::new(page_path)
            .strip_prefix(&self.config.project_root)
            .unwrap_or_else(|_| Path::new(page_path));
        let slug = page_slug(&relative.to_string_lossy());
        let spec_path = self.e2e_spec_path(&slug);
        if !spec_path.exists() {
            let spec_display = spec_path.to_string_lossy().replace('\\', "/");
            issues.push(
                AuditIssue::new(
                    AuditCategory::Testing,
                    AuditSeverity::Info,
                    "No end-to-end test",
                    format!("Expected an e2e spec at {}", spec_display),
                    IssueLocation::file(spec_display.clone()),
                )
                .expecting(spec_display, "missing")
                .with_fix(FixDescriptor::new(
                    FixKind::CreateFile,
                    e2e_stub(&slug, &self.test_id_attribute),
                    "Scaffold a smoke test for the page",
                )),
            );
        }
    }

    fn check_accessibility(&self, page_path: &str, source: &str, issues: &mut Vec<AuditIssue>) {
        let unlabeled = BUTTON.captures_iter(source).find(|caps| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let inner = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let text = TAG.replace_all(inner, "");
            !attrs.contains("aria-label") && text.trim().is_empty()
        });
        if let Some(caps) = unlabeled {
            let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let (line, column) = line_col(source, offset);
            issues.push(
                AuditIssue::new(
                    AuditCategory::Accessibility,
                    AuditSeverity::Warning,
                    "Button without accessible name",
                    "A button has no text content or aria-label",
                    IssueLocation::file(page_path),
                )
                .at_line(line, column)
                .expecting("<button aria-label=\"...\">", "unlabeled <button>"),
            );
        }

        for m in IMG.find_iter(source) {
            if m.as_str().contains("alt=") {
                continue;
            }
            let (line, column) = line_col(source, m.start());
            issues.push(
                AuditIssue::new(
                    AuditCategory::Accessibility,
                    AuditSeverity::Error,
                    "Image without alt text",
                    "Images must carry an alt attribute",
                    IssueLocation::file(page_path),
                )
                .at_line(line, column)
                .expecting("<img alt=\"...\">", m.as_str().to_string()),
            );
        }
    }

    fn e2e_spec_path(&self, slug: &str) -> PathBuf {
        self.config
            .project_root
            .join(&self.config.e2e_dir)
            .join(format!("{}.spec.ts", slug))
    }
}

impl Default for PageAuditor {
    fn default() -> Self {
        Self::new(AuditConfig::default())
    }
}

fn e2e_stub(slug: &str, test_id_attribute: &str) -> String {
    format!(
        r#"import {{ test, expect }} from '@playwright/test';

test.describe('{slug}', () => {{
  test('renders', async ({{ page }}) => {{
    await page.goto('/{route}');
    await expect(page.locator('[{attr}]').first()).toBeVisible();
  }});
}});
"#,
        slug = slug,
        route = if slug == "home" { String::new() } else { slug.replace('-', "/") },
        attr = test_id_attribute,
    )
}

fn build_recommendations(
    page_type: PageType,
    patterns: &PatternFlags,
    counts: &SeverityCounts,
    auto_fixable: usize,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if page_type == PageType::DataDisplay && !patterns.uses_fetch_hook {
        recommendations.push(
            "Page type is data-display but shows no data-fetching hook usage; load data with useQuery"
                .to_string(),
        );
    }
    if page_type == PageType::DataDisplay && !patterns.uses_card_layout {
        recommendations.push("Render list items inside Card components".to_string());
    }
    if page_type == PageType::Form && !patterns.uses_form_hook {
        recommendations.push(
            "Page type is form but does not use useForm; adopt react-hook-form with a zod schema"
                .to_string(),
        );
    }
    if !patterns.uses_layout_wrapper {
        recommendations.push("Wrap the page in the shared Layout component".to_string());
    }
    if !patterns.uses_test_ids {
        recommendations.push(
            "Add data-testid attributes to interactive elements so self-healing locators resolve on the primary tier"
                .to_string(),
        );
    }

    let blocking = counts.critical + counts.error;
    if blocking > 0 {
        recommendations.push(format!("Resolve {} blocking issue(s) before merging", blocking));
    }
    if auto_fixable > 0 {
        recommendations.push(format!("{} issue(s) can be fixed automatically", auto_fixable));
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_detail_vs_form_priority() {
        let detail = "const { id } = useParams();\nexport default function P() {}";
        assert_eq!(classify_page("app/x/page.tsx", detail), PageType::Detail);

        let both = "const { id } = useParams();\nconst f = useForm();";
        assert_eq!(classify_page("app/x/page.tsx", both), PageType::Form);
    }

    #[test]
    fn test_classify_admin_and_data_display() {
        let admin = "<AdminLayout><table></table></AdminLayout>";
        assert_eq!(classify_page("app/users/page.tsx", admin), PageType::Admin);

        let admin_without_table = "<AdminLayout><div /></AdminLayout>";
        assert_eq!(classify_page("app/users/page.tsx", admin_without_table), PageType::Unknown);

        let list = "const { data } = useQuery({});\nreturn data.map(x => <li>{x}</li>);";
        assert_eq!(classify_page("app/feed/page.tsx", list), PageType::DataDisplay);

        let manual = "useEffect(() => { fetch('/api') }, []);\nitems.map(i => i)";
        assert_eq!(classify_page("app/feed/page.tsx", manual), PageType::DataDisplay);
    }

    #[test]
    fn test_classify_dynamic_path() {
        assert_eq!(classify_page("app/profile/[id]/page.tsx", ""), PageType::Detail);
    }

    #[test]
    fn test_classify_dynamic_source_markers() {
        let query = "const id = searchParams.get('id');";
        assert_eq!(classify_page("app/x/page.tsx", query), PageType::Detail);

        let segment = "// route: /posts/[id]\nexport default function Post() {}";
        assert_eq!(classify_page("app/x/page.tsx", segment), PageType::Detail);

        let slug = "const post = getPost(params.slug);";
        assert_eq!(classify_page("app/x/page.tsx", slug), PageType::Detail);
    }

    #[test]
    fn test_page_slug() {
        assert_eq!(page_slug("app/feed/page.tsx"), "feed");
        assert_eq!(page_slug("src/app/profile/[id]/page.tsx"), "profile-id");
        assert_eq!(page_slug("pages/index.tsx"), "home");
        assert_eq!(page_slug("app/groups/events.tsx"), "groups-events");
    }

    #[test]
    fn test_line_col() {
        let source = "a\nbc\n<img>";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 3), (2, 2));
        assert_eq!(line_col(source, 5), (3, 1));
    }

    #[test]
    fn test_button_heuristic() {
        let auditor = PageAuditor::default();
        let mut issues = Vec::new();
        auditor.check_accessibility(
            "p.tsx",
            r#"<button onClick={go}><Icon /></button><button aria-label="x"><Icon /></button>"#,
            &mut issues,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, AuditSeverity::Warning);

        let mut issues = Vec::new();
        auditor.check_accessibility("p.tsx", "<button>{label}</button><button>Save</button>", &mut issues);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_button_with_inline_handler() {
        let auditor = PageAuditor::default();
        let mut issues = Vec::new();
        auditor.check_accessibility(
            "p.tsx",
            "<button onClick={() => setOpen(true)}><Icon /></button>",
            &mut issues,
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].location.column, Some(1));

        let mut issues = Vec::new();
        auditor.check_accessibility(
            "p.tsx",
            r#"<button onClick={() => { track("x"); setOpen(true); }} aria-label="Open"><Icon /></button>
<button onClick={() => setOpen(false)}>Close</button>"#,
            &mut issues,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_img_alt_after_inline_handler() {
        let auditor = PageAuditor::default();
        let mut issues = Vec::new();
        auditor.check_accessibility(
            "p.tsx",
            r#"<img onLoad={() => setReady(true)} src="a.png" alt="Avatar" />"#,
            &mut issues,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_each_img_without_alt_is_reported() {
        let auditor = PageAuditor::default();
        let mut issues = Vec::new();
        auditor.check_accessibility(
            "p.tsx",
            "<img src=\"a.png\" />\n<img src=\"b.png\" alt=\"b\" />\n<img src=\"c.png\">",
            &mut issues,
        );
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == AuditSeverity::Error));
        assert_eq!(issues[1].location.line, Some(3));
    }

    #[test]
    fn test_map_with_card_nearby_is_fine() {
        let auditor = PageAuditor::default();
        let mut issues = Vec::new();
        auditor.check_ui_ux(
            "p.tsx",
            "<Layout>{items.map(i => <Card key={i.id}>{i.name}</Card>)}</Layout>",
            &mut issues,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_recommendations_follow_flags() {
        let flags = PatternFlags {
            uses_fetch_hook: false,
            uses_form_hook: false,
            uses_card_layout: true,
            uses_layout_wrapper: true,
            uses_test_ids: true,
        };
        let recs = build_recommendations(PageType::DataDisplay, &flags, &SeverityCounts::default(), 0);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("data-display"));
    }
}
