//! Page audit engine tests
//!
//! Exercises the full audit pipeline against synthetic page sources, with
//! scripted chat clients standing in for the deep-audit endpoint.

use std::cell::Cell;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use selfheal_common::config::AuditConfig;
use selfheal_common::{
    auto_fix_issues, AuditCategory, AuditIssue, AuditRequest, AuditSeverity, CategoryFilter,
    ChatClient, ChatMessage, Error, FileFixApplier, FixApplier, FixDescriptor, FixKind,
    IssueLocation, PageAuditReport, PageAuditor, PageType, Result,
};

const FEED_PAGE: &str = r#"import { useQuery } from '@tanstack/react-query';

export default function FeedPage() {
  const { data } = useQuery({ queryKey: ['posts'], queryFn: fetchPosts });
  return (
    <div>
      {data.map((post) => (
        <article key={post.id}>{post.body}</article>
      ))}
      <img src="/banner.png" />
      <button onClick={refresh}><RefreshIcon /></button>
    </div>
  );
}
"#;

const PROFILE_FORM: &str = r#"export default function EditProfile() {
  const { id } = useParams();
  const form = useForm({ resolver: zodResolver(schema) });
  return (
    <Layout>
      <form data-testid="profile-form" onSubmit={form.handleSubmit(save)} />
    </Layout>
  );
}
"#;

struct FailingClient;

#[async_trait]
impl ChatClient for FailingClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(Error::Llm("connection refused".to_string()))
    }
}

struct ScriptedClient(String);

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct StalledClient;

#[async_trait]
impl ChatClient for StalledClient {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("[]".to_string())
    }
}

fn auditor(root: &TempDir) -> PageAuditor {
    PageAuditor::new(AuditConfig {
        project_root: root.path().to_path_buf(),
        ..AuditConfig::default()
    })
}

fn titles(report: &PageAuditReport) -> Vec<&str> {
    report.issues.iter().map(|i| i.title.as_str()).collect()
}

#[tokio::test]
async fn test_feed_page_rule_findings() {
    let root = TempDir::new().unwrap();
    let request = AuditRequest::new("app/feed/page.tsx").with_source(FEED_PAGE);
    let report = auditor(&root).audit_page(&request).await.unwrap();

    assert_eq!(report.page_type, PageType::DataDisplay);
    assert_eq!(
        titles(&report),
        vec![
            "Missing loading state",
            "Missing error state",
            "No layout wrapper",
            "List items without cards",
            "No test identifiers",
            "No end-to-end test",
            "Button without accessible name",
            "Image without alt text",
        ]
    );
    assert_eq!(report.total_issues, 8);
    assert_eq!(report.severity_counts.error, 1);
    assert_eq!(report.severity_counts.warning, 5);
    assert_eq!(report.severity_counts.info, 2);
    assert_eq!(report.auto_fixable, 4);
    assert!(report.patterns.uses_fetch_hook);
    assert!(!report.patterns.uses_test_ids);
    assert!(report.handoff_compliance.is_none());
}

#[tokio::test]
async fn test_form_page_is_clean_apart_from_e2e() {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("e2e")).unwrap();
    fs::write(root.path().join("e2e/profile-edit.spec.ts"), "test()").unwrap();

    let request = AuditRequest::new("app/profile/edit/page.tsx").with_source(PROFILE_FORM);
    let report = auditor(&root).audit_page(&request).await.unwrap();

    assert_eq!(report.page_type, PageType::Form);
    assert!(report.issues.is_empty(), "unexpected: {:?}", titles(&report));
    assert!(report.patterns.uses_form_hook);
    assert!(report.patterns.uses_layout_wrapper);
}

#[tokio::test]
async fn test_rule_audit_is_deterministic() {
    let root = TempDir::new().unwrap();
    let request = AuditRequest::new("app/feed/page.tsx").with_source(FEED_PAGE);
    let auditor = auditor(&root);

    let first = auditor.audit_page(&request).await.unwrap();
    let second = auditor.audit_page(&request).await.unwrap();

    assert_eq!(
        serde_json::to_vec(&first.issues).unwrap(),
        serde_json::to_vec(&second.issues).unwrap()
    );
}

#[tokio::test]
async fn test_failing_llm_degrades_to_rules() {
    let root = TempDir::new().unwrap();
    let request = AuditRequest::new("app/feed/page.tsx").with_source(FEED_PAGE);

    let baseline = auditor(&root).audit_page(&request).await.unwrap();
    let report = auditor(&root)
        .with_chat_client(Arc::new(FailingClient), Duration::from_secs(5))
        .audit_page(&request.clone().with_auto_fix(true))
        .await
        .unwrap();

    assert_eq!(report.issues, baseline.issues);
}

#[tokio::test]
async fn test_stalled_llm_times_out() {
    let root = TempDir::new().unwrap();
    let request = AuditRequest::new("app/feed/page.tsx")
        .with_source(FEED_PAGE)
        .with_auto_fix(true);

    let report = auditor(&root)
        .with_chat_client(Arc::new(StalledClient), Duration::from_millis(100))
        .audit_page(&request)
        .await
        .unwrap();

    assert_eq!(report.total_issues, 8);
}

#[tokio::test]
async fn test_llm_issues_are_appended() {
    let root = TempDir::new().unwrap();
    let response = r#"```json
[{"category": "security", "severity": "critical", "title": "Unsanitized HTML", "description": "dangerouslySetInnerHTML with user input"},
 {"category": "made-up", "title": ""}]
```"#;
    let request = AuditRequest::new("app/feed/page.tsx")
        .with_source(FEED_PAGE)
        .with_auto_fix(true);

    let report = auditor(&root)
        .with_chat_client(Arc::new(ScriptedClient(response.to_string())), Duration::from_secs(5))
        .audit_page(&request)
        .await
        .unwrap();

    assert_eq!(report.total_issues, 10);
    assert_eq!(report.severity_counts.critical, 1);
    let last = &report.issues[9];
    assert_eq!(last.category, AuditCategory::ComponentStructure);
    assert_eq!(last.severity, AuditSeverity::Warning);
    assert_eq!(last.title, "AI-detected issue");
}

#[tokio::test]
async fn test_category_filter_limits_rules() {
    let root = TempDir::new().unwrap();
    let request = AuditRequest::new("app/feed/page.tsx")
        .with_source(FEED_PAGE)
        .with_category(CategoryFilter::Only(AuditCategory::Accessibility));
    let report = auditor(&root).audit_page(&request).await.unwrap();

    assert_eq!(report.total_issues, 2);
    assert!(report
        .issues
        .iter()
        .all(|i| i.category == AuditCategory::Accessibility));

    let request = request.with_category(CategoryFilter::Only(AuditCategory::Security));
    let report = auditor(&root).audit_page(&request).await.unwrap();
    assert_eq!(report.total_issues, 0);
}

#[tokio::test]
async fn test_icon_button_with_arrow_handler_is_flagged() {
    let root = TempDir::new().unwrap();
    let source = r#"export default function Drawer() {
  const [open, setOpen] = useState(false);
  return <button onClick={() => setOpen(true)}><MenuIcon /></button>;
}
"#;
    let request = AuditRequest::new("app/drawer/page.tsx")
        .with_source(source)
        .with_category(CategoryFilter::Only(AuditCategory::Accessibility));
    let report = auditor(&root).audit_page(&request).await.unwrap();

    assert_eq!(titles(&report), vec!["Button without accessible name"]);
    assert_eq!(report.issues[0].location.line, Some(3));
}

#[tokio::test]
async fn test_compliance_block_uses_supplied_values() {
    let root = TempDir::new().unwrap();
    let mut request = AuditRequest::new("app/feed/page.tsx")
        .with_source(FEED_PAGE)
        .with_reference("FEED_HANDOFF.md");
    request.compliance_percentage = Some(75.0);
    request.missing_features = vec!["infinite scroll".to_string()];

    let report = auditor(&root).audit_page(&request).await.unwrap();
    let compliance = report.handoff_compliance.unwrap();
    assert_eq!(compliance.reference, "FEED_HANDOFF.md");
    assert_eq!(compliance.compliance_percentage, 75.0);
    assert_eq!(compliance.missing_features, vec!["infinite scroll"]);
}

#[tokio::test]
async fn test_missing_page_is_an_error() {
    let root = TempDir::new().unwrap();
    let request = AuditRequest::new(root.path().join("app/missing/page.tsx"));
    let err = auditor(&root).audit_page(&request).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

struct FlakyApplier {
    calls: Cell<usize>,
    fail_on: usize,
}

impl FixApplier for FlakyApplier {
    fn apply(&self, _issue: &AuditIssue) -> Result<()> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.fail_on {
            Err(Error::Fix("simulated".to_string()))
        } else {
            Ok(())
        }
    }
}

fn fixable(title: &str) -> AuditIssue {
    AuditIssue::new(
        AuditCategory::UiUx,
        AuditSeverity::Warning,
        title,
        "",
        IssueLocation::file("page.tsx"),
    )
    .with_fix(FixDescriptor::new(FixKind::WrapComponent, "Layout", ""))
}

#[test]
fn test_auto_fix_partial_failure() {
    let mut unfixable = fixable("advisory");
    unfixable.fix = None;

    let issues = vec![fixable("one"), unfixable, fixable("two"), fixable("three")];
    let report = PageAuditReport {
        page_path: "page.tsx".to_string(),
        page_type: PageType::Unknown,
        total_issues: issues.len(),
        severity_counts: Default::default(),
        auto_fixable: 4,
        issues,
        patterns: Default::default(),
        recommendations: vec![],
        handoff_compliance: None,
    };

    let applier = FlakyApplier {
        calls: Cell::new(0),
        fail_on: 2,
    };
    let summary = auto_fix_issues(&report, &applier);

    assert_eq!(summary.fixed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(applier.calls.get(), 3);
}

#[tokio::test]
async fn test_file_fixes_patch_page_and_scaffold_spec() {
    let root = TempDir::new().unwrap();
    let page = root.path().join("app/feed/page.tsx");
    fs::create_dir_all(page.parent().unwrap()).unwrap();
    fs::write(&page, FEED_PAGE).unwrap();

    let request = AuditRequest::new(&page).with_auto_fix(true);
    let report = auditor(&root).audit_page(&request).await.unwrap();
    assert_eq!(report.auto_fixable, 4);

    let summary = auto_fix_issues(&report, &FileFixApplier::new());
    assert_eq!(summary.fixed, 4);
    assert_eq!(summary.failed, 0);

    let patched = fs::read_to_string(&page).unwrap();
    assert!(patched.contains("if (isLoading) return <LoadingSpinner />;"));
    assert!(patched.contains("if (error) return <ErrorState error={error} />;"));
    assert!(patched.contains("<Layout>"));

    let spec = root.path().join("e2e/feed.spec.ts");
    assert!(fs::read_to_string(spec).unwrap().contains("page.goto('/feed')"));

    let rerun = auto_fix_issues(&report, &FileFixApplier::new());
    assert_eq!(rerun.failed, 1, "scaffold must not overwrite an existing spec");
}
