//! Known-issue analysis of failed tests.
//!
//! A check list names tests (by exact title or by pattern), the status they
//! should get and the log fragments that identify the known issue:
//!
//! ```yaml
//! tests:
//!   - title: tempest.api.compute.servers.test_servers.ServersTestJSON.test_reboot
//!     status: known_issue
//!     errors:
//!       - "Timed out waiting for server"
//!     defects: [LP-1234]
//!   - title_regex: 'tempest\.scenario\..*'
//!     status: product_failed
//! ```
//!
//! Every failed test of the run is matched against the list: exact titles
//! first, then patterns. When the latest result comment contains every listed
//! fragment, a new result with the entry's status is added and the test is
//! taken out of further matching.

use std::collections::HashSet;
use std::path::Path;

use futures::TryStreamExt;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use trr_client::{Filter, Test, TestRailClient};

use crate::context::{ConfigSelection, ProjectContext};
use crate::error::{EntityKind, ReporterError, Result};
use crate::extract::read_file;

/// Comment attached to every result the analyzer adds.
pub const ANALYZER_COMMENT: &str = "Set by result analyzer";

#[derive(Debug, Clone)]
pub enum TitleMatcher {
    Exact(String),
    Pattern(Regex),
}

impl TitleMatcher {
    fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    pub fn matches(&self, title: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == title,
            Self::Pattern(pattern) => pattern.is_match(title),
        }
    }
}

/// One known issue.
#[derive(Debug, Clone)]
pub struct CheckItem {
    pub title: TitleMatcher,
    /// Status name or label to set.
    pub status: String,
    /// Fragments that must all appear in the latest result comment.
    pub errors: Vec<String>,
    pub defects: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckList {
    pub tests: Vec<CheckItem>,
}

#[derive(Deserialize)]
struct RawCheckList {
    #[serde(default)]
    tests: Vec<RawCheckItem>,
}

#[derive(Deserialize)]
struct RawCheckItem {
    title: Option<String>,
    title_regex: Option<String>,
    status: Option<String>,
    #[serde(default)]
    errors: Option<Vec<String>>,
    #[serde(default)]
    defects: Option<Defects>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Defects {
    One(String),
    Many(Vec<String>),
}

impl CheckList {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawCheckList = serde_yaml::from_str(content)
            .map_err(|e| ReporterError::config(format!("invalid check list: {}", e)))?;
        let tests = raw
            .tests
            .into_iter()
            .enumerate()
            .map(|(index, item)| CheckItem::from_raw(index, item))
            .collect::<Result<_>>()?;
        Ok(Self { tests })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_yaml_str(&read_file(path)?)
    }
}

impl CheckItem {
    fn from_raw(index: usize, raw: RawCheckItem) -> Result<Self> {
        let title = match (raw.title, raw.title_regex) {
            (Some(title), None) => TitleMatcher::Exact(title),
            (None, Some(pattern)) => TitleMatcher::Pattern(Regex::new(&pattern).map_err(|e| {
                ReporterError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }
            })?),
            _ => {
                return Err(ReporterError::config(format!(
                    "check list entry {} needs exactly one of 'title' or 'title_regex'",
                    index + 1
                )))
            }
        };
        let status = raw
            .status
            .ok_or_else(|| ReporterError::config(format!("check list entry {} has no 'status'", index + 1)))?;
        let defects = match raw.defects {
            None => Vec::new(),
            Some(Defects::One(defect)) => vec![defect],
            Some(Defects::Many(defects)) => defects,
        };
        Ok(Self {
            title,
            status,
            errors: raw.errors.unwrap_or_default(),
            defects,
        })
    }
}

/// Which run to analyze.
#[derive(Debug, Clone, Default)]
pub struct RunSelector {
    pub run_name: String,
    /// Look the run up inside this plan instead of among plain runs.
    pub plan_name: Option<String>,
    pub configuration: ConfigSelection,
}

impl RunSelector {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_name: run_name.into(),
            ..Self::default()
        }
    }

    pub fn in_plan(mut self, plan_name: impl Into<String>) -> Self {
        self.plan_name = Some(plan_name.into());
        self
    }

    pub fn with_configuration(mut self, configuration: ConfigSelection) -> Self {
        self.configuration = configuration;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub run_id: u64,
    /// Failed tests examined.
    pub failed: usize,
    /// Titles of tests whose status was rewritten.
    pub rewritten: Vec<String>,
}

pub struct Analyzer<'a> {
    client: &'a TestRailClient,
    context: ProjectContext,
}

impl<'a> Analyzer<'a> {
    pub fn new(client: &'a TestRailClient, context: ProjectContext) -> Self {
        Self { client, context }
    }

    pub async fn connect(client: &'a TestRailClient, project_name: &str) -> Result<Self> {
        let context = ProjectContext::fetch(client, project_name).await?;
        Ok(Self::new(client, context))
    }

    /// Id of the selected run.
    pub async fn find_run(&self, selector: &RunSelector) -> Result<u64> {
        let project_id = self.context.project_id();
        let config_ids = self.context.config_ids(&selector.configuration)?;

        let Some(plan_name) = &selector.plan_name else {
            let mut runs = self.client.get_runs(project_id, &Filter::new());
            while let Some(run) = runs.try_next().await? {
                if run.name == selector.run_name {
                    return Ok(run.id);
                }
            }
            return Err(ReporterError::not_found(EntityKind::Run, selector.run_name.as_str()));
        };

        let mut plans = self.client.get_plans(project_id, &Filter::new());
        let mut plan_id = None;
        while let Some(plan) = plans.try_next().await? {
            if &plan.name == plan_name {
                plan_id = Some(plan.id);
                break;
            }
        }
        drop(plans);
        let plan_id = plan_id.ok_or_else(|| ReporterError::not_found(EntityKind::Plan, plan_name.as_str()))?;

        let plan = self.client.get_plan(plan_id).await?;
        plan.entries
            .iter()
            .filter(|entry| entry.name == selector.run_name)
            .flat_map(|entry| entry.runs.iter())
            .find(|run| {
                let mut ids = run.config_ids.clone();
                ids.sort_unstable();
                ids == config_ids
            })
            .map(|run| run.id)
            .ok_or_else(|| {
                ReporterError::not_found(
                    EntityKind::Run,
                    format!("{} (configuration {:?})", selector.run_name, selector.configuration),
                )
            })
    }

    /// Apply `checks` to the failed tests of the selected run.
    pub async fn analyze(&self, checks: &CheckList, selector: &RunSelector) -> Result<AnalysisSummary> {
        let run_id = self.find_run(selector).await?;
        let failed = self.context.status_id("failed")?;
        let statuses = checks
            .tests
            .iter()
            .map(|item| self.context.status_id(&item.status))
            .collect::<Result<Vec<_>>>()?;

        let tests: Vec<Test> = self
            .client
            .get_tests(run_id, &Filter::new().ids("status_id", &[failed]))
            .try_collect()
            .await?;
        info!(run_id, failed = tests.len(), checks = checks.tests.len(), "analyzing failed tests");

        let mut summary = AnalysisSummary {
            run_id,
            failed: tests.len(),
            rewritten: Vec::new(),
        };
        let mut claimed = HashSet::new();
        for exact_phase in [true, false] {
            for (item, status_id) in checks.tests.iter().zip(&statuses) {
                if item.title.is_exact() != exact_phase {
                    continue;
                }
                for test in &tests {
                    if claimed.contains(&test.id) || !item.title.matches(&test.title) {
                        continue;
                    }
                    // A test stays open to later entries until one rewrites it.
                    if self.apply(item, *status_id, test).await? {
                        claimed.insert(test.id);
                        summary.rewritten.push(test.title.clone());
                    }
                }
            }
        }

        info!(run_id, rewritten = summary.rewritten.len(), "analysis finished");
        Ok(summary)
    }

    /// Rewrite the status of `test` when its latest comment carries every
    /// fragment of `item`.
    async fn apply(&self, item: &CheckItem, status_id: u64, test: &Test) -> Result<bool> {
        if !item.errors.is_empty() {
            let latest = self.client.get_results(test.id, &Filter::new()).try_next().await?;
            let comment = latest.and_then(|r| r.comment).filter(|c| !c.is_empty());
            let Some(comment) = comment else {
                warn!(test = %test.title, "latest result has no log");
                return Ok(false);
            };
            let comment = html_escape::decode_html_entities(&comment);
            if let Some(missing) = item.errors.iter().find(|e| !comment.contains(e.as_str())) {
                info!(test = %test.title, missing = %missing, "result does not match known issue");
                return Ok(false);
            }
        }

        let mut body = json!({ "status_id": status_id, "comment": ANALYZER_COMMENT });
        if !item.defects.is_empty() {
            body["defects"] = Value::String(item.defects.join(","));
        }
        self.client.add_result(test.id, &body).await?;
        info!(test = %test.title, status = %item.status, "test status rewritten");
        Ok(true)
    }
}
