//! Synchronization of extracted records with the remote service.
//!
//! [`Reporter`] holds a client reference and a project snapshot. It creates
//! missing suites, sections and cases ([`Reporter::update_test_suite`]) and
//! uploads results into a plan run ([`Reporter::publish_results`]).
//!
//! Every remote call is awaited before the next one starts. A failure aborts
//! the remaining steps; batches already submitted stay applied.

mod batch;
mod description;
mod publish;
mod suite;

use trr_client::{Suite, TestRailClient};

use crate::config::CustomFieldList;
use crate::context::{ConfigSelection, ProjectContext};
use crate::error::Result;

pub use batch::{split_into_batches, truncate_comment, OMITTED_MARKER};
pub use description::{merge_description, DESCRIPTION_BEGIN, DESCRIPTION_END};

/// How cases whose title already exists in the suite are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CasePolicy {
    /// Create only cases with a new title; existing ones are left alone.
    #[default]
    CreateMissing,
    /// Also update existing cases, sending only fields that differ.
    UpdateChanged,
}

/// Outcome of a suite update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteUpdateSummary {
    pub suite_id: u64,

    /// The suite did not exist and was created.
    pub suite_created: bool,

    pub sections_created: usize,

    pub cases_created: usize,

    pub cases_updated: usize,

    /// Cases already present (and unchanged, for [`CasePolicy::UpdateChanged`]).
    pub cases_skipped: usize,
}

/// Publish target and policies.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub plan_name: String,

    pub suite_name: String,

    pub run_name: String,

    /// Milestone the plan belongs to.
    pub milestone: Option<String>,

    /// Configuration of the run (group name -> configuration name).
    pub configuration: ConfigSelection,

    /// Reuse a run with the same name and configuration instead of failing.
    pub update_existing: bool,

    pub remove_untested: bool,

    pub remove_skipped: bool,

    /// Maximum comment length in characters.
    pub comment_limit: Option<usize>,

    /// Maximum serialized size of one `add_results` body in bytes.
    pub payload_limit: Option<usize>,

    pub plan_description: Option<String>,

    pub run_description: Option<String>,
}

impl PublishOptions {
    pub fn new(plan: impl Into<String>, suite: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            plan_name: plan.into(),
            suite_name: suite.into(),
            run_name: run.into(),
            ..Self::default()
        }
    }

    pub fn with_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    pub fn with_configuration(mut self, configuration: ConfigSelection) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn update_existing(mut self, yes: bool) -> Self {
        self.update_existing = yes;
        self
    }

    pub fn remove_untested(mut self, yes: bool) -> Self {
        self.remove_untested = yes;
        self
    }

    pub fn remove_skipped(mut self, yes: bool) -> Self {
        self.remove_skipped = yes;
        self
    }

    /// Zero disables the limit.
    pub fn with_comment_limit(mut self, limit: usize) -> Self {
        self.comment_limit = (limit > 0).then_some(limit);
        self
    }

    /// Zero disables the limit.
    pub fn with_payload_limit(mut self, limit: usize) -> Self {
        self.payload_limit = (limit > 0).then_some(limit);
        self
    }

    pub fn with_plan_description(mut self, text: impl Into<String>) -> Self {
        self.plan_description = Some(text.into());
        self
    }

    pub fn with_run_description(mut self, text: impl Into<String>) -> Self {
        self.run_description = Some(text.into());
        self
    }

    /// Status names removed from the run after upload.
    fn removed_statuses(&self) -> Vec<&'static str> {
        let mut statuses = Vec::new();
        if self.remove_skipped {
            statuses.push("skipped");
        }
        if self.remove_untested {
            statuses.push("untested");
        }
        statuses
    }
}

/// Outcome of a publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub plan_id: u64,

    pub run_id: u64,

    pub run_url: Option<String>,

    /// The run was created by this publish (not reused).
    pub run_created: bool,

    /// Results sent, fan-out included.
    pub submitted: usize,

    /// Number of `add_results` calls.
    pub batches: usize,

    /// Tests dropped from the run by status pruning.
    pub pruned: Option<usize>,
}

/// Project-scoped synchronization engine.
pub struct Reporter<'a> {
    client: &'a TestRailClient,
    context: ProjectContext,
    custom_fields: CustomFieldList,
}

impl<'a> Reporter<'a> {
    pub fn new(client: &'a TestRailClient, context: ProjectContext) -> Self {
        Self {
            client,
            context,
            custom_fields: CustomFieldList::default(),
        }
    }

    /// Fetch the project snapshot and build a reporter for it.
    pub async fn connect(client: &'a TestRailClient, project_name: &str) -> Result<Self> {
        let context = ProjectContext::fetch(client, project_name).await?;
        Ok(Self::new(client, context))
    }

    /// Custom case fields whose labels are converted to option ids.
    pub fn with_custom_fields(mut self, fields: CustomFieldList) -> Self {
        self.custom_fields = fields;
        self
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    async fn find_suite(&self, name: &str) -> Result<Option<Suite>> {
        let suites = self.client.get_suites(self.context.project_id()).await?;
        Ok(suites.into_iter().find(|s| s.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_options_builder() {
        let options = PublishOptions::new("Nightly", "Tempest", "Smoke")
            .with_milestone("9.0")
            .update_existing(true)
            .remove_untested(true)
            .with_comment_limit(0)
            .with_payload_limit(100_000);
        assert_eq!(options.milestone.as_deref(), Some("9.0"));
        assert!(options.update_existing);
        assert_eq!(options.comment_limit, None);
        assert_eq!(options.payload_limit, Some(100_000));
        assert_eq!(options.removed_statuses(), vec!["untested"]);
    }

    #[test]
    fn test_removed_statuses_order() {
        let options = PublishOptions::new("p", "s", "r").remove_untested(true).remove_skipped(true);
        assert_eq!(options.removed_statuses(), vec!["skipped", "untested"]);
        assert!(PublishOptions::new("p", "s", "r").removed_statuses().is_empty());
    }
}
