//! Result upload into a plan run.

use std::collections::HashMap;

use futures::TryStreamExt;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use trr_client::{ApiError, Filter, Plan, Test};

use super::batch::{split_into_batches, truncate_comment};
use super::description::merge_description;
use super::{PublishOptions, PublishSummary, Reporter};
use crate::error::{EntityKind, ReporterError, Result};
use crate::extract::{ResultBucket, ResultRecord};

const TEARDOWN_DELIMITER: &str = "=================================";

/// Run selected (or created) inside the plan.
struct RunTarget {
    entry_id: String,
    run_id: u64,
    url: Option<String>,
    created: bool,
}

impl Reporter<'_> {
    /// Upload `bucket` into run `options.run_name` of plan `options.plan_name`.
    pub async fn publish_results(&self, bucket: ResultBucket, options: &PublishOptions) -> Result<PublishSummary> {
        let suite = self
            .find_suite(&options.suite_name)
            .await?
            .ok_or_else(|| ReporterError::not_found(EntityKind::Suite, options.suite_name.as_str()))?;
        let config_ids = self.context.config_ids(&options.configuration)?;
        let milestone_id = options
            .milestone
            .as_deref()
            .map(|name| self.context.milestone_id(name))
            .transpose()?;

        let plan = self.resolve_plan(options, milestone_id).await?;
        info!(plan = %plan.name, plan_id = plan.id, url = plan.url.as_deref().unwrap_or_default(), "test plan resolved");

        let run = self.resolve_run(&plan, suite.id, &config_ids, options).await?;
        if !run.created {
            info!(run_id = run.run_id, "including all cases before upload");
            self.client
                .update_plan_entry(plan.id, &run.entry_id, &json!({ "include_all": true }))
                .await?;
        }

        let tests: Vec<Test> = self.client.get_tests(run.run_id, &Filter::new()).try_collect().await?;
        let results = self.build_results(bucket, &tests, options.comment_limit)?;
        let submitted = results.len();

        let batches = split_into_batches(results, options.payload_limit);
        let batch_count = batches.len();
        if batch_count > 1 {
            info!(batches = batch_count, limit = ?options.payload_limit, "results split into batches");
        }
        for batch in batches {
            debug!(run_id = run.run_id, entries = batch.len(), "submitting results");
            self.client
                .add_results(run.run_id, &json!({ "results": batch }))
                .await?;
        }
        info!(run_id = run.run_id, submitted, "results uploaded");

        let removed = options.removed_statuses();
        let pruned = if removed.is_empty() {
            None
        } else {
            let kept = self.prune(&plan, &run, &config_ids, &removed).await?;
            Some(tests.len().saturating_sub(kept))
        };

        Ok(PublishSummary {
            plan_id: plan.id,
            run_id: run.run_id,
            run_url: run.url,
            run_created: run.created,
            submitted,
            batches: batch_count,
            pruned,
        })
    }

    /// Plan with the same name and milestone, or a new one.
    async fn resolve_plan(&self, options: &PublishOptions, milestone_id: Option<u64>) -> Result<Plan> {
        let project_id = self.context.project_id();
        let mut plans = self.client.get_plans(project_id, &Filter::new());
        let mut found = None;
        while let Some(plan) = plans.try_next().await? {
            if plan.name == options.plan_name && plan.milestone_id == milestone_id {
                found = Some(plan.id);
                break;
            }
        }
        drop(plans);

        if let Some(plan_id) = found {
            let plan = self.client.get_plan(plan_id).await?;
            if let Some(text) = &options.plan_description {
                let description = merge_description(plan.description.as_deref(), text);
                self.client
                    .update_plan(plan.id, &json!({ "description": description }))
                    .await?;
            }
            return Ok(plan);
        }

        info!(plan = %options.plan_name, "test plan not found, creating it");
        let mut body = Map::new();
        body.insert("name".into(), Value::String(options.plan_name.clone()));
        if let Some(id) = milestone_id {
            body.insert("milestone_id".into(), id.into());
        }
        if let Some(text) = &options.plan_description {
            body.insert("description".into(), merge_description(None, text).into());
        }
        Ok(self.client.add_plan(project_id, &Value::Object(body)).await?)
    }

    /// Entry with the same run name and sorted configuration ids, or a new one.
    async fn resolve_run(
        &self,
        plan: &Plan,
        suite_id: u64,
        config_ids: &[u64],
        options: &PublishOptions,
    ) -> Result<RunTarget> {
        let existing = plan
            .entries
            .iter()
            .filter(|entry| entry.name == options.run_name)
            .flat_map(|entry| entry.runs.iter().map(move |run| (entry, run)))
            .find(|(_, run)| {
                let mut run_configs = run.config_ids.clone();
                run_configs.sort_unstable();
                run_configs == config_ids
            });

        if let Some((entry, run)) = existing {
            let url = run.url.clone().unwrap_or_else(|| format!("run #{}", run.id));
            if !options.update_existing {
                return Err(ReporterError::Conflict {
                    message: format!("test run '{}' already present: {}", options.run_name, url),
                });
            }
            warn!(run = %url, "test run will be overridden");
            if let Some(text) = &options.run_description {
                let description = merge_description(run.description.as_deref(), text);
                self.client
                    .update_plan_entry(plan.id, &entry.id, &json!({ "description": description }))
                    .await?;
            }
            return Ok(RunTarget {
                entry_id: entry.id.clone(),
                run_id: run.id,
                url: run.url.clone(),
                created: false,
            });
        }

        let mut body = Map::new();
        body.insert("suite_id".into(), suite_id.into());
        body.insert("name".into(), Value::String(options.run_name.clone()));
        if !config_ids.is_empty() {
            body.insert("config_ids".into(), json!(config_ids));
            body.insert("runs".into(), json!([{ "config_ids": config_ids }]));
        }
        if let Some(text) = &options.run_description {
            body.insert("description".into(), merge_description(None, text).into());
        }
        let entry = self.client.add_plan_entry(plan.id, &Value::Object(body)).await?;
        let run = entry.runs.first().ok_or_else(|| ApiError::InvalidResponse {
            message: format!("plan entry '{}' has no run", entry.name),
        })?;
        info!(run = run.url.as_deref().unwrap_or_default(), run_id = run.id, "test run created");
        Ok(RunTarget {
            entry_id: entry.id.clone(),
            run_id: run.id,
            url: run.url.clone(),
            created: true,
        })
    }

    /// Resolve records against the run's tests into `add_results` entries.
    fn build_results(&self, bucket: ResultBucket, tests: &[Test], comment_limit: Option<usize>) -> Result<Vec<Value>> {
        let ResultBucket {
            mut normal,
            setup,
            teardown,
        } = bucket;
        fold_teardown(&mut normal, &teardown);

        let mut by_title: HashMap<&str, u64> = HashMap::with_capacity(tests.len());
        for test in tests {
            by_title.entry(test.title.as_str()).or_insert(test.id);
        }

        let mut results = Vec::with_capacity(normal.len());
        for mut record in normal {
            let test_id = by_title
                .get(record.test_id.as_str())
                .copied()
                .ok_or_else(|| ReporterError::not_found(EntityKind::Test, record.test_id.as_str()))?;
            let status_id = self.context.resolve_status(&record.status)?;
            if let Some(limit) = comment_limit {
                if record.comment.chars().count() > limit {
                    info!(test = %record.test_id, limit, "comment truncated");
                    record.comment = truncate_comment(&record.comment, limit);
                }
            }
            results.push(record.to_payload(test_id, status_id));
        }

        for record in setup {
            let status_id = self.context.resolve_status(&record.status)?;
            let before = results.len();
            results.extend(
                tests
                    .iter()
                    .filter(|test| test.title.contains(&record.test_id))
                    .map(|test| record.to_payload(test.id, status_id)),
            );
            debug!(group = %record.test_id, tests = results.len() - before, "setup result fanned out");
        }
        Ok(results)
    }

    /// Restrict the plan entry to tests not in `removed` statuses. Returns the
    /// number of cases kept.
    async fn prune(&self, plan: &Plan, run: &RunTarget, config_ids: &[u64], removed: &[&str]) -> Result<usize> {
        info!(statuses = ?removed, "removing tests by status");
        let remaining = self.context.status_ids_except(removed);
        let filter = Filter::new().ids("status_id", &remaining);
        let kept: Vec<Test> = self.client.get_tests(run.run_id, &filter).try_collect().await?;
        let case_ids: Vec<u64> = kept.iter().filter_map(|t| t.case_id).collect();

        let mut body = json!({ "include_all": false, "case_ids": case_ids });
        if !config_ids.is_empty() {
            body["config_ids"] = json!(config_ids);
        }
        self.client.update_plan_entry(plan.id, &run.entry_id, &body).await?;
        Ok(case_ids.len())
    }
}

/// Append each teardown failure to the comment of every normal record whose
/// id contains the teardown's group id.
fn fold_teardown(normal: &mut [ResultRecord], teardown: &[ResultRecord]) {
    for failure in teardown {
        for record in normal.iter_mut().filter(|r| r.test_id.contains(&failure.test_id)) {
            if !record.comment.is_empty() && !record.comment.ends_with('\n') {
                record.comment.push('\n');
            }
            record.comment.push_str(&format!(
                "{d}\nSome TearDown actions are failed:\n{d}\n{}",
                failure.comment,
                d = TEARDOWN_DELIMITER
            ));
            warn!(test = %record.test_id, "test case has a failed teardown action");
        }
    }
}
