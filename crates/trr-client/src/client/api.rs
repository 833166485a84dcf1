//! One method per TestRail API v2 endpoint.
//!
//! Bulk endpoints return a [`Listing`] that follows pagination lazily;
//! small lookup tables are collected into a `Vec`.

use std::path::Path;

use serde::Serialize;

use super::{Filter, Listing, TestRailClient};
use crate::error::{ApiError, ApiResult};
use crate::types::{
    Attachment, Case, CaseField, CaseType, ConfigGroup, Configuration, Milestone, Plan, PlanEntry,
    Priority, Project, ResultField, Run, Section, Status, Suite, Template, Test, TestResult, User,
};

impl TestRailClient {
    // Projects

    pub async fn get_project(&self, project_id: u64) -> ApiResult<Project> {
        self.get_as(&format!("get_project/{}", project_id)).await
    }

    pub fn get_projects(&self, filter: &Filter) -> Listing<'_, Project> {
        self.list(filter.apply("get_projects".to_string()), "projects")
    }

    pub async fn add_project(&self, body: &impl Serialize) -> ApiResult<Project> {
        self.post_as("add_project", body).await
    }

    pub async fn update_project(&self, project_id: u64, body: &impl Serialize) -> ApiResult<Project> {
        self.post_as(&format!("update_project/{}", project_id), body).await
    }

    pub async fn delete_project(&self, project_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_project/{}", project_id)).await
    }

    // Suites

    pub async fn get_suite(&self, suite_id: u64) -> ApiResult<Suite> {
        self.get_as(&format!("get_suite/{}", suite_id)).await
    }

    pub async fn get_suites(&self, project_id: u64) -> ApiResult<Vec<Suite>> {
        self.list_all(format!("get_suites/{}", project_id), "suites").await
    }

    pub async fn add_suite(&self, project_id: u64, body: &impl Serialize) -> ApiResult<Suite> {
        self.post_as(&format!("add_suite/{}", project_id), body).await
    }

    pub async fn update_suite(&self, suite_id: u64, body: &impl Serialize) -> ApiResult<Suite> {
        self.post_as(&format!("update_suite/{}", suite_id), body).await
    }

    pub async fn delete_suite(&self, suite_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_suite/{}", suite_id)).await
    }

    // Sections

    pub async fn get_section(&self, section_id: u64) -> ApiResult<Section> {
        self.get_as(&format!("get_section/{}", section_id)).await
    }

    pub fn get_sections(&self, project_id: u64, suite_id: u64) -> Listing<'_, Section> {
        self.list(
            format!("get_sections/{}&suite_id={}", project_id, suite_id),
            "sections",
        )
    }

    pub async fn add_section(&self, project_id: u64, body: &impl Serialize) -> ApiResult<Section> {
        self.post_as(&format!("add_section/{}", project_id), body).await
    }

    pub async fn update_section(&self, section_id: u64, body: &impl Serialize) -> ApiResult<Section> {
        self.post_as(&format!("update_section/{}", section_id), body).await
    }

    pub async fn delete_section(&self, section_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_section/{}", section_id)).await
    }

    // Cases

    pub async fn get_case(&self, case_id: u64) -> ApiResult<Case> {
        self.get_as(&format!("get_case/{}", case_id)).await
    }

    /// Cases of a suite, optionally narrowed by `section_id` etc. in `filter`.
    pub fn get_cases(&self, project_id: u64, suite_id: u64, filter: &Filter) -> Listing<'_, Case> {
        let uri = format!("get_cases/{}&suite_id={}", project_id, suite_id);
        self.list(filter.apply(uri), "cases")
    }

    pub async fn add_case(&self, section_id: u64, body: &impl Serialize) -> ApiResult<Case> {
        self.post_as(&format!("add_case/{}", section_id), body).await
    }

    pub async fn update_case(&self, case_id: u64, body: &impl Serialize) -> ApiResult<Case> {
        self.post_as(&format!("update_case/{}", case_id), body).await
    }

    pub async fn delete_case(&self, case_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_case/{}", case_id)).await
    }

    pub async fn get_case_fields(&self) -> ApiResult<Vec<CaseField>> {
        self.list_all("get_case_fields".to_string(), "case_fields").await
    }

    pub async fn get_case_types(&self) -> ApiResult<Vec<CaseType>> {
        self.list_all("get_case_types".to_string(), "case_types").await
    }

    // Configurations

    pub async fn get_configs(&self, project_id: u64) -> ApiResult<Vec<ConfigGroup>> {
        self.list_all(format!("get_configs/{}", project_id), "configs").await
    }

    pub async fn add_config_group(&self, project_id: u64, body: &impl Serialize) -> ApiResult<ConfigGroup> {
        self.post_as(&format!("add_config_group/{}", project_id), body).await
    }

    pub async fn add_config(&self, group_id: u64, body: &impl Serialize) -> ApiResult<Configuration> {
        self.post_as(&format!("add_config/{}", group_id), body).await
    }

    pub async fn update_config_group(&self, group_id: u64, body: &impl Serialize) -> ApiResult<ConfigGroup> {
        self.post_as(&format!("update_config_group/{}", group_id), body).await
    }

    pub async fn update_config(&self, config_id: u64, body: &impl Serialize) -> ApiResult<Configuration> {
        self.post_as(&format!("update_config/{}", config_id), body).await
    }

    pub async fn delete_config_group(&self, group_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_config_group/{}", group_id)).await
    }

    pub async fn delete_config(&self, config_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_config/{}", config_id)).await
    }

    // Milestones

    pub async fn get_milestone(&self, milestone_id: u64) -> ApiResult<Milestone> {
        self.get_as(&format!("get_milestone/{}", milestone_id)).await
    }

    /// Milestones of a project; `is_completed`/`is_started` go in `filter`.
    pub fn get_milestones(&self, project_id: u64, filter: &Filter) -> Listing<'_, Milestone> {
        self.list(filter.apply(format!("get_milestones/{}", project_id)), "milestones")
    }

    /// Sub-milestones of a milestone (carried inline by `get_milestone`).
    pub async fn get_submilestones(&self, milestone_id: u64) -> ApiResult<Vec<Milestone>> {
        Ok(self.get_milestone(milestone_id).await?.milestones)
    }

    pub async fn add_milestone(&self, project_id: u64, body: &impl Serialize) -> ApiResult<Milestone> {
        self.post_as(&format!("add_milestone/{}", project_id), body).await
    }

    pub async fn update_milestone(&self, milestone_id: u64, body: &impl Serialize) -> ApiResult<Milestone> {
        self.post_as(&format!("update_milestone/{}", milestone_id), body).await
    }

    pub async fn delete_milestone(&self, milestone_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_milestone/{}", milestone_id)).await
    }

    // Plans

    pub async fn get_plan(&self, plan_id: u64) -> ApiResult<Plan> {
        self.get_as(&format!("get_plan/{}", plan_id)).await
    }

    pub fn get_plans(&self, project_id: u64, filter: &Filter) -> Listing<'_, Plan> {
        self.list(filter.apply(format!("get_plans/{}", project_id)), "plans")
    }

    pub async fn add_plan(&self, project_id: u64, body: &impl Serialize) -> ApiResult<Plan> {
        self.post_as(&format!("add_plan/{}", project_id), body).await
    }

    pub async fn add_plan_entry(&self, plan_id: u64, body: &impl Serialize) -> ApiResult<PlanEntry> {
        self.post_as(&format!("add_plan_entry/{}", plan_id), body).await
    }

    pub async fn update_plan(&self, plan_id: u64, body: &impl Serialize) -> ApiResult<Plan> {
        self.post_as(&format!("update_plan/{}", plan_id), body).await
    }

    pub async fn update_plan_entry(
        &self,
        plan_id: u64,
        entry_id: &str,
        body: &impl Serialize,
    ) -> ApiResult<PlanEntry> {
        self.post_as(&format!("update_plan_entry/{}/{}", plan_id, entry_id), body)
            .await
    }

    pub async fn close_plan(&self, plan_id: u64) -> ApiResult<Plan> {
        let value = self.http.post(&format!("close_plan/{}", plan_id), None).await?;
        super::decode(value, "close_plan")
    }

    pub async fn delete_plan(&self, plan_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_plan/{}", plan_id)).await
    }

    pub async fn delete_plan_entry(&self, plan_id: u64, entry_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("delete_plan_entry/{}/{}", plan_id, entry_id))
            .await
    }

    // Priorities, statuses, templates, result fields

    pub async fn get_priorities(&self) -> ApiResult<Vec<Priority>> {
        self.list_all("get_priorities".to_string(), "priorities").await
    }

    pub async fn get_statuses(&self) -> ApiResult<Vec<Status>> {
        self.list_all("get_statuses".to_string(), "statuses").await
    }

    pub async fn get_templates(&self, project_id: u64) -> ApiResult<Vec<Template>> {
        self.list_all(format!("get_templates/{}", project_id), "templates").await
    }

    pub async fn get_result_fields(&self) -> ApiResult<Vec<ResultField>> {
        self.list_all("get_result_fields".to_string(), "result_fields").await
    }

    // Results

    /// Results of a test, newest first.
    pub fn get_results(&self, test_id: u64, filter: &Filter) -> Listing<'_, TestResult> {
        self.list(filter.apply(format!("get_results/{}", test_id)), "results")
    }

    pub fn get_results_for_case(&self, run_id: u64, case_id: u64, filter: &Filter) -> Listing<'_, TestResult> {
        let uri = format!("get_results_for_case/{}/{}", run_id, case_id);
        self.list(filter.apply(uri), "results")
    }

    pub fn get_results_for_run(&self, run_id: u64, filter: &Filter) -> Listing<'_, TestResult> {
        self.list(filter.apply(format!("get_results_for_run/{}", run_id)), "results")
    }

    pub async fn add_result(&self, test_id: u64, body: &impl Serialize) -> ApiResult<TestResult> {
        self.post_as(&format!("add_result/{}", test_id), body).await
    }

    pub async fn add_result_for_case(
        &self,
        run_id: u64,
        case_id: u64,
        body: &impl Serialize,
    ) -> ApiResult<TestResult> {
        self.post_as(&format!("add_result_for_case/{}/{}", run_id, case_id), body)
            .await
    }

    /// Bulk results keyed by `test_id`; `body` is `{"results": [...]}`.
    pub async fn add_results(&self, run_id: u64, body: &impl Serialize) -> ApiResult<Vec<TestResult>> {
        self.post_as(&format!("add_results/{}", run_id), body).await
    }

    /// Bulk results keyed by `case_id`; `body` is `{"results": [...]}`.
    pub async fn add_results_for_cases(
        &self,
        run_id: u64,
        body: &impl Serialize,
    ) -> ApiResult<Vec<TestResult>> {
        self.post_as(&format!("add_results_for_cases/{}", run_id), body)
            .await
    }

    // Runs

    pub async fn get_run(&self, run_id: u64) -> ApiResult<Run> {
        self.get_as(&format!("get_run/{}", run_id)).await
    }

    /// Standalone runs of a project (plan runs are listed via the plan).
    pub fn get_runs(&self, project_id: u64, filter: &Filter) -> Listing<'_, Run> {
        self.list(filter.apply(format!("get_runs/{}", project_id)), "runs")
    }

    pub async fn add_run(&self, project_id: u64, body: &impl Serialize) -> ApiResult<Run> {
        self.post_as(&format!("add_run/{}", project_id), body).await
    }

    pub async fn update_run(&self, run_id: u64, body: &impl Serialize) -> ApiResult<Run> {
        self.post_as(&format!("update_run/{}", run_id), body).await
    }

    pub async fn close_run(&self, run_id: u64) -> ApiResult<Run> {
        let value = self.http.post(&format!("close_run/{}", run_id), None).await?;
        super::decode(value, "close_run")
    }

    pub async fn delete_run(&self, run_id: u64) -> ApiResult<()> {
        self.post_empty(&format!("delete_run/{}", run_id)).await
    }

    // Tests

    pub async fn get_test(&self, test_id: u64) -> ApiResult<Test> {
        self.get_as(&format!("get_test/{}", test_id)).await
    }

    /// Tests of a run; `status_id` goes in `filter`.
    pub fn get_tests(&self, run_id: u64, filter: &Filter) -> Listing<'_, Test> {
        self.list(filter.apply(format!("get_tests/{}", run_id)), "tests")
    }

    // Users

    pub async fn get_user(&self, user_id: u64) -> ApiResult<User> {
        self.get_as(&format!("get_user/{}", user_id)).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> ApiResult<User> {
        self.get_as(&format!("get_user_by_email&email={}", email)).await
    }

    pub async fn get_users(&self) -> ApiResult<Vec<User>> {
        self.list_all("get_users".to_string(), "users").await
    }

    // Attachments

    pub async fn get_attachment(&self, attachment_id: u64) -> ApiResult<Vec<u8>> {
        self.http
            .get_bytes(&format!("get_attachment/{}", attachment_id))
            .await
    }

    pub async fn add_attachment_to_result(&self, result_id: u64, file: &Path) -> ApiResult<Attachment> {
        let content = tokio::fs::read(file).await.map_err(|e| ApiError::Config {
            message: format!("failed to read attachment {}: {}", file.display(), e),
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let value = self
            .http
            .post_file(&format!("add_attachment_to_result/{}", result_id), file_name, content)
            .await?;
        super::decode(value, "add_attachment_to_result")
    }
}
