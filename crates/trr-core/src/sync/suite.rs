//! Suite update: create missing sections and cases.

use std::collections::HashMap;

use futures::TryStreamExt;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use trr_client::{Case, Filter};

use super::{CasePolicy, Reporter, SuiteUpdateSummary};
use crate::error::{EntityKind, ReporterError, Result};
use crate::extract::{Reference, TestCaseRecord};

impl Reporter<'_> {
    /// Make the suite `name` contain every case of `cases`. Titles are the
    /// natural key: a title already present is never created twice.
    pub async fn update_test_suite(
        &self,
        name: &str,
        mut cases: Vec<TestCaseRecord>,
        policy: CasePolicy,
    ) -> Result<SuiteUpdateSummary> {
        let project_id = self.context.project_id();
        let mut summary = SuiteUpdateSummary::default();

        let suite = match self.find_suite(name).await? {
            Some(suite) => suite,
            None => {
                info!(suite = %name, "creating test suite");
                summary.suite_created = true;
                self.client.add_suite(project_id, &json!({ "name": name })).await?
            }
        };
        summary.suite_id = suite.id;

        let mut existing: HashMap<String, Case> = self
            .client
            .get_cases(project_id, suite.id, &Filter::new())
            .map_ok(|case| (case.title.clone(), case))
            .try_collect()
            .await?;

        if policy == CasePolicy::CreateMissing {
            let total = cases.len();
            cases.retain(|case| !existing.contains_key(&case.title));
            summary.cases_skipped = total - cases.len();
            info!(total, remaining = cases.len(), "existing cases excluded");
        }

        let mut sections: HashMap<String, u64> = self
            .client
            .get_sections(project_id, suite.id)
            .map_ok(|section| (section.name, section.id))
            .try_collect()
            .await?;

        for case in cases {
            let section_id = match &case.section {
                Some(Reference::Id(id)) => *id,
                Some(Reference::Name(section)) => match sections.get(section) {
                    Some(id) => *id,
                    None => {
                        info!(section = %section, "creating section");
                        let created = self
                            .client
                            .add_section(project_id, &json!({ "suite_id": suite.id, "name": section }))
                            .await?;
                        summary.sections_created += 1;
                        sections.insert(section.clone(), created.id);
                        created.id
                    }
                },
                None => return Err(ReporterError::field_missed("section_id")),
            };
            let body = self.case_body(&case)?;

            match existing.get(&case.title) {
                None => {
                    info!(title = %case.title, section_id, "creating case");
                    let created = self.client.add_case(section_id, &Value::Object(body)).await?;
                    summary.cases_created += 1;
                    existing.insert(created.title.clone(), created);
                }
                Some(_) if policy == CasePolicy::CreateMissing => summary.cases_skipped += 1,
                Some(remote) => {
                    let changes = changed_fields(remote, section_id, body);
                    if changes.is_empty() {
                        summary.cases_skipped += 1;
                        continue;
                    }
                    debug!(title = %case.title, fields = ?changes.keys().collect::<Vec<_>>(), "case differs");
                    info!(title = %case.title, case_id = remote.id, "updating case");
                    self.client.update_case(remote.id, &Value::Object(changes)).await?;
                    summary.cases_updated += 1;
                }
            }
        }

        info!(
            suite = %name,
            created = summary.cases_created,
            updated = summary.cases_updated,
            skipped = summary.cases_skipped,
            "test suite updated"
        );
        Ok(summary)
    }

    /// Case body with every symbolic reference resolved to an id.
    fn case_body(&self, case: &TestCaseRecord) -> Result<Map<String, Value>> {
        let mut body = case.fields.clone();
        body.insert("title".into(), Value::String(case.title.clone()));

        let references = [
            ("type_id", EntityKind::CaseType, &case.type_id),
            ("milestone_id", EntityKind::Milestone, &case.milestone_id),
            ("priority_id", EntityKind::Priority, &case.priority_id),
        ];
        for (key, kind, reference) in references {
            if let Some(reference) = reference {
                body.insert(key.into(), self.context.resolve(kind, reference)?.into());
            }
        }

        for field in &self.custom_fields.attributes2id {
            match body.get(field) {
                Some(Value::String(label)) => {
                    let id = self.context.custom_option_id(field, label)?;
                    body.insert(field.clone(), id.into());
                }
                Some(_) => {}
                None => warn!(field = %field, title = %case.title, "custom field is not set on the case"),
            }
        }
        Ok(body)
    }
}

/// Fields of `body` (and the section) that differ from the remote case.
fn changed_fields(remote: &Case, section_id: u64, body: Map<String, Value>) -> Map<String, Value> {
    let mut changes: Map<String, Value> = body
        .into_iter()
        .filter(|(key, value)| match key.as_str() {
            "title" => false,
            _ => remote.fields.get(key) != Some(value),
        })
        .collect();
    if remote.section_id != Some(section_id) {
        changes.insert("section_id".into(), section_id.into());
    }
    changes
}
