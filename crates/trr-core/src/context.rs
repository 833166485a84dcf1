//! Per-project reference tables used for name to id resolution.
//!
//! The snapshot is fetched once and then only read. A new publish or
//! update run builds a new context.

use std::collections::{BTreeMap, HashMap};

use futures::TryStreamExt;
use tracing::{debug, info};
use trr_client::{CaseField, CaseType, ConfigGroup, Filter, Milestone, Priority, Project, Status, TestRailClient};

use crate::error::{EntityKind, ReporterError, Result};
use crate::extract::{Reference, StatusRef};

/// Configuration selection: group name to configuration name.
pub type ConfigSelection = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct ProjectContext {
    project: Project,
    statuses: Vec<Status>,
    milestones: BTreeMap<String, u64>,
    case_types: BTreeMap<String, u64>,
    priorities: BTreeMap<String, u64>,
    /// Field system name -> option label -> option id.
    case_field_options: HashMap<String, BTreeMap<String, u64>>,
    /// Group name -> configuration name -> configuration id.
    configurations: BTreeMap<String, BTreeMap<String, u64>>,
}

impl ProjectContext {
    /// Empty snapshot for `project`.
    pub fn new(project: Project) -> Self {
        Self {
            project,
            statuses: Vec::new(),
            milestones: BTreeMap::new(),
            case_types: BTreeMap::new(),
            priorities: BTreeMap::new(),
            case_field_options: HashMap::new(),
            configurations: BTreeMap::new(),
        }
    }

    /// Look the project up by name and fetch all reference tables.
    pub async fn fetch(client: &TestRailClient, project_name: &str) -> Result<Self> {
        let project = find_project(client, project_name).await?;
        let project_id = project.id;

        let open = Filter::new().flag("is_completed", false);
        let milestones: Vec<Milestone> = client.get_milestones(project_id, &open).try_collect().await?;

        let context = Self::new(project)
            .with_statuses(client.get_statuses().await?)
            .with_milestones(milestones)
            .with_case_types(client.get_case_types().await?)
            .with_priorities(client.get_priorities().await?)
            .with_case_fields(client.get_case_fields().await?)
            .with_configurations(client.get_configs(project_id).await?);

        info!(
            project = %context.project.name,
            project_id,
            statuses = context.statuses.len(),
            milestones = context.milestones.len(),
            configurations = context.configurations.len(),
            "project context loaded"
        );
        Ok(context)
    }

    pub fn with_statuses(mut self, statuses: Vec<Status>) -> Self {
        self.statuses = statuses;
        self
    }

    /// Open milestones; nested sub-milestones are flattened in.
    pub fn with_milestones(mut self, milestones: Vec<Milestone>) -> Self {
        let mut pending = milestones;
        while let Some(milestone) = pending.pop() {
            self.milestones.insert(milestone.name, milestone.id);
            pending.extend(milestone.milestones);
        }
        self
    }

    pub fn with_case_types(mut self, case_types: Vec<CaseType>) -> Self {
        self.case_types = case_types.into_iter().map(|t| (t.name, t.id)).collect();
        self
    }

    pub fn with_priorities(mut self, priorities: Vec<Priority>) -> Self {
        self.priorities = priorities.into_iter().map(|p| (p.name, p.id)).collect();
        self
    }

    pub fn with_case_fields(mut self, fields: Vec<CaseField>) -> Self {
        for field in fields {
            let options = self.case_field_options.entry(field.system_name).or_default();
            for config in &field.configs {
                if let Some(items) = &config.options.items {
                    options.extend(parse_options(items));
                }
            }
        }
        self
    }

    pub fn with_configurations(mut self, groups: Vec<ConfigGroup>) -> Self {
        self.configurations = groups
            .into_iter()
            .map(|g| (g.name, g.configs.into_iter().map(|c| (c.name, c.id)).collect()))
            .collect();
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_id(&self) -> u64 {
        self.project.id
    }

    /// Status id by system name or label, case-insensitive.
    pub fn status_id(&self, label: &str) -> Result<u64> {
        self.statuses
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(label) || s.label.eq_ignore_ascii_case(label))
            .map(|s| s.id)
            .ok_or_else(|| ReporterError::not_found(EntityKind::Status, label))
    }

    pub fn resolve_status(&self, status: &StatusRef) -> Result<u64> {
        match status {
            StatusRef::Id(id) => Ok(*id),
            StatusRef::Label(label) => self.status_id(label),
        }
    }

    /// Ids of every status whose name is not in `excluded`.
    pub fn status_ids_except(&self, excluded: &[&str]) -> Vec<u64> {
        self.statuses
            .iter()
            .filter(|s| !excluded.iter().any(|e| s.name.eq_ignore_ascii_case(e)))
            .map(|s| s.id)
            .collect()
    }

    pub fn milestone_id(&self, name: &str) -> Result<u64> {
        lookup(&self.milestones, EntityKind::Milestone, name)
    }

    pub fn case_type_id(&self, name: &str) -> Result<u64> {
        lookup(&self.case_types, EntityKind::CaseType, name)
    }

    pub fn priority_id(&self, name: &str) -> Result<u64> {
        lookup(&self.priorities, EntityKind::Priority, name)
    }

    /// Resolve a name-or-id reference of the given kind.
    pub fn resolve(&self, kind: EntityKind, reference: &Reference) -> Result<u64> {
        let name = match reference {
            Reference::Id(id) => return Ok(*id),
            Reference::Name(name) => name,
        };
        match kind {
            EntityKind::Milestone => self.milestone_id(name),
            EntityKind::CaseType => self.case_type_id(name),
            EntityKind::Priority => self.priority_id(name),
            other => Err(ReporterError::not_found(other, name.as_str())),
        }
    }

    /// Option id of `label` in custom case field `field`.
    pub fn custom_option_id(&self, field: &str, label: &str) -> Result<u64> {
        let options = self
            .case_field_options
            .get(field)
            .or_else(|| self.case_field_options.get(&format!("custom_{}", field)))
            .ok_or_else(|| ReporterError::not_found(EntityKind::CaseField, field))?;
        options
            .get(label)
            .copied()
            .ok_or_else(|| ReporterError::not_found(EntityKind::CaseFieldOption, format!("{}: {}", field, label)))
    }

    /// Sorted configuration ids for a group -> name selection.
    pub fn config_ids(&self, selection: &ConfigSelection) -> Result<Vec<u64>> {
        let mut ids = selection
            .iter()
            .map(|(group, name)| {
                self.configurations
                    .get(group)
                    .and_then(|configs| configs.get(name))
                    .copied()
                    .ok_or_else(|| ReporterError::not_found(EntityKind::Configuration, format!("{}: {}", group, name)))
            })
            .collect::<Result<Vec<_>>>()?;
        ids.sort_unstable();
        Ok(ids)
    }
}

async fn find_project(client: &TestRailClient, name: &str) -> Result<Project> {
    let mut projects = client.get_projects(&Filter::new());
    while let Some(project) = projects.try_next().await? {
        if project.name == name {
            debug!(project = %name, id = project.id, "project found");
            return Ok(project);
        }
    }
    Err(ReporterError::not_found(EntityKind::Project, name))
}

fn lookup(table: &BTreeMap<String, u64>, kind: EntityKind, name: &str) -> Result<u64> {
    table
        .get(name)
        .copied()
        .ok_or_else(|| ReporterError::not_found(kind, name))
}

/// Parse an option table: one `id, label` pair per line.
fn parse_options(items: &str) -> impl Iterator<Item = (String, u64)> + '_ {
    items.lines().filter_map(|line| {
        let (id, label) = line.split_once(',')?;
        let id = id.trim().parse().ok()?;
        Some((label.trim().to_string(), id))
    })
}
