//! Field maps: per-field action lists, defaults and classification rules.
//!
//! Result map (XML dialects):
//!
//! ```yaml
//! tc_tag: testcase
//! test_id:
//!   xml_actions:
//!     - get_attribute: classname
//!     - add_string: "."
//!     - get_attribute: name
//! status_id:
//!   default: passed
//!   xml_actions:
//!     - has_child_tag: failure
//!       xml_actions:
//!         - add_string: failed
//! filter_setup:
//!   match: 'setUpClass \('
//!   actions:
//!     - find: 'setUpClass \((.*)\)'
//! ```
//!
//! CSV dialects use `row_name` (plus optional text `actions` and
//! `convert_type`) instead of `xml_actions`.

use regex::Regex;
use serde_json::Value;
use serde_yaml::Mapping;
use tracing::debug;

use super::record::{BucketKind, StatusRef};
use crate::actions::{ActionList, ActionMode, ReportNode};
use crate::error::{ReporterError, Result};

const TC_TAG: &str = "testcase";
const FILTERS: [(&str, BucketKind); 2] = [
    ("filter_setup", BucketKind::Setup),
    ("filter_teardown", BucketKind::Teardown),
];

/// Cell conversion for CSV columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertType {
    Int,
    Float,
    Str,
}

impl ConvertType {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "str" => Ok(Self::Str),
            other => Err(ReporterError::config(format!(
                "unsupported convert_type '{}' (expected int, float or str)",
                other
            ))),
        }
    }

    fn apply(self, field: &str, raw: &str) -> Result<Value> {
        let fail = || {
            ReporterError::report(format!(
                "field '{}': cannot convert '{}' to {:?}",
                field, raw, self
            ))
        };
        match self {
            Self::Int => raw.trim().parse::<i64>().map(Value::from).map_err(|_| fail()),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(fail),
            Self::Str => Ok(Value::String(raw.to_string())),
        }
    }
}

/// Where a field value comes from.
#[derive(Debug, Clone)]
pub enum FieldSource {
    /// Node-mode actions on the report element.
    Node(ActionList),
    /// CSV column, optionally post-processed by text actions.
    Column {
        row_name: String,
        actions: Option<ActionList>,
    },
    /// Text-mode actions on an input string (test lists).
    Text(ActionList),
    /// Only the default applies.
    Constant,
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub source: FieldSource,
    pub default: Option<Value>,
    pub convert: Option<ConvertType>,
}

impl FieldSpec {
    fn decode(name: &str, value: &serde_yaml::Value, text_only: bool) -> Result<Self> {
        let spec = value
            .as_mapping()
            .ok_or_else(|| ReporterError::config(format!("field '{}' must be a mapping", name)))?;

        for key in spec.keys() {
            let known = matches!(
                key.as_str(),
                Some("xml_actions" | "row_name" | "actions" | "default" | "convert_type")
            );
            if !known {
                return Err(ReporterError::config(format!(
                    "field '{}': unknown key {:?}",
                    name, key
                )));
            }
        }

        let actions = |key: &str, mode| -> Result<Option<ActionList>> {
            spec.get(key).map(|v| ActionList::decode(v, mode)).transpose()
        };

        let source = if text_only {
            match actions("actions", ActionMode::Text)? {
                Some(list) => FieldSource::Text(list),
                None => FieldSource::Constant,
            }
        } else if let Some(list) = actions("xml_actions", ActionMode::Node)? {
            FieldSource::Node(list)
        } else if let Some(row_name) = spec.get("row_name") {
            FieldSource::Column {
                row_name: crate::actions::scalar(row_name, "row_name")?,
                actions: actions("actions", ActionMode::Text)?,
            }
        } else {
            FieldSource::Constant
        };

        let default = spec.get("default").map(yaml_to_json).transpose()?;
        if matches!(source, FieldSource::Constant) && default.is_none() {
            return Err(ReporterError::ActionIsMissed {
                action: format!(
                    "{}.{}",
                    name,
                    if text_only { "actions" } else { "xml_actions" }
                ),
            });
        }

        let convert = spec
            .get("convert_type")
            .map(|v| crate::actions::scalar(v, "convert_type").and_then(|s| ConvertType::parse(&s)))
            .transpose()?;

        Ok(Self {
            name: name.to_string(),
            source,
            default,
            convert,
        })
    }

    /// Value from a report node. A missing attribute falls back to the
    /// default when one is configured, else the field is missing.
    pub(crate) fn evaluate_node<N: ReportNode>(&self, node: &N) -> Result<Option<Value>> {
        let raw = match &self.source {
            FieldSource::Node(list) => match list.evaluate_node(node) {
                Ok(s) => Some(s),
                Err(ReporterError::AttributeMissing { .. }) if self.default.is_some() => None,
                Err(ReporterError::AttributeMissing { tag, name }) => {
                    debug!(field = %self.name, tag = %tag, attribute = %name, "attribute missing");
                    return Err(ReporterError::field_missed(self.name.as_str()));
                }
                Err(e) => return Err(e),
            },
            FieldSource::Constant => None,
            FieldSource::Column { .. } | FieldSource::Text(_) => {
                return Err(ReporterError::ActionIsMissed {
                    action: format!("{}.xml_actions", self.name),
                })
            }
        };
        self.finish(raw)
    }

    /// Value from a CSV row.
    pub(crate) fn evaluate_row(&self, headers: &csv::StringRecord, row: &csv::StringRecord) -> Result<Option<Value>> {
        let raw = match &self.source {
            FieldSource::Column { row_name, actions } => {
                let cell = headers
                    .iter()
                    .position(|h| h == row_name)
                    .and_then(|idx| row.get(idx))
                    .ok_or_else(|| ReporterError::report(format!("column '{}' not found", row_name)))?;
                match actions {
                    Some(list) if !cell.is_empty() => list.evaluate_text(cell)?,
                    _ => Some(cell.to_string()),
                }
            }
            FieldSource::Constant => None,
            FieldSource::Node(_) | FieldSource::Text(_) => {
                return Err(ReporterError::ActionIsMissed {
                    action: format!("{}.row_name", self.name),
                })
            }
        };
        self.finish(raw)
    }

    /// Value from a plain string (test list line).
    pub(crate) fn evaluate_text(&self, input: &str) -> Result<Option<Value>> {
        let raw = match &self.source {
            FieldSource::Text(list) => list.evaluate_text(input)?,
            FieldSource::Constant => None,
            FieldSource::Node(_) | FieldSource::Column { .. } => {
                return Err(ReporterError::ActionIsMissed {
                    action: format!("{}.actions", self.name),
                })
            }
        };
        self.finish(raw)
    }

    fn finish(&self, raw: Option<String>) -> Result<Option<Value>> {
        match raw.filter(|s| !s.is_empty()) {
            Some(s) => match self.convert {
                Some(convert) => convert.apply(&self.name, &s).map(Some),
                None => Ok(Some(Value::String(s))),
            },
            None => Ok(self.default.clone()),
        }
    }
}

/// Classification rule: records whose `test_id` matches at the start are
/// rewritten and routed to `kind`.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub kind: BucketKind,
    pub pattern: Regex,
    pub actions: ActionList,
    pub status: Option<StatusRef>,
}

impl FilterRule {
    fn decode(key: &str, kind: BucketKind, value: &serde_yaml::Value) -> Result<Self> {
        let spec = value
            .as_mapping()
            .ok_or_else(|| ReporterError::config(format!("'{}' must be a mapping", key)))?;
        let pattern = spec
            .get("match")
            .ok_or_else(|| ReporterError::config(format!("'{}' requires 'match'", key)))?;
        let pattern = crate::actions::compile_anchored(&crate::actions::scalar(pattern, "match")?)?;
        let actions = spec
            .get("actions")
            .map(|v| ActionList::decode(v, ActionMode::Text))
            .transpose()?
            .unwrap_or_default();
        let status = spec
            .get("status")
            .map(yaml_to_json)
            .transpose()?
            .as_ref()
            .and_then(StatusRef::from_value);

        Ok(Self {
            kind,
            pattern,
            actions,
            status,
        })
    }
}

/// Decoded result map.
#[derive(Debug, Clone)]
pub struct ResultMap {
    /// Element tag of one test entry.
    pub tc_tag: String,
    pub fields: Vec<FieldSpec>,
    /// Rules in evaluation order (setup before teardown).
    pub filters: Vec<FilterRule>,
}

impl ResultMap {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| ReporterError::config(format!("invalid result map: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &serde_yaml::Value) -> Result<Self> {
        let root = as_root(value, "result map")?;

        let tc_tag = root
            .get("tc_tag")
            .map(|v| crate::actions::scalar(v, "tc_tag"))
            .transpose()?
            .unwrap_or_else(|| TC_TAG.to_string());

        let mut filters = Vec::new();
        for (key, kind) in FILTERS {
            if let Some(rule) = root.get(key) {
                filters.push(FilterRule::decode(key, kind, rule)?);
            }
        }

        let mut fields = Vec::new();
        for (key, spec) in root {
            let name = crate::actions::scalar(key, "field name")?;
            if name == "tc_tag" || FILTERS.iter().any(|(f, _)| *f == name) {
                continue;
            }
            fields.push(FieldSpec::decode(&name, spec, false)?);
        }

        for mandatory in ["test_id", "status_id"] {
            if !fields.iter().any(|f| f.name == mandatory) {
                return Err(ReporterError::field_missed(mandatory));
            }
        }

        Ok(Self {
            tc_tag,
            fields,
            filters,
        })
    }
}

/// Decoded case map: one text action list per case field.
#[derive(Debug, Clone)]
pub struct CaseMap {
    pub fields: Vec<FieldSpec>,
}

impl CaseMap {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| ReporterError::config(format!("invalid case map: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &serde_yaml::Value) -> Result<Self> {
        let root = as_root(value, "case map")?;
        let fields = root
            .iter()
            .map(|(key, spec)| {
                let name = crate::actions::scalar(key, "field name")?;
                FieldSpec::decode(&name, spec, true)
            })
            .collect::<Result<Vec<_>>>()?;

        if !fields.iter().any(|f| f.name == "title") {
            return Err(ReporterError::field_missed("title"));
        }
        Ok(Self { fields })
    }
}

fn as_root<'v>(value: &'v serde_yaml::Value, what: &str) -> Result<&'v Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| ReporterError::config(format!("{} must be a mapping", what)))
}

pub(crate) fn yaml_to_json(value: &serde_yaml::Value) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| ReporterError::config(format!("unsupported YAML value: {}", e)))
}
