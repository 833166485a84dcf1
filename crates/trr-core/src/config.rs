//! Field maps, attribute templates and their built-in defaults.
//!
//! Built-in dialects are compiled in and selected by name; an explicit
//! file always takes precedence.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ReporterError, Result};
use crate::extract::{read_file, yaml_to_json, CaseMap, ResultMap};

/// Names accepted by [`builtin_result_map`].
pub const BUILTIN_MAPS: [&str; 3] = ["tempest", "pytest", "locust"];

const TEMPEST_RESULT_MAP: &str = include_str!("../maps/tempest/result_template.yaml");
const TEMPEST_CASE_MAP: &str = include_str!("../maps/tempest/case_template.yaml");
const PYTEST_RESULT_MAP: &str = include_str!("../maps/pytest/result_template.yaml");
const PYTEST_CASE_MAP: &str = include_str!("../maps/pytest/case_template.yaml");
const LOCUST_RESULT_MAP: &str = include_str!("../maps/locust/result_template.yaml");

const DEFAULT_RESULT_ATTRS: &str = include_str!("../maps/tr_result_attrs.yaml");
const DEFAULT_CASE_ATTRS: &str = include_str!("../maps/tr_case_attrs.yaml");
const DEFAULT_ATTRS2ID: &str = include_str!("../maps/attrs2id.yaml");

pub fn builtin_result_map(name: &str) -> Result<ResultMap> {
    let content = match name {
        "tempest" => TEMPEST_RESULT_MAP,
        "pytest" => PYTEST_RESULT_MAP,
        "locust" => LOCUST_RESULT_MAP,
        other => {
            return Err(ReporterError::config(format!(
                "unknown result map '{}' (expected one of: {})",
                other,
                BUILTIN_MAPS.join(", ")
            )))
        }
    };
    ResultMap::from_yaml_str(content)
}

pub fn builtin_case_map(name: &str) -> Result<CaseMap> {
    let content = match name {
        "tempest" => TEMPEST_CASE_MAP,
        "pytest" => PYTEST_CASE_MAP,
        other => {
            return Err(ReporterError::config(format!(
                "unknown case map '{}' (expected one of: tempest, pytest)",
                other
            )))
        }
    };
    CaseMap::from_yaml_str(content)
}

/// Explicit file if given, else the built-in dialect `name`.
pub fn result_map(name: &str, path: Option<&Path>) -> Result<ResultMap> {
    match path {
        Some(path) => ResultMap::from_yaml_str(&read_file(path)?),
        None => builtin_result_map(name),
    }
}

/// Explicit file if given, else the built-in dialect `name`.
pub fn case_map(name: &str, path: Option<&Path>) -> Result<CaseMap> {
    match path {
        Some(path) => CaseMap::from_yaml_str(&read_file(path)?),
        None => builtin_case_map(name),
    }
}

/// Parse an attribute template (a YAML mapping; an empty document is an
/// empty template).
pub fn parse_attributes(content: &str) -> Result<Map<String, Value>> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| ReporterError::config(format!("invalid attribute template: {}", e)))?;
    match yaml_to_json(&value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ReporterError::config(format!(
            "attribute template must be a mapping, got: {}",
            other
        ))),
    }
}

/// Extra result fields: explicit file or the built-in (empty) template.
pub fn result_attributes(path: Option<&Path>) -> Result<Map<String, Value>> {
    match path {
        Some(path) => parse_attributes(&read_file(path)?),
        None => parse_attributes(DEFAULT_RESULT_ATTRS),
    }
}

/// Case template: explicit file or the built-in one.
pub fn case_attributes(path: Option<&Path>) -> Result<Map<String, Value>> {
    match path {
        Some(path) => parse_attributes(&read_file(path)?),
        None => parse_attributes(DEFAULT_CASE_ATTRS),
    }
}

/// Custom case fields whose label values are converted to option ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomFieldList {
    #[serde(default)]
    pub attributes2id: Vec<String>,
}

impl CustomFieldList {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let list: Option<Self> = serde_yaml::from_str(content)
            .map_err(|e| ReporterError::config(format!("invalid custom field list: {}", e)))?;
        Ok(list.unwrap_or_default())
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml_str(&read_file(path)?),
            None => Self::from_yaml_str(DEFAULT_ATTRS2ID),
        }
    }
}
