//! YAML -> ActionList decoding.

use regex::Regex;
use serde_yaml::{Mapping, Value};

use super::{Action, ActionList, ActionMode};
use crate::error::{ReporterError, Result};

/// Keys that may carry a nested action list next to the action key.
const NESTED_KEYS: [&str; 2] = ["xml_actions", "actions"];

pub(super) fn decode_list(value: &Value, mode: ActionMode) -> Result<ActionList> {
    let items = match value {
        Value::Sequence(items) => items,
        Value::Null => return Ok(ActionList::default()),
        other => {
            return Err(ReporterError::config(format!(
                "action list must be a sequence, got: {}",
                render(other)
            )))
        }
    };

    let mut actions = Vec::with_capacity(items.len());
    for item in items {
        decode_item(item, mode, &mut actions)?;
    }
    Ok(ActionList::new(actions))
}

fn decode_item(item: &Value, mode: ActionMode, out: &mut Vec<Action>) -> Result<()> {
    let Value::Mapping(map) = item else {
        return Err(unknown(item));
    };

    let mut keys = map
        .keys()
        .filter_map(Value::as_str)
        .filter(|k| !NESTED_KEYS.contains(k));
    let (Some(key), None) = (keys.next(), keys.next()) else {
        return Err(unknown(item));
    };
    let value = map.get(key).unwrap_or(&Value::Null);

    let action = match (mode, key) {
        (_, "add_string") => Action::AddString(scalar(value, key)?),
        (_, "replace") => {
            let spec = as_mapping(value, key)?;
            Action::Replace {
                old: scalar(field(spec, "old", key)?, "replace.old")?,
                new: scalar(field(spec, "new", key)?, "replace.new")?,
            }
        }
        (ActionMode::Node, "get_attribute") => Action::GetAttribute(scalar(value, key)?),
        (ActionMode::Node, "get_element_text") => Action::GetElementText,
        (ActionMode::Node, "has_child_tag") => Action::HasChildTag {
            tag: scalar(value, key)?,
            actions: nested(map, mode)?.ok_or_else(missed)?,
        },
        (ActionMode::Node, "check") => {
            let spec = as_mapping(value, key)?;
            let before = out.len();
            if let Some(parent) = spec.get("parent") {
                let parent = as_mapping(parent, "check.parent")?;
                out.push(Action::CheckParent {
                    attribute: scalar(field(parent, "attribute", "check.parent")?, "check.parent.attribute")?,
                    actions: nested(parent, mode)?.ok_or_else(missed)?,
                });
            }
            if let Some(child) = spec.get("child") {
                let child = as_mapping(child, "check.child")?;
                let tag = optional_scalar(child, "tag")?;
                let attribute = optional_scalar(child, "attribute")?;
                if tag.is_none() && attribute.is_none() {
                    return Err(ReporterError::config("'check.child' requires 'tag' or 'attribute'"));
                }
                out.push(Action::CheckChild {
                    tag,
                    attribute,
                    actions: nested(child, mode)?.ok_or_else(missed)?,
                });
            }
            if out.len() == before {
                return Err(unknown(item));
            }
            return Ok(());
        }
        (ActionMode::Text, "find") => Action::Find(compile(&scalar(value, key)?)?),
        (ActionMode::Text, "custom_map") => {
            let spec = as_mapping(value, key)?;
            let mut entries = Vec::with_capacity(spec.len());
            for (label, pattern) in spec {
                let pattern = scalar(pattern, "custom_map")?;
                entries.push((scalar(label, "custom_map")?, compile_anchored(&pattern)?));
            }
            Action::CustomMap(entries)
        }
        _ => return Err(unknown(item)),
    };
    out.push(action);
    Ok(())
}

fn nested(map: &Mapping, mode: ActionMode) -> Result<Option<ActionList>> {
    for key in NESTED_KEYS {
        if let Some(value) = map.get(key) {
            return decode_list(value, mode).map(Some);
        }
    }
    Ok(None)
}

fn missed() -> ReporterError {
    ReporterError::ActionIsMissed {
        action: NESTED_KEYS[0].to_string(),
    }
}

fn unknown(item: &Value) -> ReporterError {
    ReporterError::UnknownAction {
        action: render(item),
    }
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().replace('\n', " "))
        .unwrap_or_else(|_| format!("{:?}", value))
}

fn as_mapping<'v>(value: &'v Value, key: &str) -> Result<&'v Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| ReporterError::config(format!("'{}' expects a mapping", key)))
}

fn field<'v>(map: &'v Mapping, name: &str, key: &str) -> Result<&'v Value> {
    map.get(name)
        .ok_or_else(|| ReporterError::config(format!("'{}' requires '{}'", key, name)))
}

fn optional_scalar(map: &Mapping, name: &str) -> Result<Option<String>> {
    map.get(name).map(|v| scalar(v, name)).transpose()
}

/// Scalars are accepted as strings; YAML numbers and booleans keep their
/// textual form.
pub(crate) fn scalar(value: &Value, key: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ReporterError::config(format!(
            "'{}' expects a scalar, got: {}",
            key,
            render(value)
        ))),
    }
}

pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ReporterError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Compile a pattern that must match at the start of the input.
pub(crate) fn compile_anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|e| ReporterError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}
