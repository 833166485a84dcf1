//! Action lists: the declarative extraction language used by field maps.
//!
//! An action list is decoded once from YAML into [`ActionList`] and then
//! evaluated either against a report node ([`ActionList::evaluate_node`]) or
//! against a string ([`ActionList::evaluate_text`]). Evaluation is strictly
//! left to right and accumulates into one output string.
//!
//! ```yaml
//! - get_attribute: classname
//! - add_string: "."
//! - get_attribute: name
//! - check:
//!     child:
//!       tag: failure
//!       xml_actions:
//!         - get_element_text: true
//! ```

mod decode;
mod node;
mod text;

use regex::Regex;
use serde_yaml::Value;

use crate::error::Result;

pub(crate) use decode::{compile_anchored, scalar};
pub use node::ReportNode;

/// Which input an action list is evaluated against. Decides the set of
/// accepted action keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    /// Report nodes (XML elements).
    Node,
    /// Plain strings (test names, CSV cells, identifiers).
    Text,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Append a literal.
    AddString(String),
    /// Append an attribute of the current node.
    GetAttribute(String),
    /// Append the text content of the current node.
    GetElementText,
    /// Evaluate `actions` on the same node when it carries `attribute`.
    CheckParent { attribute: String, actions: ActionList },
    /// Evaluate `actions` on the first child matching tag and/or attribute.
    CheckChild {
        tag: Option<String>,
        attribute: Option<String>,
        actions: ActionList,
    },
    /// Evaluate `actions` on the first child with tag `tag`.
    HasChildTag { tag: String, actions: ActionList },
    /// Append the first capture group of the single match in the input.
    Find(Regex),
    /// Literal replace on the accumulated output.
    Replace { old: String, new: String },
    /// Append the label of the first pattern matching the input start.
    CustomMap(Vec<(String, Regex)>),
}

impl Action {
    /// Configuration key of the action.
    pub fn key(&self) -> &'static str {
        match self {
            Self::AddString(_) => "add_string",
            Self::GetAttribute(_) => "get_attribute",
            Self::GetElementText => "get_element_text",
            Self::CheckParent { .. } | Self::CheckChild { .. } => "check",
            Self::HasChildTag { .. } => "has_child_tag",
            Self::Find(_) => "find",
            Self::Replace { .. } => "replace",
            Self::CustomMap(_) => "custom_map",
        }
    }
}

/// Ordered, validated sequence of actions.
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// Decode a YAML sequence. Unknown keys and descending actions without a
    /// nested list fail here, before any report is read.
    pub fn decode(value: &Value, mode: ActionMode) -> Result<Self> {
        decode::decode_list(value, mode)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }
}

impl FromIterator<Action> for ActionList {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
