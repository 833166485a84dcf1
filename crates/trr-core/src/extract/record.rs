//! Normalized records produced by extraction.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ReporterError, Result};

/// Status as written in a report or map: a label to resolve, or a remote id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatusRef {
    Id(u64),
    Label(String),
}

impl StatusRef {
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self::Id),
            Value::String(s) if !s.is_empty() => Some(Self::Label(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for StatusRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// One test outcome taken from a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Test title as it appears remotely (or a group prefix for setup records).
    pub test_id: String,
    pub status: StatusRef,
    pub comment: String,
    /// Extra result fields (`elapsed`, `version`, `custom_*`, ...).
    pub fields: Map<String, Value>,
}

impl ResultRecord {
    pub fn new(test_id: impl Into<String>, status: StatusRef) -> Self {
        Self {
            test_id: test_id.into(),
            status,
            comment: String::new(),
            fields: Map::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Split a flat field map into a record. `test_id` and `status_id` are
    /// mandatory.
    pub(crate) fn from_fields(mut fields: Map<String, Value>) -> Result<Self> {
        let test_id = fields
            .remove("test_id")
            .and_then(|v| non_empty_string(&v))
            .ok_or_else(|| ReporterError::field_missed("test_id"))?;
        let status = fields
            .remove("status_id")
            .as_ref()
            .and_then(StatusRef::from_value)
            .ok_or_else(|| ReporterError::field_missed("status_id"))?;
        let comment = fields
            .remove("comment")
            .and_then(|v| non_empty_string(&v))
            .unwrap_or_default();
        fields.retain(|_, v| !v.is_null());

        Ok(Self {
            test_id,
            status,
            comment,
            fields,
        })
    }

    /// Body entry for `add_results`.
    pub fn to_payload(&self, test_id: u64, status_id: u64) -> Value {
        let mut body = self.fields.clone();
        body.insert("test_id".into(), test_id.into());
        body.insert("status_id".into(), status_id.into());
        if !self.comment.is_empty() {
            body.insert("comment".into(), Value::String(self.comment.clone()));
        }
        Value::Object(body)
    }
}

/// Bucket a record is routed to by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Normal,
    Setup,
    Teardown,
}

/// Extracted records partitioned by classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBucket {
    pub normal: Vec<ResultRecord>,
    pub setup: Vec<ResultRecord>,
    pub teardown: Vec<ResultRecord>,
}

impl ResultBucket {
    pub fn push(&mut self, kind: BucketKind, record: ResultRecord) {
        match kind {
            BucketKind::Normal => self.normal.push(record),
            BucketKind::Setup => self.setup.push(record),
            BucketKind::Teardown => self.teardown.push(record),
        }
    }

    pub fn len(&self) -> usize {
        self.normal.len() + self.setup.len() + self.teardown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A reference given either by remote id or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reference {
    Id(u64),
    Name(String),
}

impl Reference {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self::Id),
            Value::String(s) if !s.trim().is_empty() => Some(Self::Name(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A test case to be created in a suite.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseRecord {
    pub title: String,
    pub section: Option<Reference>,
    pub type_id: Option<Reference>,
    pub milestone_id: Option<Reference>,
    pub priority_id: Option<Reference>,
    /// Remaining case fields, custom fields included.
    pub fields: Map<String, Value>,
}

impl TestCaseRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            section: None,
            type_id: None,
            milestone_id: None,
            priority_id: None,
            fields: Map::new(),
        }
    }

    pub fn with_section(mut self, section: Reference) -> Self {
        self.section = Some(section);
        self
    }

    pub(crate) fn from_fields(mut fields: Map<String, Value>) -> Result<Self> {
        let title = fields
            .remove("title")
            .and_then(|v| non_empty_string(&v))
            .ok_or_else(|| ReporterError::field_missed("title"))?;

        let section_name = fields.remove("section");
        let section_id = fields.remove("section_id");
        let section = section_name
            .as_ref()
            .and_then(Reference::from_value)
            .or_else(|| section_id.as_ref().and_then(Reference::from_value));

        let mut take = |key: &str| fields.remove(key).as_ref().and_then(Reference::from_value);
        let type_id = take("type_id");
        let milestone_id = take("milestone_id");
        let priority_id = take("priority_id");
        fields.retain(|_, v| !v.is_null());

        Ok(Self {
            title,
            section,
            type_id,
            milestone_id,
            priority_id,
            fields,
        })
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
