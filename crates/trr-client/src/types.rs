//! Client configuration and TestRail entity types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Connection parameters, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service base URL (e.g. `https://example.testrail.io`).
    pub url: String,

    /// Account used for basic auth.
    #[serde(default)]
    pub user: String,

    /// Password or API key.
    #[serde(default)]
    pub password: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Wait used when a 429 answer carries no retry hint.
    #[serde(default = "default_retry_timeout")]
    pub retry_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    60
}

fn default_retry_timeout() -> u64 {
    60
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
            retry_timeout_secs: default_retry_timeout(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `TESTRAIL_URL` | Service base URL |
    /// | `TESTRAIL_USER` | Account name |
    /// | `TESTRAIL_PASSWORD` | Password or API key |
    /// | `TESTRAIL_TIMEOUT` | Request timeout in seconds (default: 60) |
    /// | `TESTRAIL_RETRY_TIMEOUT` | Fallback 429 wait in seconds (default: 60) |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("TESTRAIL_URL").unwrap_or_default(),
            user: std::env::var("TESTRAIL_USER").unwrap_or_default(),
            password: std::env::var("TESTRAIL_PASSWORD").unwrap_or_default(),
            timeout_secs: std::env::var("TESTRAIL_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            retry_timeout_secs: std::env::var("TESTRAIL_RETRY_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_retry_timeout),
        }
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set user and password.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the fallback wait for rate-limited calls.
    pub fn with_retry_timeout(mut self, secs: u64) -> Self {
        self.retry_timeout_secs = secs;
        self
    }
}

/// Lists the server sends as `null` instead of `[]`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub suite_mode: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub suite_id: Option<u64>,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub depth: Option<u32>,
}

/// Test case. Custom fields (`custom_*`) and anything else the server sends
/// are kept in `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub section_id: Option<u64>,
    #[serde(default)]
    pub suite_id: Option<u64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseType {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Case or result field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseField {
    pub id: u64,
    pub system_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub type_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub configs: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default)]
    pub options: FieldOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Option table as sent by the server: one `id, label` pair per line.
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
}

pub type ResultField = CaseField;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_started: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Priority {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub id: u64,
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub is_untested: bool,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub configs: Vec<Configuration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub milestone_id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    /// Only present on `get_plan`, not in plan listings.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entries: Vec<PlanEntry>,
}

/// Plan entry: one suite, one run per configuration combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub suite_id: Option<u64>,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub suite_id: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub config_ids: Vec<u64>,
    #[serde(default)]
    pub plan_id: Option<u64>,
    #[serde(default)]
    pub entry_id: Option<String>,
    #[serde(default)]
    pub include_all: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub url: Option<String>,
}

/// Test: an instance of a case inside a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Test {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub case_id: Option<u64>,
    #[serde(default)]
    pub status_id: Option<u64>,
    #[serde(default)]
    pub run_id: Option<u64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A result posted against a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub id: u64,
    pub test_id: u64,
    #[serde(default)]
    pub status_id: Option<u64>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub defects: Option<String>,
    #[serde(default)]
    pub created_on: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Reply of `add_attachment_*`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_id: u64,
}
