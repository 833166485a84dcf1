//! Test report extraction and TestRail synchronization.
//!
//! The pipeline reads a report (JUnit-style XML or CSV), evaluates a
//! declarative field map against every entry and partitions the resulting
//! records into normal, setup and teardown buckets. [`sync::Reporter`] then
//! resolves names against a [`context::ProjectContext`] snapshot and uploads
//! results or creates missing cases.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use trr_client::TestRailClient;
//! use trr_core::{config, extract, sync::{PublishOptions, Reporter}};
//!
//! # async fn example() -> trr_core::Result<()> {
//! let map = config::builtin_result_map("tempest")?;
//! let attrs = config::result_attributes(None)?;
//! let bucket = extract::extract_results(Path::new("report.xml"), &map, &attrs)?;
//!
//! let client = TestRailClient::from_env()?;
//! let reporter = Reporter::connect(&client, "My Project").await?;
//! let options = PublishOptions::new("Nightly", "Tempest", "Smoke").update_existing(true);
//! reporter.publish_results(bucket, &options).await?;
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod analyzer;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod sync;

pub use analyzer::{AnalysisSummary, Analyzer, CheckList, RunSelector};
pub use context::{ConfigSelection, ProjectContext};
pub use error::{EntityKind, ReporterError, Result};
pub use sync::{CasePolicy, PublishOptions, PublishSummary, Reporter, SuiteUpdateSummary};
