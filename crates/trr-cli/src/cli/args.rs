use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trr_core::ConfigSelection;

#[derive(Parser)]
#[command(
    name = "testrail-reporter",
    version,
    about = "Publish test reports to TestRail and triage known failures"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze test run failures against a check list
    Analyze(AnalyzeArgs),
    /// Publish test results to TestRail
    Publish(PublishArgs),
    /// Create missing cases in a test suite
    Update(UpdateArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to check list (.yaml)
    pub check_list: PathBuf,

    /// TestRail project name
    #[arg(short = 'p', long = "project")]
    pub project: String,

    /// Test plan holding the run
    #[arg(short = 't', long = "plan")]
    pub plan: Option<String>,

    /// Test run name
    #[arg(short = 'r', long = "run")]
    pub run: String,

    /// Run configuration, e.g. -c "{'Operating Systems':'Ubuntu 18.04'}"
    #[arg(short = 'c', long = "config", value_parser = parse_configuration)]
    pub configuration: Option<ConfigSelection>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PublishArgs {
    /// Path to report (.xml or .csv)
    pub report: PathBuf,

    /// TestRail project name
    #[arg(short = 'p', long = "project")]
    pub project: String,

    /// Test plan name
    #[arg(short = 't', long = "plan")]
    pub plan: String,

    /// Test run name
    #[arg(short = 'r', long = "run")]
    pub run: String,

    /// Test suite name
    #[arg(short = 's', long = "suite")]
    pub suite: String,

    #[arg(short = 'm', long = "milestone")]
    pub milestone: Option<String>,

    /// Run configuration, e.g. -c "{'Operating Systems':'Ubuntu 18.04'}"
    #[arg(short = 'c', long = "config", value_parser = parse_configuration)]
    pub configuration: Option<ConfigSelection>,

    #[arg(long = "plan-description")]
    pub plan_description: Option<String>,

    #[arg(long = "run-description")]
    pub run_description: Option<String>,

    /// Comment length limit in characters (0 is unlimited)
    #[arg(long, default_value_t = 100_000)]
    pub limit: usize,

    /// Payload limit of one result upload in bytes (0 is unlimited)
    #[arg(long = "tr-limit", default_value_t = 0)]
    pub tr_limit: usize,

    /// Remove untested cases from the run
    #[arg(long)]
    pub remove_untested: bool,

    /// Remove skipped cases from the run
    #[arg(long)]
    pub remove_skipped: bool,

    /// Fail instead of overriding a run that already exists
    #[arg(long)]
    pub no_update_existing: bool,

    /// Custom result attributes (.yaml)
    #[arg(long = "result-attrs")]
    pub result_attrs: Option<PathBuf>,

    /// Built-in result map: tempest, pytest, locust
    #[arg(long, default_value = "tempest")]
    pub map: String,

    /// Custom result map (.yaml); overrides --map
    #[arg(long = "result-map")]
    pub result_map: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct UpdateArgs {
    /// File with one test name per line
    pub test_list: PathBuf,

    /// TestRail project name
    #[arg(short = 'p', long = "project")]
    pub project: String,

    /// Test suite name
    #[arg(short = 's', long = "suite")]
    pub suite: String,

    /// Custom case attributes (.yaml)
    #[arg(long = "case-attrs")]
    pub case_attrs: Option<PathBuf>,

    /// Built-in case map: tempest, pytest
    #[arg(long, default_value = "tempest")]
    pub map: String,

    /// Custom case map (.yaml); overrides --map
    #[arg(long = "tc-map")]
    pub tc_map: Option<PathBuf>,

    /// Custom fields whose labels are converted to ids (.yaml)
    #[arg(long = "attrs2id")]
    pub attrs2id: Option<PathBuf>,

    /// Also update existing cases whose fields changed
    #[arg(long)]
    pub update_changed: bool,
}

/// JSON object of `group: configuration`; single quotes are accepted.
fn parse_configuration(raw: &str) -> Result<ConfigSelection, String> {
    serde_json::from_str(&raw.replace('\'', "\"")).map_err(|e| format!("invalid configuration '{}': {}", raw, e))
}
