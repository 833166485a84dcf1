use anyhow::Context;
use tracing::info;
use trr_core::config::{self, CustomFieldList};
use trr_core::{extract, CasePolicy, Reporter};

use crate::cli::args::UpdateArgs;
use crate::exit_codes;

pub async fn run(args: UpdateArgs) -> anyhow::Result<i32> {
    info!(test_list = %args.test_list.display(), project = %args.project, suite = %args.suite, "updating test suite");

    let map = config::case_map(&args.map, args.tc_map.as_deref()).context("failed to load case map")?;
    let attrs = config::case_attributes(args.case_attrs.as_deref()).context("failed to load case attributes")?;
    let fields = CustomFieldList::load(args.attrs2id.as_deref()).context("failed to load custom field list")?;
    let cases = extract::load_test_list(&args.test_list, &map, &attrs)
        .with_context(|| format!("failed to read test list {}", args.test_list.display()))?;
    info!(cases = cases.len(), "test list parsed");

    let client = super::connect()?;
    let reporter = Reporter::connect(&client, &args.project).await?.with_custom_fields(fields);

    let policy = if args.update_changed {
        CasePolicy::UpdateChanged
    } else {
        CasePolicy::CreateMissing
    };
    let summary = reporter.update_test_suite(&args.suite, cases, policy).await?;

    info!(
        suite_id = summary.suite_id,
        suite_created = summary.suite_created,
        sections_created = summary.sections_created,
        created = summary.cases_created,
        updated = summary.cases_updated,
        skipped = summary.cases_skipped,
        "test suite updated"
    );
    Ok(exit_codes::SUCCESS)
}
