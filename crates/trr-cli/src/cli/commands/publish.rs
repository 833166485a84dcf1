use anyhow::Context;
use tracing::info;
use trr_core::{config, extract, PublishOptions, Reporter};

use crate::cli::args::PublishArgs;
use crate::exit_codes;

pub async fn run(args: PublishArgs) -> anyhow::Result<i32> {
    info!(report = %args.report.display(), project = %args.project, "publishing test results");

    let map = config::result_map(&args.map, args.result_map.as_deref()).context("failed to load result map")?;
    let attrs = config::result_attributes(args.result_attrs.as_deref()).context("failed to load result attributes")?;
    let bucket = extract::extract_results(&args.report, &map, &attrs)
        .with_context(|| format!("failed to parse report {}", args.report.display()))?;
    info!(
        results = bucket.normal.len(),
        setup = bucket.setup.len(),
        teardown = bucket.teardown.len(),
        "report parsed"
    );

    let client = super::connect()?;
    let reporter = Reporter::connect(&client, &args.project).await?;

    let options = options_from_args(&args);
    let summary = reporter.publish_results(bucket, &options).await?;

    info!(
        plan_id = summary.plan_id,
        run_id = summary.run_id,
        run_created = summary.run_created,
        submitted = summary.submitted,
        batches = summary.batches,
        pruned = ?summary.pruned,
        "results published"
    );
    if let Some(url) = &summary.run_url {
        info!(url = %url, "test run");
    }
    Ok(exit_codes::SUCCESS)
}

fn options_from_args(args: &PublishArgs) -> PublishOptions {
    let mut options = PublishOptions::new(&args.plan, &args.suite, &args.run)
        .with_configuration(args.configuration.clone().unwrap_or_default())
        .update_existing(!args.no_update_existing)
        .remove_untested(args.remove_untested)
        .remove_skipped(args.remove_skipped)
        .with_comment_limit(args.limit)
        .with_payload_limit(args.tr_limit);
    if let Some(milestone) = &args.milestone {
        options = options.with_milestone(milestone);
    }
    if let Some(text) = &args.plan_description {
        options = options.with_plan_description(text);
    }
    if let Some(text) = &args.run_description {
        options = options.with_run_description(text);
    }
    options
}
