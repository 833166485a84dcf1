use anyhow::Context;
use tracing::info;
use trr_core::{Analyzer, CheckList, RunSelector};

use crate::cli::args::AnalyzeArgs;
use crate::exit_codes;

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<i32> {
    info!(check_list = %args.check_list.display(), project = %args.project, "running analyzer");

    let checks = CheckList::load(&args.check_list)
        .with_context(|| format!("failed to load check list {}", args.check_list.display()))?;

    let client = super::connect()?;
    let analyzer = Analyzer::connect(&client, &args.project).await?;

    let mut selector = RunSelector::new(args.run).with_configuration(args.configuration.unwrap_or_default());
    if let Some(plan) = args.plan {
        selector = selector.in_plan(plan);
    }
    let summary = analyzer.analyze(&checks, &selector).await?;

    info!(
        run_id = summary.run_id,
        failed = summary.failed,
        rewritten = summary.rewritten.len(),
        "analysis complete"
    );
    for title in &summary.rewritten {
        info!(test = %title, "status rewritten");
    }
    Ok(exit_codes::SUCCESS)
}
