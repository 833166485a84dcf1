use super::args::*;
use anyhow::Context;
use trr_client::TestRailClient;

pub mod analyze;
pub mod publish;
pub mod update;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Analyze(args) => analyze::run(args).await,
        Command::Publish(args) => publish::run(args).await,
        Command::Update(args) => update::run(args).await,
    }
}

/// Client configured from `TESTRAIL_*` variables.
fn connect() -> anyhow::Result<TestRailClient> {
    let client = TestRailClient::from_env().context("failed to configure TestRail client")?;
    tracing::debug!(url = %client.base_url(), user = %client.config().user, "TestRail client configured");
    Ok(client)
}
