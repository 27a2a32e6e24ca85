use clap::Args;

use rollout::deploy::WorkflowReport;

use super::{CmdResult, GlobalArgs, TargetArgs};

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Releases to keep after this deploy (overrides keep_releases)
    #[arg(long, value_name = "N")]
    pub keep: Option<usize>,
}

pub fn run(args: DeployArgs, global: &GlobalArgs) -> CmdResult<WorkflowReport> {
    let mut config = super::load_config(&args.target, global)?;
    if let Some(keep) = args.keep {
        config = config.with_keep_releases(keep)?;
    }

    let ctx = super::TargetContext::connect(config)?;
    Ok((ctx.manager().deploy()?, 0))
}
