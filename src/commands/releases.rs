use clap::Args;

use rollout::deploy::ReleasesOverview;

use super::{CmdResult, GlobalArgs, TargetArgs};

#[derive(Args)]
pub struct ReleasesArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn run(args: ReleasesArgs, global: &GlobalArgs) -> CmdResult<ReleasesOverview> {
    let ctx = super::connect(&args.target, global)?;
    Ok((ctx.manager().overview()?, 0))
}
