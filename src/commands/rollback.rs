use clap::Args;

use rollout::deploy::WorkflowReport;

use super::{CmdResult, GlobalArgs, TargetArgs};

#[derive(Args)]
pub struct RollbackArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn run(args: RollbackArgs, global: &GlobalArgs) -> CmdResult<WorkflowReport> {
    let ctx = super::connect(&args.target, global)?;
    Ok((ctx.manager().rollback()?, 0))
}
