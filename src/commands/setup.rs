use clap::Args;

use rollout::deploy::WorkflowReport;

use super::{CmdResult, GlobalArgs, TargetArgs};

#[derive(Args)]
pub struct SetupArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn run(args: SetupArgs, global: &GlobalArgs) -> CmdResult<WorkflowReport> {
    let ctx = super::connect(&args.target, global)?;
    Ok((ctx.manager().run_setup()?, 0))
}
