use clap::Args;

use rollout::deploy::WorkflowReport;

use super::{CmdResult, GlobalArgs, TargetArgs};

#[derive(Args)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Releases to keep (defaults to the target's keep_releases)
    #[arg(long, value_name = "N")]
    pub keep: Option<usize>,
}

pub fn run(args: CleanupArgs, global: &GlobalArgs) -> CmdResult<WorkflowReport> {
    let mut config = super::load_config(&args.target, global)?;
    if let Some(keep) = args.keep {
        config = config.with_keep_releases(keep)?;
    }

    let ctx = super::TargetContext::connect(config)?;
    let manager = ctx.manager();
    let step = manager.cleanup()?;
    Ok((manager.report("cleanup", vec![step]), 0))
}
