use clap::Args;

use rollout::deploy::WorkflowReport;
use rollout::task::Task;

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct TaskArgs {
    /// Target id; use "-" with --config
    pub target: String,

    /// Task name, e.g. deploy:update_db or deploy:rollback:revision
    pub name: String,
}

pub fn run(args: TaskArgs, global: &GlobalArgs) -> CmdResult<WorkflowReport> {
    let task = Task::parse(&args.name)?;

    let target = super::TargetArgs {
        target: (args.target != "-").then_some(args.target),
    };
    let ctx = super::connect(&target, global)?;
    Ok((task.run(&ctx.manager())?, 0))
}
