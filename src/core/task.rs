//! Named lifecycle tasks, addressable one at a time.

use serde::Serialize;

use crate::deploy::{ReleaseManager, StepReport, WorkflowReport};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Task {
    Setup,
    Deploy,
    Update,
    UpdateDb,
    FinalizeUpdate,
    Cleanup,
    Rollback,
    Revision,
    DbRollback,
    RollbackCleanup,
}

impl Task {
    pub const ALL: [Task; 10] = [
        Task::Setup,
        Task::Deploy,
        Task::Update,
        Task::UpdateDb,
        Task::FinalizeUpdate,
        Task::Cleanup,
        Task::Rollback,
        Task::Revision,
        Task::DbRollback,
        Task::RollbackCleanup,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Task::Setup => "setup",
            Task::Deploy => "deploy",
            Task::Update => "deploy:update",
            Task::UpdateDb => "deploy:update_db",
            Task::FinalizeUpdate => "deploy:finalize_update",
            Task::Cleanup => "deploy:cleanup",
            Task::Rollback => "deploy:rollback",
            Task::Revision => "deploy:rollback:revision",
            Task::DbRollback => "deploy:rollback:db_rollback",
            Task::RollbackCleanup => "deploy:rollback:cleanup",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        Task::ALL
            .into_iter()
            .find(|task| task.name() == name.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = Task::ALL.iter().map(Task::name).collect();
                Error::validation_invalid_argument(
                    "task",
                    format!("Unknown task '{}'", name),
                    Some(name.to_string()),
                )
                .with_hint(format!("Known tasks: {}", known.join(", ")))
            })
    }

    pub fn run(&self, manager: &ReleaseManager<'_>) -> Result<WorkflowReport> {
        let single = |step: Result<StepReport>| step.map(|s| manager.report(self.name(), vec![s]));
        match self {
            Task::Setup => manager.run_setup(),
            Task::Deploy => manager.deploy(),
            Task::Rollback => manager.rollback(),
            Task::Update => single(manager.update()),
            Task::UpdateDb => single(manager.update_db()),
            Task::FinalizeUpdate => single(manager.finalize_update()),
            Task::Cleanup => single(manager.cleanup()),
            Task::Revision => single(manager.revision()),
            Task::DbRollback => single(manager.db_rollback()),
            Task::RollbackCleanup => single(manager.rollback_cleanup()),
        }
    }
}
