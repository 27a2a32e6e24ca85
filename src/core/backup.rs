//! Database backups keyed by release id.

use serde::Serialize;

use crate::db::SchemaTool;
use crate::error::Result;
use crate::executor::{run_checked, RemoteExecutor};
use crate::layout::DeployLayout;
use crate::release::Release;
use crate::utils::command::{CommandChain, RemoteCommand};

const RESTORED_MARKER: &str = "rollout:restored";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseBackup {
    pub release_id: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreOutcome {
    Restored,
    NoBackup,
}

pub struct BackupManager<'a> {
    executor: &'a dyn RemoteExecutor,
    layout: &'a DeployLayout,
    tool: &'a dyn SchemaTool,
}

impl<'a> BackupManager<'a> {
    pub fn new(
        executor: &'a dyn RemoteExecutor,
        layout: &'a DeployLayout,
        tool: &'a dyn SchemaTool,
    ) -> Self {
        Self {
            executor,
            layout,
            tool,
        }
    }

    pub fn backup_for(&self, release: &Release) -> ReleaseBackup {
        ReleaseBackup {
            release_id: release.id.clone(),
            path: self.layout.backup_file(&release.id),
        }
    }

    /// Dump the live database under `owner`'s id.
    ///
    /// The dump is written beside the backup and renamed into place only once
    /// it completed, so `<id>.sql` is never a truncated dump.
    pub fn backup(&self, owner: &Release) -> Result<ReleaseBackup> {
        let backup = self.backup_for(owner);
        let partial = format!("{}{}", backup.path, PARTIAL_SUFFIX);
        log_status!("db", "Dumping database to {}", backup.path);

        let chain = CommandChain::new()
            .then(self.tool.sql_dump(&partial))
            .then(RemoteCommand::mv_f(&partial, &backup.path));
        if let Err(err) = run_checked(self.executor, &chain) {
            let discard = CommandChain::from(RemoteCommand::rm_f([partial.as_str()]));
            if self.executor.run(&discard).is_err() {
                log_status!("db", "Could not remove {}", partial);
            }
            return Err(err.into_db_operation("dump"));
        }
        Ok(backup)
    }

    /// Replace the database with the dump, then delete the dump.
    ///
    /// Runs as one guarded remote command; a missing dump is not an error.
    pub fn restore(&self, backup: &ReleaseBackup) -> Result<RestoreOutcome> {
        let chain = CommandChain::new()
            .then(self.tool.sql_drop())
            .then(self.tool.sql_import(&backup.path))
            .then(RemoteCommand::rm_f([backup.path.as_str()]))
            .then(RemoteCommand::echo(RESTORED_MARKER))
            .when_exists(backup.path.as_str());

        let output = run_checked(self.executor, &chain).map_err(|e| e.into_db_operation("restore"))?;

        if output.stdout.lines().any(|line| line.trim() == RESTORED_MARKER) {
            log_status!("db", "Restored database from {}", backup.path);
            Ok(RestoreOutcome::Restored)
        } else {
            log_status!("db", "No backup at {}, database left as is", backup.path);
            Ok(RestoreOutcome::NoBackup)
        }
    }

    /// Release ids that currently have a dump on the host.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        let chain = CommandChain::from(RemoteCommand::list_dir(&self.layout.backups_dir()));
        let output = self.executor.run(&chain)?;
        if !output.success {
            return Ok(Vec::new());
        }

        let mut ids: Vec<String> = output
            .stdout
            .lines()
            .filter_map(|name| name.trim().strip_suffix(".sql"))
            .map(str::to_string)
            .collect();
        ids.sort();
        Ok(ids)
    }
}
