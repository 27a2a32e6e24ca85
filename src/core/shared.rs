//! Persistent per-domain resources shared by every release.

use serde::Serialize;

use crate::error::Result;
use crate::executor::{run_checked, RemoteExecutor};
use crate::layout::DeployLayout;
use crate::release::Release;
use crate::utils::command::{CommandChain, RemoteCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsState {
    Written,
    Preserved,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLayoutReport {
    pub settings_path: String,
    pub files_path: String,
    pub settings: SettingsState,
}

pub struct SharedLinker<'a> {
    executor: &'a dyn RemoteExecutor,
    layout: &'a DeployLayout,
}

impl<'a> SharedLinker<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, layout: &'a DeployLayout) -> Self {
        Self { executor, layout }
    }

    /// Create the shared directories and seed the settings file.
    ///
    /// An existing settings file is never touched; operators edit it in place.
    pub fn ensure_shared_layout(&self, settings_payload: &str) -> Result<SharedLayoutReport> {
        let settings_path = self.layout.shared_settings();
        let files_path = self.layout.shared_files();

        run_checked(
            self.executor,
            &CommandChain::from(RemoteCommand::mkdir_p([
                self.layout.shared_root(),
                self.layout.shared_domain_dir(),
                files_path.clone(),
            ])),
        )?;

        let probe = CommandChain::from(RemoteCommand::test_exists(&settings_path));
        let settings = if self.executor.run(&probe)?.success {
            log_status!("setup", "Keeping existing {}", settings_path);
            SettingsState::Preserved
        } else {
            log_status!("setup", "Writing {}", settings_path);
            self.executor.put(settings_payload, &settings_path)?;
            SettingsState::Written
        };

        Ok(SharedLayoutReport {
            settings_path,
            files_path,
            settings,
        })
    }

    /// Point the release's settings file and files directory at the shared copies.
    pub fn link_into_release(&self, release: &Release) -> Result<()> {
        let chain = CommandChain::atomic_symlink(
            &self.layout.shared_files(),
            &self.layout.release_files(&release.path),
        )
        .extend(CommandChain::atomic_symlink(
            &self.layout.shared_settings(),
            &self.layout.release_settings(&release.path),
        ));
        run_checked(self.executor, &chain)?;
        Ok(())
    }

    pub fn unlink_from_release(&self, release: &Release) -> Result<()> {
        let chain = CommandChain::new()
            .then(RemoteCommand::rm_f([self.layout.release_settings(&release.path)]))
            .then(RemoteCommand::rm_f([self.layout.release_files(&release.path)]));
        run_checked(self.executor, &chain)?;
        Ok(())
    }
}
