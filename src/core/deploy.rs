//! Release lifecycle: setup, deploy, rollback and cleanup.
//!
//! Each workflow is a fixed sequence of tasks. A task runs its remote
//! commands in order and the workflow stops at the first failure; effects of
//! earlier tasks stay applied.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backup::{BackupManager, ReleaseBackup, RestoreOutcome};
use crate::config::DeployConfig;
use crate::db::SchemaTool;
use crate::error::{Error, Result};
use crate::executor::{run_checked, RemoteExecutor};
use crate::layout::DeployLayout;
use crate::release::{previous_of, Release, ReleaseStore};
use crate::shared::{SharedLayoutReport, SharedLinker};
use crate::source::ReleaseSource;
use crate::utils::command::{CommandChain, RemoteCommand};

// ============================================================================
// Reports
// ============================================================================

/// What one task did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "task", rename_all = "camelCase")]
pub enum StepReport {
    #[serde(rename = "setup")]
    Setup {
        directories: Vec<String>,
        shared: SharedLayoutReport,
    },
    #[serde(rename = "deploy:update")]
    Update {
        release: Release,
        previous: Option<Release>,
    },
    #[serde(rename = "deploy:update_db")]
    UpdateDb { backup: Option<ReleaseBackup> },
    #[serde(rename = "deploy:finalize_update")]
    FinalizeUpdate {
        linked: Release,
        unlinked: Option<Release>,
    },
    #[serde(rename = "deploy:cleanup")]
    Cleanup(CleanupReport),
    #[serde(rename = "deploy:rollback:revision")]
    Revision { current: Release, abandoned: Release },
    #[serde(rename = "deploy:rollback:db_rollback")]
    DbRollback {
        backup: ReleaseBackup,
        outcome: RestoreOutcome,
    },
    #[serde(rename = "deploy:rollback:cleanup")]
    RollbackCleanup { removed: Option<Release> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub keep_releases: usize,
    pub total_releases: usize,
    pub removed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub workflow: String,
    pub host: String,
    pub deploy_to: String,
    pub steps: Vec<StepReport>,
}

/// One release as shown by `rollout releases`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEntry {
    pub id: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub live: bool,
    pub has_backup: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasesOverview {
    pub deploy_to: String,
    pub live: Option<String>,
    pub keep_releases: usize,
    pub releases: Vec<ReleaseEntry>,
}

// ============================================================================
// Manager
// ============================================================================

/// Drives the lifecycle of one target.
pub struct ReleaseManager<'a> {
    config: &'a DeployConfig,
    layout: DeployLayout,
    executor: &'a dyn RemoteExecutor,
    tool: &'a dyn SchemaTool,
    source: Option<&'a dyn ReleaseSource>,
}

impl<'a> ReleaseManager<'a> {
    pub fn new(
        config: &'a DeployConfig,
        executor: &'a dyn RemoteExecutor,
        tool: &'a dyn SchemaTool,
    ) -> Self {
        Self {
            config,
            layout: DeployLayout::new(config.deploy_to.as_str(), config.domain.as_str()),
            executor,
            tool,
            source: None,
        }
    }

    pub fn with_source(mut self, source: &'a dyn ReleaseSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn layout(&self) -> &DeployLayout {
        &self.layout
    }

    fn store(&self) -> ReleaseStore<'_> {
        ReleaseStore::new(self.executor, &self.layout)
    }

    fn linker(&self) -> SharedLinker<'_> {
        SharedLinker::new(self.executor, &self.layout)
    }

    fn backups(&self) -> BackupManager<'_> {
        BackupManager::new(self.executor, &self.layout, self.tool)
    }

    pub fn report(&self, workflow: &str, steps: Vec<StepReport>) -> WorkflowReport {
        WorkflowReport {
            workflow: workflow.to_string(),
            host: self.config.server.host.clone(),
            deploy_to: self.layout.deploy_to().to_string(),
            steps,
        }
    }

    fn source(&self) -> Result<&'a dyn ReleaseSource> {
        match self.source {
            Some(source) => Ok(source),
            None => {
                self.config.require_source()?;
                Err(Error::internal_unexpected("no release source configured"))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Create the directory layout and seed the shared settings file.
    ///
    /// Safe to run repeatedly.
    pub fn setup(&self) -> Result<StepReport> {
        let payload = self
            .config
            .schema_version
            .template()
            .render(&self.config.database);

        let directories = vec![
            self.layout.deploy_to().to_string(),
            self.layout.releases_root(),
            self.layout.shared_root(),
            self.layout.backups_dir(),
            self.layout.shared_domain_dir(),
            self.layout.shared_files(),
        ];

        log_status!("setup", "Creating layout under {}", self.layout.deploy_to());
        let chain = CommandChain::new()
            .then(RemoteCommand::mkdir_p(directories.iter().cloned()))
            .then(
                RemoteCommand::chown(&self.config.srv_usr, &self.layout.shared_files())
                    .sudo(self.config.use_sudo),
            );
        run_checked(self.executor, &chain)?;

        let shared = self.linker().ensure_shared_layout(&payload)?;
        Ok(StepReport::Setup {
            directories,
            shared,
        })
    }

    // ------------------------------------------------------------------------
    // Deploy tasks
    // ------------------------------------------------------------------------

    pub fn update(&self) -> Result<StepReport> {
        self.update_at(Utc::now())
    }

    /// Fetch a new release named after `now` and make it current.
    pub fn update_at(&self, now: DateTime<Utc>) -> Result<StepReport> {
        let source = self.source()?;
        let releases = self.store().list_releases()?;
        let release = Release::at(&self.layout, now);

        if releases.iter().any(|r| r.id >= release.id) {
            return Err(Error::validation_invalid_argument(
                "release",
                format!(
                    "Release {} is not newer than the latest deployed release",
                    release.id
                ),
                Some(release.id.clone()),
            )
            .with_hint("Check the clock on this machine, or wait a second and retry"));
        }

        log_status!("deploy", "Fetching release {}", release.id);
        source.fetch(self.executor, &release)?;

        log_status!("deploy", "Pointing current at {}", release.id);
        run_checked(
            self.executor,
            &CommandChain::atomic_symlink(&release.path, &self.layout.current_link()),
        )?;

        Ok(StepReport::Update {
            release,
            previous: releases.last().cloned(),
        })
    }

    /// Back up the database (when a previous release exists), then revert
    /// configuration, clear caches and apply schema updates.
    pub fn update_db(&self) -> Result<StepReport> {
        let backup = match self.store().previous_release()? {
            Some(previous) => Some(self.backups().backup(&previous)?),
            None => {
                log_status!("deploy", "First release, skipping database backup");
                None
            }
        };

        log_status!("deploy", "Updating database schema");
        let chain = CommandChain::new()
            .then(self.tool.config_revert())
            .then(self.tool.cache_clear_all())
            .then(self.tool.update_schema());
        run_checked(self.executor, &chain)?;

        Ok(StepReport::UpdateDb { backup })
    }

    /// Link shared resources into the newest release and out of the one before it.
    pub fn finalize_update(&self) -> Result<StepReport> {
        let releases = self.store().list_releases()?;
        let Some(current) = releases.last().cloned() else {
            return Err(Error::validation_invalid_argument(
                "release",
                "No release has been deployed yet",
                None,
            )
            .with_hint("Run 'rollout deploy <target>' first"));
        };

        log_status!("deploy", "Linking shared resources into {}", current.id);
        self.linker().link_into_release(&current)?;

        let previous = previous_of(&releases).cloned();
        if let Some(previous) = &previous {
            self.linker().unlink_from_release(previous)?;
        }

        Ok(StepReport::FinalizeUpdate {
            linked: current,
            unlinked: previous,
        })
    }

    pub fn cleanup(&self) -> Result<StepReport> {
        self.cleanup_keeping(self.config.keep_releases)
    }

    /// Remove all but the `keep` newest releases and their backups.
    ///
    /// The release `current` points at is always kept.
    pub fn cleanup_keeping(&self, keep: usize) -> Result<StepReport> {
        if keep == 0 {
            return Err(Error::config_invalid_value(
                "keep_releases",
                Some(keep.to_string()),
                "must be at least 1",
            ));
        }
        let store = self.store();
        let releases = store.list_releases()?;
        let total = releases.len();

        if total <= keep {
            log_status!("cleanup", "No old releases to clean up");
            return Ok(StepReport::Cleanup(CleanupReport {
                keep_releases: keep,
                total_releases: total,
                removed: Vec::new(),
                message: Some("no old releases to clean up".to_string()),
            }));
        }

        let live = store.live_release()?;
        let old: Vec<&Release> = releases[..total - keep]
            .iter()
            .filter(|r| live.as_ref().map_or(true, |l| l.id != r.id))
            .collect();

        if old.is_empty() {
            return Ok(StepReport::Cleanup(CleanupReport {
                keep_releases: keep,
                total_releases: total,
                removed: Vec::new(),
                message: Some("only the live release is past retention".to_string()),
            }));
        }

        log_status!("cleanup", "Keeping {} of {} deployed releases", keep, total);
        let paths = old
            .iter()
            .map(|r| r.path.clone())
            .chain(old.iter().map(|r| self.layout.backup_file(&r.id)));
        run_checked(self.executor, &CommandChain::from(RemoteCommand::rm_rf(paths)))?;

        Ok(StepReport::Cleanup(CleanupReport {
            keep_releases: keep,
            total_releases: total,
            removed: old.iter().map(|r| r.id.clone()).collect(),
            message: None,
        }))
    }

    // ------------------------------------------------------------------------
    // Rollback tasks
    // ------------------------------------------------------------------------

    /// Point `current` back at the previous release and relink its shared resources.
    pub fn revision(&self) -> Result<StepReport> {
        let releases = self.store().list_releases()?;
        let (Some(previous), Some(abandoned)) = (previous_of(&releases), releases.last()) else {
            return Err(Error::no_prior_release("code", releases.len()));
        };

        log_status!("rollback", "Pointing current back at {}", previous.id);
        let chain = CommandChain::atomic_symlink(&previous.path, &self.layout.current_link());
        run_checked(self.executor, &chain)?;

        let linker = self.linker();
        linker.link_into_release(previous)?;
        linker.unlink_from_release(abandoned)?;

        Ok(StepReport::Revision {
            current: previous.clone(),
            abandoned: abandoned.clone(),
        })
    }

    /// Restore the backup taken against the previous release, if there is one.
    pub fn db_rollback(&self) -> Result<StepReport> {
        let releases = self.store().list_releases()?;
        let Some(previous) = previous_of(&releases) else {
            return Err(Error::no_prior_release("database", releases.len()));
        };

        let backups = self.backups();
        let backup = backups.backup_for(previous);
        let outcome = backups.restore(&backup)?;
        Ok(StepReport::DbRollback { backup, outcome })
    }

    /// Delete the release a rollback moved away from, and its backup.
    ///
    /// Only the newest release is a candidate, and only while `current`
    /// points at an older one.
    pub fn rollback_cleanup(&self) -> Result<StepReport> {
        let store = self.store();
        let releases = store.list_releases()?;
        let live = store.live_release()?;

        let abandoned = match (live, releases.last()) {
            (Some(live), Some(newest)) if newest.id > live.id => Some(newest.clone()),
            _ => None,
        };

        if let Some(release) = &abandoned {
            log_status!("rollback", "Removing abandoned release {}", release.id);
            let paths = [release.path.clone(), self.layout.backup_file(&release.id)];
            run_checked(self.executor, &CommandChain::from(RemoteCommand::rm_rf(paths)))?;
        }

        Ok(StepReport::RollbackCleanup { removed: abandoned })
    }

    // ------------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------------

    pub fn run_setup(&self) -> Result<WorkflowReport> {
        Ok(self.report("setup", vec![self.setup()?]))
    }

    pub fn deploy(&self) -> Result<WorkflowReport> {
        self.deploy_at(Utc::now())
    }

    pub fn deploy_at(&self, now: DateTime<Utc>) -> Result<WorkflowReport> {
        let steps = vec![
            self.update_at(now)?,
            self.update_db()?,
            self.finalize_update()?,
            self.cleanup()?,
        ];
        Ok(self.report("deploy", steps))
    }

    pub fn rollback(&self) -> Result<WorkflowReport> {
        let steps = vec![
            self.revision()?,
            self.db_rollback()?,
            self.rollback_cleanup()?,
            self.cleanup()?,
        ];
        Ok(self.report("rollback", steps))
    }

    /// Releases on the host with their live and backup status.
    pub fn overview(&self) -> Result<ReleasesOverview> {
        let store = self.store();
        let releases = store.list_releases()?;
        let live = store.live_release()?.map(|r| r.id);
        let backups = self.backups().list_backups()?;

        let entries = releases
            .into_iter()
            .map(|release| ReleaseEntry {
                created_at: release
                    .created_at()
                    .map(|t| t.and_utc().to_rfc3339()),
                live: live.as_deref() == Some(release.id.as_str()),
                has_backup: backups.contains(&release.id),
                id: release.id,
                path: release.path,
            })
            .collect();

        Ok(ReleasesOverview {
            deploy_to: self.layout.deploy_to().to_string(),
            live,
            keep_releases: self.config.keep_releases,
            releases: entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_target, ConfigFormat};
    use crate::db::Drush;
    use crate::error::ErrorCode;
    use crate::executor::testing::FakeRemote;
    use crate::source::RemoteCacheSource;
    use chrono::TimeZone;

    const TARGET: &str = r#"{
        "deploy_to": "/srv/app",
        "server": { "host": "web1", "user": "deploy" },
        "db_type": "mysql",
        "db_name": "app",
        "db_username": "u",
        "db_password": "p",
        "repository": "git@example.com:app.git"
    }"#;

    fn config() -> DeployConfig {
        parse_target(TARGET, ConfigFormat::Json, "test.json")
            .unwrap()
            .validate()
            .unwrap()
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn id(day: u32) -> String {
        format!("202401{:02}000000", day)
    }

    struct Harness {
        config: DeployConfig,
        remote: FakeRemote,
        drush: Drush,
        source: RemoteCacheSource,
    }

    impl Harness {
        fn new(config: DeployConfig) -> Self {
            let layout = DeployLayout::new(config.deploy_to.as_str(), config.domain.as_str());
            let source = RemoteCacheSource::new(config.require_source().unwrap().clone(), layout.cached_copy());
            Self {
                drush: Drush::for_layout(&layout),
                remote: FakeRemote::new(),
                source,
                config,
            }
        }

        fn manager(&self) -> ReleaseManager<'_> {
            ReleaseManager::new(&self.config, &self.remote, &self.drush).with_source(&self.source)
        }

        fn seed_releases(&self, days: &[u32]) {
            for day in days {
                self.remote.add_dir(&format!("/srv/app/releases/{}", id(*day)));
            }
            if let Some(last) = days.last() {
                self.remote
                    .add_link("/srv/app/current", &format!("/srv/app/releases/{}", id(*last)));
            }
        }
    }

    #[test]
    fn setup_creates_layout_and_seeds_settings() {
        let h = Harness::new(config());
        let report = h.manager().run_setup().unwrap();

        assert_eq!(
            h.remote.sent()[0],
            "mkdir -p /srv/app /srv/app/releases /srv/app/shared /srv/app/db_backups/default /srv/app/shared/default /srv/app/shared/default/files && chown www-data:www-data /srv/app/shared/default/files"
        );
        let settings = h.remote.file("/srv/app/shared/default/local_settings.php").unwrap();
        assert!(settings.contains("'database' => 'app',"));
        assert_eq!(report.steps.len(), 1);
    }

    #[test]
    fn setup_uses_sudo_for_chown_when_enabled() {
        let mut config = config();
        config.use_sudo = true;
        let h = Harness::new(config);
        h.manager().setup().unwrap();
        assert!(h.remote.sent()[0].ends_with("&& sudo chown www-data:www-data /srv/app/shared/default/files"));
    }

    #[test]
    fn failed_chown_aborts_setup_before_settings() {
        let h = Harness::new(config());
        h.remote.fail_on("chown", "");
        let err = h.manager().setup().unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteCommandFailed);
        assert!(h.remote.file("/srv/app/shared/default/local_settings.php").is_none());
    }

    #[test]
    fn first_deploy_skips_backup_but_updates_schema() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.remote.clear_log();

        let report = h.manager().deploy_at(at(1)).unwrap();

        assert_eq!(h.remote.link("/srv/app/current").unwrap(), format!("/srv/app/releases/{}", id(1)));
        let executed = h.remote.executed_rendered();
        assert!(!executed.iter().any(|c| c.contains("sql-dump")));
        assert!(executed.contains(&"drush -r /srv/app/current fra -y".to_string()));
        assert!(executed.contains(&"drush -r /srv/app/current cc all".to_string()));
        assert!(executed.contains(&"drush -r /srv/app/current updatedb -y".to_string()));
        assert!(matches!(report.steps[1], StepReport::UpdateDb { backup: None }));
        assert_eq!(
            h.remote
                .link(&format!("/srv/app/releases/{}/sites/default/local_settings.php", id(1)))
                .unwrap(),
            "/srv/app/shared/default/local_settings.php"
        );
    }

    #[test]
    fn second_deploy_backs_up_under_previous_id_before_schema_update() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.manager().deploy_at(at(1)).unwrap();
        h.remote.clear_log();

        h.manager().deploy_at(at(2)).unwrap();

        let backup = format!("/srv/app/db_backups/default/{}.sql", id(1));
        assert!(h.remote.exists(&backup));

        let executed = h.remote.executed_rendered();
        let dump = executed.iter().position(|c| c.contains("sql-dump")).unwrap();
        let revert = executed.iter().position(|c| c.ends_with("fra -y")).unwrap();
        assert!(dump < revert);
        assert!(executed[dump].ends_with(&format!("> {}.partial", backup)));

        let old_files = format!("/srv/app/releases/{}/sites/default/files", id(1));
        assert!(!h.remote.exists(&old_files));
        assert!(h
            .remote
            .exists(&format!("/srv/app/releases/{}/sites/default/files", id(2))));
    }

    #[test]
    fn rollback_restores_previous_code_and_database() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.manager().deploy_at(at(1)).unwrap();
        h.manager().deploy_at(at(2)).unwrap();
        h.remote.clear_log();

        let report = h.manager().rollback().unwrap();

        assert_eq!(h.remote.link("/srv/app/current").unwrap(), format!("/srv/app/releases/{}", id(1)));
        let backup = format!("/srv/app/db_backups/default/{}.sql", id(1));
        assert!(!h.remote.exists(&backup));

        let executed = h.remote.executed_rendered();
        assert!(executed.contains(&"drush -r /srv/app/current sql-drop -y".to_string()));
        assert!(executed.contains(&format!("drush -r /srv/app/current sql-cli < {}", backup)));
        assert!(matches!(
            report.steps[1],
            StepReport::DbRollback { outcome: RestoreOutcome::Restored, .. }
        ));
        assert!(h
            .remote
            .exists(&format!("/srv/app/releases/{}/sites/default/files", id(1))));
        assert!(!h
            .remote
            .exists(&format!("/srv/app/releases/{}/sites/default/files", id(2))));
    }

    #[test]
    fn rollback_removes_the_abandoned_release() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.manager().deploy_at(at(1)).unwrap();
        h.manager().deploy_at(at(2)).unwrap();

        let report = h.manager().rollback().unwrap();

        assert!(!h.remote.exists(&format!("/srv/app/releases/{}", id(2))));
        assert!(h.remote.exists(&format!("/srv/app/releases/{}", id(1))));
        let StepReport::RollbackCleanup { removed } = &report.steps[2] else {
            panic!("expected rollback cleanup report");
        };
        assert_eq!(removed.as_ref().map(|r| r.id.clone()), Some(id(2)));
    }

    #[test]
    fn repeated_rollback_has_no_prior_release() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.manager().deploy_at(at(1)).unwrap();
        h.manager().deploy_at(at(2)).unwrap();
        h.manager().rollback().unwrap();
        h.remote.clear_log();

        let err = h.manager().rollback().unwrap_err();

        assert_eq!(err.code, ErrorCode::RollbackNoPriorRelease);
        assert!(h.remote.mutations().is_empty());
        assert_eq!(h.remote.link("/srv/app/current").unwrap(), format!("/srv/app/releases/{}", id(1)));
    }

    #[test]
    fn deploy_after_rollback_backs_up_and_returns_to_the_restored_release() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.manager().deploy_at(at(1)).unwrap();
        h.manager().deploy_at(at(2)).unwrap();
        h.manager().rollback().unwrap();

        let deploy = h.manager().deploy_at(at(3)).unwrap();
        let StepReport::UpdateDb { backup: Some(backup) } = &deploy.steps[1] else {
            panic!("expected a backup before the schema update");
        };
        assert_eq!(backup.release_id, id(1));

        let rollback = h.manager().rollback().unwrap();

        assert_eq!(h.remote.link("/srv/app/current").unwrap(), format!("/srv/app/releases/{}", id(1)));
        assert!(matches!(
            rollback.steps[1],
            StepReport::DbRollback { outcome: RestoreOutcome::Restored, .. }
        ));
        assert!(!h.remote.exists(&format!("/srv/app/releases/{}", id(3))));
        assert!(h
            .remote
            .exists(&format!("/srv/app/releases/{}/sites/default/local_settings.php", id(1))));
    }

    #[test]
    fn rollback_cleanup_is_a_no_op_when_newest_is_live() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2]);

        let step = h.manager().rollback_cleanup().unwrap();

        assert!(matches!(step, StepReport::RollbackCleanup { removed: None }));
        assert!(h.remote.mutations().is_empty());
    }

    #[test]
    fn rollback_cleanup_drops_the_abandoned_backup() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2]);
        h.remote
            .add_link("/srv/app/current", &format!("/srv/app/releases/{}", id(1)));
        h.remote
            .add_file(&format!("/srv/app/db_backups/default/{}.sql", id(2)), "-- dump");

        h.manager().rollback_cleanup().unwrap();

        assert_eq!(
            h.remote.mutations(),
            vec![format!(
                "rm -rf /srv/app/releases/{a} /srv/app/db_backups/default/{a}.sql",
                a = id(2)
            )]
        );
        assert!(!h
            .remote
            .exists(&format!("/srv/app/db_backups/default/{}.sql", id(2))));
    }

    #[test]
    fn rollback_never_removes_the_current_pointer() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2]);
        h.manager().revision().unwrap();

        let mutations = h.remote.mutations();
        assert!(!mutations.iter().any(|c| c == "rm /srv/app/current" || c == "rm -f /srv/app/current"));
        assert!(mutations[0].starts_with(&format!("ln -s /srv/app/releases/{} /srv/app/current.tmp-", id(1))));
        assert!(mutations[1].starts_with("mv -Tf /srv/app/current.tmp-"));
    }

    #[test]
    fn rollback_without_prior_release_fails_without_mutation() {
        for seeded in [&[][..], &[1][..]] {
            let h = Harness::new(config());
            h.remote.add_dir("/srv/app/releases");
            h.seed_releases(seeded);

            let err = h.manager().rollback().unwrap_err();
            assert_eq!(err.code, ErrorCode::RollbackNoPriorRelease);
            assert_eq!(err.message, "could not rollback the code because there is no prior release");
            assert!(h.remote.mutations().is_empty());
        }
    }

    #[test]
    fn db_rollback_requires_prior_release() {
        let h = Harness::new(config());
        h.seed_releases(&[1]);
        let err = h.manager().db_rollback().unwrap_err();
        assert_eq!(err.code, ErrorCode::RollbackNoPriorRelease);
        assert_eq!(err.details["operation"], "database");
    }

    #[test]
    fn db_rollback_without_backup_is_benign() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2]);

        let step = h.manager().db_rollback().unwrap();
        assert!(matches!(step, StepReport::DbRollback { outcome: RestoreOutcome::NoBackup, .. }));
        assert!(!h
            .remote
            .executed_rendered()
            .iter()
            .any(|c| c.contains("sql-drop") || c.contains("sql-cli")));
    }

    #[test]
    fn cleanup_keeps_only_newest_and_drops_their_backups() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2, 3]);
        for day in [1, 2] {
            h.remote
                .add_file(&format!("/srv/app/db_backups/default/{}.sql", id(day)), "-- dump");
        }

        let step = h.manager().cleanup_keeping(1).unwrap();

        let StepReport::Cleanup(report) = step else {
            panic!("expected cleanup report");
        };
        assert_eq!(report.removed, vec![id(1), id(2)]);
        assert!(h.remote.exists(&format!("/srv/app/releases/{}", id(3))));
        for day in [1, 2] {
            assert!(!h.remote.exists(&format!("/srv/app/releases/{}", id(day))));
            assert!(!h
                .remote
                .exists(&format!("/srv/app/db_backups/default/{}.sql", id(day))));
        }
        assert_eq!(
            h.remote.mutations(),
            vec![format!(
                "rm -rf /srv/app/releases/{a} /srv/app/releases/{b} /srv/app/db_backups/default/{a}.sql /srv/app/db_backups/default/{b}.sql",
                a = id(1),
                b = id(2)
            )]
        );
    }

    #[test]
    fn cleanup_removes_max_of_n_minus_k_releases() {
        for n in 0..7u32 {
            for keep in 1..5usize {
                let h = Harness::new(config());
                h.remote.add_dir("/srv/app/releases");
                let days: Vec<u32> = (1..=n).collect();
                h.seed_releases(&days);

                let StepReport::Cleanup(report) = h.manager().cleanup_keeping(keep).unwrap() else {
                    panic!("expected cleanup report");
                };
                let expected = (n as usize).saturating_sub(keep);
                assert_eq!(report.removed.len(), expected, "n={} keep={}", n, keep);
                if expected == 0 {
                    assert_eq!(report.message.as_deref(), Some("no old releases to clean up"));
                    assert!(h.remote.mutations().is_empty());
                }
                if let Some(last) = days.last() {
                    assert!(h.remote.exists(&format!("/srv/app/releases/{}", id(*last))));
                }
            }
        }
    }

    #[test]
    fn cleanup_rejects_zero_retention() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2]);

        let err = h.manager().cleanup_keeping(0).unwrap_err();

        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
        assert_eq!(err.details["key"], "keep_releases");
        assert!(h.remote.sent().is_empty());
    }

    #[test]
    fn cleanup_never_removes_the_live_release() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2]);
        h.remote
            .add_link("/srv/app/current", &format!("/srv/app/releases/{}", id(1)));

        let StepReport::Cleanup(report) = h.manager().cleanup_keeping(1).unwrap() else {
            panic!("expected cleanup report");
        };
        assert!(report.removed.is_empty());
        assert!(h.remote.exists(&format!("/srv/app/releases/{}", id(1))));
    }

    #[test]
    fn shared_settings_survive_any_number_of_deploys() {
        let h = Harness::new(config());
        h.manager().run_setup().unwrap();
        let seeded = h.remote.file("/srv/app/shared/default/local_settings.php").unwrap();

        for day in 1..=4 {
            h.manager().deploy_at(at(day)).unwrap();
        }
        h.manager().rollback().unwrap();
        h.manager().run_setup().unwrap();

        assert_eq!(
            h.remote.file("/srv/app/shared/default/local_settings.php").unwrap(),
            seeded
        );
        let writes = h
            .remote
            .sent()
            .iter()
            .filter(|c| *c == "put /srv/app/shared/default/local_settings.php")
            .count();
        assert_eq!(writes, 1);
    }

    #[test]
    fn deploy_without_repository_is_config_error() {
        let config = parse_target(
            &TARGET.replace(r#""repository": "git@example.com:app.git""#, r#""repository": """#),
            ConfigFormat::Json,
            "test.json",
        )
        .unwrap()
        .validate()
        .unwrap();
        let remote = FakeRemote::new();
        let drush = Drush::for_layout(&DeployLayout::new("/srv/app", "default"));

        let err = ReleaseManager::new(&config, &remote, &drush).update_at(at(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingKey);
        assert!(remote.sent().is_empty());
    }

    #[test]
    fn deploy_before_setup_fails_with_list_error() {
        let h = Harness::new(config());
        let err = h.manager().deploy_at(at(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteListFailed);
        assert!(h.remote.mutations().is_empty());
    }

    #[test]
    fn stale_clock_is_rejected_before_fetch() {
        let h = Harness::new(config());
        h.seed_releases(&[5]);
        let err = h.manager().update_at(at(4)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
        assert!(h.remote.mutations().is_empty());
    }

    #[test]
    fn failed_schema_update_stops_before_finalize() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.remote.fail_on("drush", "updatedb");

        let err = h.manager().deploy_at(at(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteCommandFailed);
        assert!(!h
            .remote
            .exists(&format!("/srv/app/releases/{}/sites/default/files", id(1))));
    }

    #[test]
    fn timeout_aborts_the_workflow() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        h.remote.timeout_on("drush", "fra");
        let err = h.manager().deploy_at(at(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteCommandTimeout);
    }

    #[test]
    fn named_domain_scopes_drush_and_paths() {
        let mut config = config();
        config.domain = "example.com".to_string();
        let h = Harness::new(config);
        h.manager().setup().unwrap();
        h.manager().deploy_at(at(1)).unwrap();

        assert!(h
            .remote
            .executed_rendered()
            .contains(&"drush -r /srv/app/current -l example.com updatedb -y".to_string()));
        assert!(h.remote.exists("/srv/app/shared/example.com/local_settings.php"));
    }

    #[test]
    fn overview_marks_live_and_backed_up_releases() {
        let h = Harness::new(config());
        h.seed_releases(&[1, 2]);
        h.remote
            .add_file(&format!("/srv/app/db_backups/default/{}.sql", id(1)), "");

        let overview = h.manager().overview().unwrap();
        assert_eq!(overview.live.as_deref(), Some(id(2).as_str()));
        assert!(overview.releases[0].has_backup);
        assert!(!overview.releases[0].live);
        assert!(overview.releases[1].live);
        assert_eq!(
            overview.releases[0].created_at.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn report_serializes_task_names() {
        let h = Harness::new(config());
        h.manager().setup().unwrap();
        let report = h.manager().deploy_at(at(1)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        let tasks: Vec<&str> = json["steps"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["task"].as_str().unwrap())
            .collect();
        assert_eq!(
            tasks,
            vec!["deploy:update", "deploy:update_db", "deploy:finalize_update", "deploy:cleanup"]
        );
        assert_eq!(json["deployTo"], "/srv/app");

        h.manager().deploy_at(at(2)).unwrap();
        let json = serde_json::to_value(h.manager().rollback().unwrap()).unwrap();
        let tasks: Vec<&str> = json["steps"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["task"].as_str().unwrap())
            .collect();
        assert_eq!(
            tasks,
            vec![
                "deploy:rollback:revision",
                "deploy:rollback:db_rollback",
                "deploy:rollback:cleanup",
                "deploy:cleanup"
            ]
        );
    }
}
