//! Materializing a release's file tree from source control.

use serde::Serialize;

use crate::config::SourceConfig;
use crate::error::Result;
use crate::executor::{run_checked, RemoteExecutor};
use crate::release::Release;
use crate::utils::command::{CommandChain, RemoteCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scm {
    Git,
    #[serde(rename = "hg")]
    Mercurial,
}

impl Scm {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "git" => Some(Scm::Git),
            "hg" | "mercurial" => Some(Scm::Mercurial),
            _ => None,
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            Scm::Git => "git",
            Scm::Mercurial => "hg",
        }
    }

    /// Metadata directory stripped from each release.
    pub fn metadata_dir(&self) -> &'static str {
        match self {
            Scm::Git => ".git",
            Scm::Mercurial => ".hg",
        }
    }
}

/// Produces the file tree of a new release on the remote host.
pub trait ReleaseSource {
    fn fetch(&self, executor: &dyn RemoteExecutor, release: &Release) -> Result<()>;
}

/// Keeps a checkout in `shared/cached-copy`, refreshes it on every deploy
/// and copies it into the new release.
pub struct RemoteCacheSource {
    source: SourceConfig,
    cached_copy: String,
}

impl RemoteCacheSource {
    pub fn new(source: SourceConfig, cached_copy: impl Into<String>) -> Self {
        Self {
            source,
            cached_copy: cached_copy.into(),
        }
    }

    fn clone_chain(&self) -> CommandChain {
        let cmd = match self.source.scm {
            Scm::Git => RemoteCommand::new("git")
                .args(["clone", "-q", "-b"])
                .arg(self.source.branch.as_str()),
            Scm::Mercurial => RemoteCommand::new("hg")
                .args(["clone", "-q", "-u"])
                .arg(self.source.branch.as_str()),
        };
        CommandChain::from(
            cmd.arg(self.source.repository.as_str())
                .arg(self.cached_copy.as_str()),
        )
    }

    fn update_chain(&self) -> CommandChain {
        let cached = self.cached_copy.as_str();
        match self.source.scm {
            Scm::Git => CommandChain::new()
                .then(RemoteCommand::new("git").args(["-C", cached, "fetch", "-q", "origin"]))
                .then(
                    RemoteCommand::new("git")
                        .args(["-C", cached, "reset", "-q", "--hard"])
                        .arg(format!("origin/{}", self.source.branch)),
                ),
            Scm::Mercurial => CommandChain::new()
                .then(RemoteCommand::new("hg").args(["-R", cached, "pull", "-q"]))
                .then(
                    RemoteCommand::new("hg")
                        .args(["-R", cached, "update", "-q", "-C"])
                        .arg(self.source.branch.as_str()),
                ),
        }
    }

    fn copy_chain(&self, release: &Release) -> CommandChain {
        CommandChain::new()
            .then(
                RemoteCommand::new("cp")
                    .arg("-RPp")
                    .arg(self.cached_copy.as_str())
                    .arg(release.path.as_str()),
            )
            .then(RemoteCommand::rm_rf([format!(
                "{}/{}",
                release.path,
                self.source.scm.metadata_dir()
            )]))
    }
}

impl ReleaseSource for RemoteCacheSource {
    fn fetch(&self, executor: &dyn RemoteExecutor, release: &Release) -> Result<()> {
        let probe = CommandChain::from(RemoteCommand::test_exists(&self.cached_copy));
        let cached = executor.run(&probe)?.success;

        if cached {
            log_status!("deploy", "Updating cached copy at {}", self.cached_copy);
            run_checked(executor, &self.update_chain())?;
        } else {
            log_status!(
                "deploy",
                "Cloning {} ({}) into {}",
                self.source.repository,
                self.source.branch,
                self.cached_copy
            );
            run_checked(executor, &self.clone_chain())?;
        }

        log_status!("deploy", "Copying cached copy to {}", release.path);
        run_checked(executor, &self.copy_chain(release))?;
        Ok(())
    }
}
