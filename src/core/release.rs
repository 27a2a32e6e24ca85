//! Releases on the remote host and the store that lists them.
//!
//! A release is a directory under `releases/` named by its UTC creation
//! timestamp. Ids are fixed-width digits, so string order is creation order.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::defaults::RELEASE_ID_FORMAT;
use crate::error::{Error, RemoteCommandFailedDetails, Result};
use crate::executor::RemoteExecutor;
use crate::layout::DeployLayout;
use crate::utils::command::{CommandChain, RemoteCommand};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Release {
    pub id: String,
    pub path: String,
}

impl Release {
    pub fn new(layout: &DeployLayout, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            path: layout.release_path(&id),
            id,
        }
    }

    /// A fresh release named after `now`.
    pub fn at(layout: &DeployLayout, now: DateTime<Utc>) -> Self {
        Self::new(layout, new_id(now))
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.id, RELEASE_ID_FORMAT).ok()
    }
}

pub fn new_id(now: DateTime<Utc>) -> String {
    now.format(RELEASE_ID_FORMAT).to_string()
}

pub fn is_release_id(name: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d{14}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Read-only view of the releases deployed on a target.
pub struct ReleaseStore<'a> {
    executor: &'a dyn RemoteExecutor,
    layout: &'a DeployLayout,
}

impl<'a> ReleaseStore<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, layout: &'a DeployLayout) -> Self {
        Self { executor, layout }
    }

    /// All releases, oldest first.
    ///
    /// A missing releases root is an error: the target has not been set up.
    pub fn list_releases(&self) -> Result<Vec<Release>> {
        let chain = CommandChain::from(RemoteCommand::list_dir(&self.layout.releases_root()));
        let output = self.executor.run(&chain)?;

        if !output.success {
            return Err(Error::remote_list_failed(RemoteCommandFailedDetails {
                command: chain.render(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                target: self.executor.target(),
            })
            .with_hint("Run 'rollout setup <target>' to create the directory layout"));
        }

        let mut ids: Vec<&str> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|name| is_release_id(name))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        Ok(ids.into_iter().map(|id| Release::new(self.layout, id)).collect())
    }

    /// The newest release.
    pub fn current_release(&self) -> Result<Option<Release>> {
        Ok(self.list_releases()?.pop())
    }

    /// The release immediately before the newest one.
    pub fn previous_release(&self) -> Result<Option<Release>> {
        Ok(previous_of(&self.list_releases()?).cloned())
    }

    /// The release the `current` symlink points at, if any.
    pub fn live_release(&self) -> Result<Option<Release>> {
        let chain = CommandChain::from(RemoteCommand::readlink(&self.layout.current_link()));
        let output = self.executor.run(&chain)?;
        if !output.success {
            return Ok(None);
        }

        let target = output.stdout.trim().trim_end_matches('/');
        let Some(id) = target.rsplit('/').next().filter(|id| is_release_id(id)) else {
            return Ok(None);
        };
        Ok(Some(Release::new(self.layout, id)))
    }
}

/// Second-to-last entry of an oldest-first list.
pub fn previous_of(releases: &[Release]) -> Option<&Release> {
    releases.len().checked_sub(2).map(|i| &releases[i])
}
