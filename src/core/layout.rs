//! Remote directory layout under `deploy_to`.

use crate::defaults::{
    CACHED_COPY_DIR, CURRENT_LINK, DB_BACKUPS_DIR, FILES_DIR, RELEASES_DIR, SETTINGS_FILE,
    SHARED_DIR, SITES_DIR,
};

/// Resolves every remote path the lifecycle touches for one target and domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployLayout {
    deploy_to: String,
    domain: String,
}

impl DeployLayout {
    pub fn new(deploy_to: impl Into<String>, domain: impl Into<String>) -> Self {
        let deploy_to: String = deploy_to.into();
        Self {
            deploy_to: deploy_to.trim_end_matches('/').to_string(),
            domain: domain.into(),
        }
    }

    pub fn deploy_to(&self) -> &str {
        &self.deploy_to
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn releases_root(&self) -> String {
        format!("{}/{}", self.deploy_to, RELEASES_DIR)
    }

    pub fn release_path(&self, id: &str) -> String {
        format!("{}/{}", self.releases_root(), id)
    }

    pub fn current_link(&self) -> String {
        format!("{}/{}", self.deploy_to, CURRENT_LINK)
    }

    pub fn shared_root(&self) -> String {
        format!("{}/{}", self.deploy_to, SHARED_DIR)
    }

    pub fn shared_domain_dir(&self) -> String {
        format!("{}/{}", self.shared_root(), self.domain)
    }

    pub fn shared_settings(&self) -> String {
        format!("{}/{}", self.shared_domain_dir(), SETTINGS_FILE)
    }

    pub fn shared_files(&self) -> String {
        format!("{}/{}", self.shared_domain_dir(), FILES_DIR)
    }

    pub fn cached_copy(&self) -> String {
        format!("{}/{}", self.shared_root(), CACHED_COPY_DIR)
    }

    pub fn backups_dir(&self) -> String {
        format!("{}/{}/{}", self.deploy_to, DB_BACKUPS_DIR, self.domain)
    }

    pub fn backup_file(&self, release_id: &str) -> String {
        format!("{}/{}.sql", self.backups_dir(), release_id)
    }

    /// `sites/<domain>` inside a release.
    pub fn release_site_dir(&self, release_path: &str) -> String {
        format!("{}/{}/{}", release_path, SITES_DIR, self.domain)
    }

    pub fn release_settings(&self, release_path: &str) -> String {
        format!("{}/{}", self.release_site_dir(release_path), SETTINGS_FILE)
    }

    pub fn release_files(&self, release_path: &str) -> String {
        format!("{}/{}", self.release_site_dir(release_path), FILES_DIR)
    }
}
