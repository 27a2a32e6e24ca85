//! Deploy target configuration.
//!
//! A target file is parsed into [`TargetFile`] (every field optional), then
//! validated exactly once into the immutable [`DeployConfig`]. All problems
//! found during validation are reported together.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::defaults;
use crate::error::{Error, Result};
use crate::paths;
use crate::server::Server;
use crate::settings::SchemaVersion;
use crate::source::Scm;
use crate::utils::io;
use crate::utils::validation::Problems;

/// Scalar that may be written as a string or a bare number (`7` or `"7"`).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(i64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServer {
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<String>,
}

/// On-disk shape of a target file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TargetFile {
    pub deploy_to: Option<String>,
    pub server: Option<RawServer>,

    pub db_type: Option<String>,
    pub db_name: Option<String>,
    #[serde(alias = "db_user")]
    pub db_username: Option<String>,
    pub db_password: Option<String>,
    pub db_host: Option<String>,

    pub domain: Option<String>,
    #[serde(alias = "schema_version")]
    pub drupal_version: Option<StringOrNumber>,
    pub keep_releases: Option<i64>,
    pub srv_usr: Option<String>,
    pub srv_password: Option<String>,

    pub repository: Option<String>,
    pub branch: Option<String>,
    pub scm: Option<String>,

    pub use_sudo: Option<bool>,
    pub command_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseConfig {
    pub db_type: String,
    pub name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceConfig {
    pub repository: String,
    pub branch: String,
    pub scm: Scm,
}

/// Validated, immutable configuration for one deploy target.
#[derive(Debug, Clone, Serialize)]
pub struct DeployConfig {
    pub deploy_to: String,
    pub server: Server,
    pub database: DatabaseConfig,
    pub schema_version: SchemaVersion,
    pub domain: String,
    pub keep_releases: usize,
    pub srv_usr: String,
    #[serde(skip_serializing)]
    pub srv_password: String,
    pub source: Option<SourceConfig>,
    pub use_sudo: bool,
    #[serde(skip_serializing)]
    pub command_timeout: Duration,
}

impl DeployConfig {
    /// Source settings, required by any workflow that fetches code.
    pub fn require_source(&self) -> Result<&SourceConfig> {
        self.source.as_ref().ok_or_else(|| {
            Error::config_missing_key("repository", None)
                .with_hint("Set 'repository' in the target file to deploy code")
        })
    }

    /// Return a copy with a different retention count.
    pub fn with_keep_releases(mut self, keep: usize) -> Result<Self> {
        if keep == 0 {
            return Err(Error::config_invalid_value(
                "keep_releases",
                Some(keep.to_string()),
                "must be at least 1",
            ));
        }
        self.keep_releases = keep;
        Ok(self)
    }
}

impl TargetFile {
    pub fn validate(self) -> Result<DeployConfig> {
        let mut problems = Problems::new();

        let deploy_to = problems.require_non_empty(self.deploy_to, "deploy_to");
        if let Some(path) = &deploy_to {
            if !path.starts_with('/') {
                problems.push("deploy_to", "must be an absolute path");
            }
        }

        let raw_server = self.server.unwrap_or_default();
        let host = problems.require_non_empty(raw_server.host, "server.host");
        let user = problems.require_non_empty(raw_server.user, "server.user");

        let db_type = problems.require_non_empty(self.db_type, "db_type");
        let db_name = problems.require_non_empty(self.db_name, "db_name");
        let db_username = problems.require_non_empty(self.db_username, "db_username");
        let db_password = problems.require(self.db_password, "db_password");

        let version_raw = self
            .drupal_version
            .map(StringOrNumber::into_string)
            .unwrap_or_else(defaults::default_drupal_version);
        let schema_version = SchemaVersion::parse(&version_raw);
        if schema_version.is_none() {
            problems.push(
                "drupal_version",
                format!("unsupported version '{}' (expected 6 or 7)", version_raw),
            );
        }

        let domain = self.domain.unwrap_or_else(defaults::default_domain);
        if domain.is_empty() || domain.contains('/') || domain == "." || domain == ".." {
            problems.push("domain", format!("'{}' is not a valid site directory name", domain));
        }

        let keep_releases = match self.keep_releases {
            None => defaults::default_keep_releases(),
            Some(n) if n >= 1 => n as usize,
            Some(n) => {
                problems.push("keep_releases", format!("must be at least 1, got {}", n));
                defaults::default_keep_releases()
            }
        };

        let scm = match self.scm.as_deref() {
            None => Scm::Git,
            Some(raw) => Scm::parse(raw).unwrap_or_else(|| {
                problems.push("scm", format!("unsupported scm '{}' (expected git or hg)", raw));
                Scm::Git
            }),
        };

        if self.command_timeout_secs == Some(0) {
            problems.push("command_timeout_secs", "must be greater than 0");
        }

        problems.finish()?;

        // Every required value was checked above; a None here would mean the
        // validation and the construction below disagree.
        let (
            Some(deploy_to),
            Some(host),
            Some(user),
            Some(db_type),
            Some(db_name),
            Some(db_username),
            Some(db_password),
            Some(schema_version),
        ) = (
            deploy_to,
            host,
            user,
            db_type,
            db_name,
            db_username,
            db_password,
            schema_version,
        )
        else {
            return Err(Error::internal_unexpected("validated configuration is incomplete"));
        };

        let source = self
            .repository
            .filter(|r| !r.trim().is_empty())
            .map(|repository| SourceConfig {
                repository,
                branch: self.branch.unwrap_or_else(defaults::default_branch),
                scm,
            });

        Ok(DeployConfig {
            deploy_to: deploy_to.trim_end_matches('/').to_string(),
            server: Server {
                host,
                user,
                port: raw_server.port.unwrap_or_else(defaults::default_ssh_port),
                identity_file: raw_server.identity_file.filter(|p| !p.is_empty()),
            },
            database: DatabaseConfig {
                db_type,
                name: db_name,
                username: db_username,
                password: db_password,
                host: self.db_host.unwrap_or_else(defaults::default_db_host),
            },
            schema_version,
            domain,
            keep_releases,
            srv_usr: self.srv_usr.unwrap_or_else(defaults::default_srv_usr),
            srv_password: self.srv_password.unwrap_or_else(defaults::default_srv_password),
            source,
            use_sudo: self.use_sudo.unwrap_or(false),
            command_timeout: Duration::from_secs(
                self.command_timeout_secs
                    .unwrap_or_else(defaults::default_command_timeout_secs),
            ),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Parse target file content without validating it.
pub fn parse_target(content: &str, format: ConfigFormat, origin: &str) -> Result<TargetFile> {
    match format {
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| Error::config_invalid_json(origin, e.to_string())),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| Error::config_invalid_json(origin, e.to_string()))
        }
    }
}

/// Load and validate a target file at an explicit path.
pub fn load_from_path(path: &Path) -> Result<DeployConfig> {
    let origin = path.display().to_string();
    let content = io::read_file(path, &format!("read {}", origin))?;
    parse_target(&content, ConfigFormat::from_path(path), &origin)?.validate()
}

/// Load and validate a named target from `~/.config/rollout/targets/`.
pub fn load_target(id: &str) -> Result<DeployConfig> {
    if id.is_empty() || id.contains('/') {
        return Err(Error::validation_invalid_argument(
            "target",
            "Target id must be a plain name",
            Some(id.to_string()),
        ));
    }

    let candidates = paths::target_candidates(id)?;
    let path = candidates.iter().find(|p| p.exists()).ok_or_else(|| {
        Error::target_not_found(id, candidates.first().map(|p| p.display().to_string()))
    })?;

    load_from_path(path)
}
