//! Database and schema commands run against the live code root.

use crate::layout::DeployLayout;
use crate::utils::command::RemoteCommand;

/// Builds the database/schema commands for one site.
///
/// Implementations only build commands; running them is the executor's job.
pub trait SchemaTool {
    /// Dump the whole database into `dump_path`.
    fn sql_dump(&self, dump_path: &str) -> RemoteCommand;

    fn sql_drop(&self) -> RemoteCommand;

    /// Load `dump_path` through the database client's stdin.
    fn sql_import(&self, dump_path: &str) -> RemoteCommand;

    fn config_revert(&self) -> RemoteCommand;

    fn cache_clear_all(&self) -> RemoteCommand;

    fn update_schema(&self) -> RemoteCommand;
}

/// Drush, scoped with `-r <root>` and `-l <domain>` for non-default sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drush {
    root: String,
    uri: Option<String>,
}

impl Drush {
    pub fn new(root: impl Into<String>, domain: &str) -> Self {
        Self {
            root: root.into(),
            uri: (domain != "default").then(|| domain.to_string()),
        }
    }

    /// Drush bound to the `current` link of a target.
    pub fn for_layout(layout: &DeployLayout) -> Self {
        Self::new(layout.current_link(), layout.domain())
    }

    fn command<const N: usize>(&self, subcommand: [&str; N]) -> RemoteCommand {
        let mut cmd = RemoteCommand::new("drush").arg("-r").arg(self.root.as_str());
        if let Some(uri) = &self.uri {
            cmd = cmd.arg("-l").arg(uri.as_str());
        }
        cmd.args(subcommand)
    }
}

impl SchemaTool for Drush {
    fn sql_dump(&self, dump_path: &str) -> RemoteCommand {
        self.command(["sql-dump"]).stdout_to(dump_path)
    }

    fn sql_drop(&self) -> RemoteCommand {
        self.command(["sql-drop", "-y"])
    }

    fn sql_import(&self, dump_path: &str) -> RemoteCommand {
        self.command(["sql-cli"]).stdin_from(dump_path)
    }

    fn config_revert(&self) -> RemoteCommand {
        self.command(["fra", "-y"])
    }

    fn cache_clear_all(&self) -> RemoteCommand {
        self.command(["cc", "all"])
    }

    fn update_schema(&self) -> RemoteCommand {
        self.command(["updatedb", "-y"])
    }
}
