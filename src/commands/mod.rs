use clap::Args;
use std::path::{Path, PathBuf};

use rollout::config::{self, DeployConfig};
use rollout::db::Drush;
use rollout::deploy::ReleaseManager;
use rollout::layout::DeployLayout;
use rollout::source::RemoteCacheSource;
use rollout::ssh::SshClient;

pub type CmdResult<T> = rollout::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Explicit target file; replaces lookup by target id.
    pub config: Option<PathBuf>,
}

/// Target selection shared by every command.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Target id (file in ~/.config/rollout/targets/); optional with --config
    pub target: Option<String>,
}

/// Resolve and validate the target configuration.
///
/// Runs before anything touches the remote host.
pub(crate) fn load_config(args: &TargetArgs, global: &GlobalArgs) -> rollout::Result<DeployConfig> {
    match (&global.config, &args.target) {
        (Some(path), _) => config::load_from_path(Path::new(path)),
        (None, Some(id)) => config::load_target(id),
        (None, None) => Err(rollout::Error::validation_invalid_argument(
            "target",
            "Provide a target id or --config <path>",
            None,
        )),
    }
}

/// Everything a workflow needs to talk to one target.
pub(crate) struct TargetContext {
    config: DeployConfig,
    client: SshClient,
    drush: Drush,
    source: Option<RemoteCacheSource>,
}

impl TargetContext {
    pub fn connect(config: DeployConfig) -> rollout::Result<Self> {
        let client = SshClient::from_server(&config.server, config.command_timeout)?
            .with_deploy_to(config.deploy_to.as_str());

        let layout = DeployLayout::new(config.deploy_to.as_str(), config.domain.as_str());
        let drush = Drush::for_layout(&layout);
        let source = config
            .source
            .clone()
            .map(|source| RemoteCacheSource::new(source, layout.cached_copy()));

        Ok(Self {
            config,
            client,
            drush,
            source,
        })
    }

    pub fn manager(&self) -> ReleaseManager<'_> {
        let manager = ReleaseManager::new(&self.config, &self.client, &self.drush);
        match &self.source {
            Some(source) => manager.with_source(source),
            None => manager,
        }
    }
}

pub(crate) fn connect(args: &TargetArgs, global: &GlobalArgs) -> rollout::Result<TargetContext> {
    TargetContext::connect(load_config(args, global)?)
}

pub mod cleanup;
pub mod deploy;
pub mod releases;
pub mod rollback;
pub mod setup;
pub mod task;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (rollout::Result<serde_json::Value>, i32) {
    crate::tty::status("rollout is working...");

    match command {
        crate::Commands::Setup(args) => dispatch!(args, global, setup),
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Rollback(args) => dispatch!(args, global, rollback),
        crate::Commands::Cleanup(args) => dispatch!(args, global, cleanup),
        crate::Commands::Releases(args) => dispatch!(args, global, releases),
        crate::Commands::Task(args) => dispatch!(args, global, task),
    }
}
