use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{cleanup, deploy, releases, rollback, setup, task};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "rollout")]
#[command(version = VERSION)]
#[command(about = "Release lifecycle manager for symlink-swapped web deployments")]
struct Cli {
    /// Target file to use instead of ~/.config/rollout/targets/<target>.json
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the remote directory layout and seed shared settings
    Setup(setup::SetupArgs),
    /// Fetch a new release, update the database, link shared resources and prune
    Deploy(deploy::DeployArgs),
    /// Return to the previous release and restore its database backup
    Rollback(rollback::RollbackArgs),
    /// Remove releases beyond the retention count
    Cleanup(cleanup::CleanupArgs),
    /// List deployed releases with live and backup status
    Releases(releases::ReleasesArgs),
    /// Run a single named task (e.g. deploy:update_db)
    Task(task::TaskArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if output::print_json_result(json_result).is_err() {
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
