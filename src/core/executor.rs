// Remote execution seam - everything the lifecycle does on the target goes through here

use crate::error::{Error, RemoteCommandFailedDetails, Result, TargetDetails};
use crate::ssh::{CommandOutput, SshClient};
use crate::utils::command::{CommandChain, RemoteCommand};

/// Runs commands and writes files on the deploy target.
///
/// `run` reports non-zero exits through [`CommandOutput`]; transport failures
/// such as an expired timeout are errors.
pub trait RemoteExecutor {
    fn run(&self, chain: &CommandChain) -> Result<CommandOutput>;

    /// Write `contents` to `remote_path`, replacing any existing file atomically.
    fn put(&self, contents: &str, remote_path: &str) -> Result<()>;

    fn target(&self) -> TargetDetails;
}

impl RemoteExecutor for SshClient {
    fn run(&self, chain: &CommandChain) -> Result<CommandOutput> {
        self.execute(&chain.render(), None)
    }

    fn put(&self, contents: &str, remote_path: &str) -> Result<()> {
        let tmp_path = format!("{}.rollout-upload.{}", remote_path, std::process::id());
        let chain = CommandChain::new()
            .then(RemoteCommand::new("cat").stdout_to(tmp_path.as_str()))
            .then(RemoteCommand::mv_f(&tmp_path, remote_path));

        let output = self.execute(&chain.render(), Some(contents.as_bytes()))?;
        ensure_success(self, &chain, output).map(|_| ())
    }

    fn target(&self) -> TargetDetails {
        self.target_details()
    }
}

/// Run a chain and turn a non-zero exit into `remote.command_failed`.
pub fn run_checked(executor: &dyn RemoteExecutor, chain: &CommandChain) -> Result<CommandOutput> {
    let output = executor.run(chain)?;
    ensure_success(executor, chain, output)
}

fn ensure_success(
    executor: &dyn RemoteExecutor,
    chain: &CommandChain,
    output: CommandOutput,
) -> Result<CommandOutput> {
    if output.success {
        return Ok(output);
    }

    Err(Error::remote_command_failed(RemoteCommandFailedDetails {
        command: chain.render(),
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        target: executor.target(),
    }))
}
