use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, RemoteCommandTimeoutDetails, Result, TargetDetails};
use crate::server::Server;

pub struct SshClient {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally through `sh -c` instead of over SSH.
    /// Set automatically when the server host is localhost/127.0.0.1/::1.
    pub is_local: bool,
    pub timeout: Duration,
    deploy_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }
}

const MAX_ATTEMPTS: u32 = 3;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl SshClient {
    pub fn from_server(server: &Server, timeout: Duration) -> Result<Self> {
        let identity_file = match &server.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !std::path::Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(
                        server.host.clone(),
                        expanded,
                    ));
                }
                Some(expanded)
            }
            _ => None,
        };

        let is_local = is_local_host(&server.host);
        if is_local {
            log_status!("ssh", "Host '{}' is local, using local execution", server.host);
        }

        Ok(Self {
            host: server.host.clone(),
            user: server.user.clone(),
            port: server.port,
            identity_file,
            is_local,
            timeout,
            deploy_to: None,
        })
    }

    /// Attach the deploy root so failures can report where they happened.
    pub fn with_deploy_to(mut self, deploy_to: impl Into<String>) -> Self {
        self.deploy_to = Some(deploy_to.into());
        self
    }

    pub fn target_details(&self) -> TargetDetails {
        TargetDetails {
            host: Some(self.host.clone()),
            deploy_to: self.deploy_to.clone(),
        }
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        // Never prompt; detect dead connections instead of hanging on them.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
            "-o".to_string(),
            "ServerAliveInterval=15".to_string(),
            "-o".to_string(),
            "ServerAliveCountMax=3".to_string(),
        ]);

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        args
    }

    /// Run a shell command on the target, optionally feeding `stdin`.
    ///
    /// A non-zero exit is reported through [`CommandOutput`], not as an error;
    /// only an expired timeout is an `Err`.
    pub fn execute(&self, command: &str, stdin: Option<&[u8]>) -> Result<CommandOutput> {
        let backoff_secs = [0, 2, 5];

        for attempt in 0..MAX_ATTEMPTS {
            let result = self.execute_once(command, stdin)?;

            // Only retry ssh's own connection failures; the command itself never ran.
            // A local shell has no transport to fail.
            if self.is_local
                || result.success
                || attempt + 1 >= MAX_ATTEMPTS
                || !is_transient_ssh_error(&result)
            {
                return Ok(result);
            }

            let delay = backoff_secs.get(attempt as usize + 1).copied().unwrap_or(5);
            log_status!(
                "ssh",
                "Connection failed (attempt {}/{}), retrying in {}s...",
                attempt + 1,
                MAX_ATTEMPTS,
                delay
            );
            thread::sleep(Duration::from_secs(delay));
        }

        Ok(CommandOutput::failed(-1, "SSH retry exhausted"))
    }

    fn execute_once(&self, command: &str, stdin: Option<&[u8]>) -> Result<CommandOutput> {
        let mut cmd = if self.is_local {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        } else {
            let mut cmd = Command::new("ssh");
            cmd.args(self.build_ssh_args(command));
            cmd
        };

        match run_with_timeout(&mut cmd, stdin, self.timeout) {
            Ok(Some(output)) => Ok(output),
            Ok(None) => Err(Error::remote_command_timeout(RemoteCommandTimeoutDetails {
                command: command.to_string(),
                timeout_secs: self.timeout.as_secs(),
                target: self.target_details(),
            })),
            Err(message) => Ok(CommandOutput::failed(-1, message)),
        }
    }
}

/// Spawn `cmd`, wait at most `timeout`, and collect its output.
///
/// `Ok(None)` means the deadline passed and the child was killed.
fn run_with_timeout(
    cmd: &mut Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
) -> std::result::Result<Option<CommandOutput>, String> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn().map_err(|e| format!("Command error: {}", e))?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    if let (Some(bytes), Some(mut pipe)) = (stdin, child.stdin.take()) {
        // Dropping the pipe after writing closes the child's stdin.
        if let Err(e) = pipe.write_all(bytes) {
            kill_quietly(&mut child);
            return Err(format!("Failed to write stdin: {}", e));
        }
    }

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill_quietly(&mut child);
                return Ok(None);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                kill_quietly(&mut child);
                return Err(format!("Command error: {}", e));
            }
        }
    };

    Ok(Some(CommandOutput {
        stdout: stdout_reader.join().unwrap_or_default(),
        stderr: stderr_reader.join().unwrap_or_default(),
        success: status.success(),
        exit_code: status.code().unwrap_or(-1),
    }))
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).to_string()
    })
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Check if an SSH failure is a transient connection error worth retrying.
///
/// ssh exits 255 for its own errors, never for the remote command's. Stderr
/// text is not consulted: remote tools print "connection refused" for their
/// own failures after they have already run.
fn is_transient_ssh_error(output: &CommandOutput) -> bool {
    output.exit_code == 255
}
