//! Typed remote command construction.
//!
//! Commands are assembled from argument lists and only turned into a shell
//! string at the last moment, so user-supplied values (paths, domains,
//! credentials) can never change the shape of the command.

use std::fmt;

use crate::utils::shell::{quote_arg, quote_args};

/// A single program invocation with optional redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    program: String,
    args: Vec<String>,
    stdin_from: Option<String>,
    stdout_to: Option<String>,
    sudo: bool,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_from: None,
            stdout_to: None,
            sudo: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed the command's stdin from a remote file (`< path`).
    pub fn stdin_from(mut self, path: impl Into<String>) -> Self {
        self.stdin_from = Some(path.into());
        self
    }

    /// Redirect the command's stdout into a remote file (`> path`).
    pub fn stdout_to(mut self, path: impl Into<String>) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    /// Prefix with `sudo` when `enabled` (the "try sudo" switch).
    pub fn sudo(mut self, enabled: bool) -> Self {
        self.sudo = enabled;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_path(&self) -> Option<&str> {
        self.stdin_from.as_deref()
    }

    pub fn stdout_path(&self) -> Option<&str> {
        self.stdout_to.as_deref()
    }

    pub fn uses_sudo(&self) -> bool {
        self.sudo
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.sudo {
            out.push_str("sudo ");
        }
        out.push_str(&quote_arg(&self.program));
        if !self.args.is_empty() {
            out.push(' ');
            out.push_str(&quote_args(&self.args));
        }
        if let Some(path) = &self.stdin_from {
            out.push_str(" < ");
            out.push_str(&quote_arg(path));
        }
        if let Some(path) = &self.stdout_to {
            out.push_str(" > ");
            out.push_str(&quote_arg(path));
        }
        out
    }

    // ---------------------------------------------------------------------
    // Filesystem primitives used by the lifecycle
    // ---------------------------------------------------------------------

    pub fn mkdir_p<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("mkdir").arg("-p").args(paths)
    }

    pub fn chown(owner: &str, path: &str) -> Self {
        Self::new("chown").arg(format!("{}:{}", owner, owner)).arg(path)
    }

    pub fn rm_f<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("rm").arg("-f").args(paths)
    }

    pub fn rm_rf<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("rm").arg("-rf").args(paths)
    }

    pub fn mv_f(from: &str, to: &str) -> Self {
        Self::new("mv").arg("-f").arg(from).arg(to)
    }

    pub fn test_exists(path: &str) -> Self {
        Self::new("test").arg("-e").arg(path)
    }

    pub fn list_dir(path: &str) -> Self {
        Self::new("ls").arg("-1").arg(path)
    }

    pub fn readlink(path: &str) -> Self {
        Self::new("readlink").arg(path)
    }

    pub fn echo(text: &str) -> Self {
        Self::new("echo").arg(text)
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// An ordered, fail-fast sequence of commands sent as one remote invocation.
///
/// Steps render joined with `&&`, so the first failing step stops the rest
/// on the remote side. A chain may be guarded by a file existence test, in
/// which case it becomes a silent no-op when the file is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandChain {
    steps: Vec<RemoteCommand>,
    guard: Option<String>,
}

impl CommandChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, command: RemoteCommand) -> Self {
        self.steps.push(command);
        self
    }

    pub fn extend(mut self, other: CommandChain) -> Self {
        self.steps.extend(other.steps);
        self
    }

    /// Only run the chain if `path` exists on the remote host.
    pub fn when_exists(mut self, path: impl Into<String>) -> Self {
        self.guard = Some(path.into());
        self
    }

    pub fn steps(&self) -> &[RemoteCommand] {
        &self.steps
    }

    pub fn guard(&self) -> Option<&str> {
        self.guard.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Atomically point `link` at `target`.
    ///
    /// The new link is created under a unique temporary name beside `link`
    /// and renamed over it, so readers see either the old or the new target.
    pub fn atomic_symlink(target: &str, link: &str) -> Self {
        let tmp = format!("{}.tmp-{}", link, uuid::Uuid::new_v4().simple());
        Self::new()
            .then(RemoteCommand::new("ln").arg("-s").arg(target).arg(tmp.as_str()))
            .then(RemoteCommand::new("mv").arg("-Tf").arg(tmp).arg(link))
    }

    pub fn render(&self) -> String {
        let body = self
            .steps
            .iter()
            .map(RemoteCommand::render)
            .collect::<Vec<_>>()
            .join(" && ");

        match &self.guard {
            Some(path) => format!("if [ -e {} ]; then {}; fi", quote_arg(path), body),
            None => body,
        }
    }
}

impl From<RemoteCommand> for CommandChain {
    fn from(command: RemoteCommand) -> Self {
        CommandChain::new().then(command)
    }
}

impl fmt::Display for CommandChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
