use std::{ffi::OsStr, path::PathBuf, process::Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::{Approver, Outcome, TestRunner};
use crate::common::{AccountKey, LaunchError};

/// Default interpreter for the approval script.
pub const DEFAULT_APPROVE_PROGRAM: &str = "python3";

/// Default path of the approval script.
pub const DEFAULT_APPROVE_SCRIPT: &str = "./scripts/approve.py";

/// Default test command.
pub const DEFAULT_TEST_PROGRAM: &str = "truffle";

/// Default arguments of the test command.
pub const DEFAULT_TEST_ARGS: [&str; 2] = ["exec", "./test/staking-test.js"];

/// A program together with its fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    /// The executable, resolved through `PATH` if not a path.
    pub program: String,
    /// Arguments always passed first.
    pub args: Vec<String>,
}

impl ExternalCommand {
    /// Creates a new command from a program and its fixed arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { program: program.into(), args: args.into_iter().map(Into::into).collect() }
    }

    /// Spawns the command with `extra` appended to the fixed arguments and waits
    /// for it to exit. Standard streams are inherited, nothing is captured.
    pub async fn status<I, S>(&self, extra: I) -> Result<Outcome, LaunchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let status = Command::new(&self.program)
            .args(&self.args)
            .args(extra)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| LaunchError { program: self.program.clone(), source })?;

        debug!(program = %self.program, ?status, "External command exited");

        Ok(status.into())
    }
}

/// Runs `<program> <args...> <key>` for every key.
#[derive(Debug, Clone)]
pub struct CommandApprover {
    command: ExternalCommand,
}

impl CommandApprover {
    /// Creates an approver from an arbitrary command. The key is appended as
    /// the last argument.
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }

    /// Creates an approver that runs `script` with the given interpreter.
    pub fn script(program: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        let script = script.into().to_string_lossy().into_owned();
        Self::new(ExternalCommand::new(program, [script]))
    }
}

impl Default for CommandApprover {
    fn default() -> Self {
        Self::script(DEFAULT_APPROVE_PROGRAM, DEFAULT_APPROVE_SCRIPT)
    }
}

#[async_trait]
impl Approver for CommandApprover {
    #[instrument(skip(self), fields(program = %self.command.program))]
    async fn approve(&self, key: &AccountKey) -> Result<Outcome, LaunchError> {
        self.command.status([key.expose()]).await
    }
}

/// Runs a fixed test command, with no per-key arguments.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    command: ExternalCommand,
}

impl CommandTestRunner {
    /// Creates a test runner from an arbitrary command.
    pub fn new(command: ExternalCommand) -> Self {
        Self { command }
    }
}

impl Default for CommandTestRunner {
    fn default() -> Self {
        Self::new(ExternalCommand::new(DEFAULT_TEST_PROGRAM, DEFAULT_TEST_ARGS))
    }
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    #[instrument(skip(self), fields(program = %self.command.program))]
    async fn run(&self) -> Result<Outcome, LaunchError> {
        self.command.status(std::iter::empty::<&str>()).await
    }
}
