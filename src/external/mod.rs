use std::process::ExitStatus;

use async_trait::async_trait;

use crate::common::{AccountKey, LaunchError};

mod command;
pub use command::{CommandApprover, CommandTestRunner, ExternalCommand};

/// The result of one external operation that was started successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The operation exited with status zero.
    Success,
    /// The operation exited with a non-zero status, or was killed by a signal
    /// (in which case there is no exit code).
    Failed {
        /// The exit code, if any.
        code: Option<i32>,
    },
}

impl Outcome {
    /// Returns true if the operation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl From<ExitStatus> for Outcome {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Outcome::Success
        } else {
            Outcome::Failed { code: status.code() }
        }
    }
}

/// Operation A: approves the contract for the given account.
#[async_trait]
pub trait Approver {
    /// Runs the approval for `key` and waits for it to finish.
    async fn approve(&self, key: &AccountKey) -> Result<Outcome, LaunchError>;
}

/// Operation B: runs the test suite against whatever key is in the secret slot.
#[async_trait]
pub trait TestRunner {
    /// Runs the tests and waits for them to finish.
    async fn run(&self) -> Result<Outcome, LaunchError>;
}
