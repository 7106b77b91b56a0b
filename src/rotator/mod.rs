use std::future::Future;

use tracing::{debug, info, instrument, warn};

use crate::{
    common::{LaunchError, RotateError, SecretError, Step},
    external::{Approver, Outcome, TestRunner},
    keys::KeySource,
    policy::{FailurePolicy, Pacing, Verdict},
    secret::SecretSlot,
};

/// Counters reported at the end of a rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of keys written to the secret slot.
    pub keys: usize,
    /// Number of times the approval step was started, retries included.
    pub approvals: usize,
    /// Number of times the test step was started, retries included.
    pub test_runs: usize,
    /// Number of approval runs that exited unsuccessfully.
    pub approval_failures: usize,
    /// Number of test runs that exited unsuccessfully.
    pub test_failures: usize,
}

/// Walks a list of account keys, one at a time: writes the key to the secret
/// slot, runs the approval step with it, runs the test step, then pauses.
///
/// Everything happens strictly in sequence. Nothing is started before the
/// previous step has finished.
#[derive(Debug)]
pub struct Rotator<K, A, T> {
    /// Where the keys come from
    keys: K,
    /// Operation run with each key as argument
    approver: A,
    /// Operation run after each approval, reading the key from the secret slot
    runner: T,
    /// How unsuccessful steps are handled
    policy: FailurePolicy,
    /// Pause after each key
    pacing: Pacing,
}

impl<K, A, T> Rotator<K, A, T>
where
    K: KeySource,
    A: Approver,
    T: TestRunner,
{
    /// Creates a rotator that ignores failed steps and pauses one second
    /// after every key.
    pub fn new(keys: K, approver: A, runner: T) -> Self {
        Self {
            keys,
            approver,
            runner,
            policy: FailurePolicy::default(),
            pacing: Pacing::default(),
        }
    }

    /// Sets the failure policy.
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the pause taken after every key.
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Runs the rotation to completion.
    ///
    /// The keys are loaded first: if that fails, `open_secret` is never called
    /// and no external step is started. The secret slot is opened once and
    /// keeps the last key written when the rotation ends.
    #[instrument(skip_all, fields(policy = %self.policy))]
    pub async fn run<S, F>(&self, open_secret: F) -> Result<RunSummary, RotateError>
    where
        S: SecretSlot,
        F: FnOnce() -> Result<S, SecretError>,
    {
        let keys = self.keys.keys().await?;
        let mut secret = open_secret()?;

        info!(count = keys.len(), "Starting key rotation");

        let mut summary = RunSummary::default();
        for (index, key) in keys.iter().enumerate() {
            info!(index, %key, "Rotating to key");

            secret.write(key)?;
            summary.keys += 1;

            let approver = &self.approver;
            let (started, failed) =
                self.attempt(Step::Approve, index, move || approver.approve(key)).await?;
            summary.approvals += started;
            summary.approval_failures += failed;

            let runner = &self.runner;
            let (started, failed) = self.attempt(Step::Test, index, move || runner.run()).await?;
            summary.test_runs += started;
            summary.test_failures += failed;

            self.pacing.pause().await;
        }

        info!(?summary, "Key rotation completed");

        Ok(summary)
    }

    /// Runs one step, retrying or aborting on failure as the policy says.
    /// Returns how many times the step was started and how many of those failed.
    async fn attempt<F, Fut>(
        &self,
        step: Step,
        index: usize,
        mut start: F,
    ) -> Result<(usize, usize), RotateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Outcome, LaunchError>>,
    {
        let mut retries = 0;
        let mut failed = 0;

        loop {
            let code = match start().await? {
                Outcome::Success => {
                    debug!(%step, index, "Step succeeded");
                    return Ok((failed + 1, failed))
                }
                Outcome::Failed { code } => code,
            };
            failed += 1;

            match self.policy.on_failure(retries) {
                Verdict::Proceed => {
                    warn!(%step, index, ?code, "Step failed, continuing");
                    return Ok((failed, failed))
                }
                Verdict::Retry => {
                    retries += 1;
                    warn!(%step, index, ?code, retries, "Step failed, retrying");
                }
                Verdict::Abort => return Err(RotateError::StepFailed { step, index, code }),
            }
        }
    }
}
