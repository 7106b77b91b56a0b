use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

/// Pause inserted after every key when nothing else is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// What to do when an external step exits unsuccessfully.
///
/// Steps that cannot be started at all always abort the run, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and keep going. The test step still runs when the
    /// approval step failed.
    #[default]
    Continue,
    /// Abort the run on the first failure.
    Stop,
    /// Re-run the failed step up to this many extra times, then abort.
    Retry(u32),
}

/// The decision taken for a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Proceed,
    Retry,
    Abort,
}

impl FailurePolicy {
    /// Judges a failed step that has already been retried `retries` times.
    pub(crate) fn on_failure(&self, retries: u32) -> Verdict {
        match *self {
            FailurePolicy::Continue => Verdict::Proceed,
            FailurePolicy::Stop => Verdict::Abort,
            FailurePolicy::Retry(max) if retries < max => Verdict::Retry,
            FailurePolicy::Retry(_) => Verdict::Abort,
        }
    }
}

/// An error returned when parsing a [`FailurePolicy`] from text.
#[derive(Debug, Error)]
#[error("Invalid failure policy {0:?}, expected `continue`, `stop` or `retry:<n>`")]
pub struct ParsePolicyError(String);

impl FromStr for FailurePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "stop" => Ok(FailurePolicy::Stop),
            other => other
                .strip_prefix("retry:")
                .and_then(|n| n.parse().ok())
                .map(FailurePolicy::Retry)
                .ok_or_else(|| ParsePolicyError(s.to_owned())),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Continue => f.write_str("continue"),
            FailurePolicy::Stop => f.write_str("stop"),
            FailurePolicy::Retry(n) => write!(f, "retry:{n}"),
        }
    }
}

/// The pause taken after each key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Move on to the next key immediately.
    None,
    /// Sleep for a fixed interval after every key, including the last one.
    Fixed(Duration),
}

impl Pacing {
    /// Builds the pacing from a number of milliseconds, where zero disables it.
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Pacing::None
        } else {
            Pacing::Fixed(Duration::from_millis(millis))
        }
    }

    /// Waits for the configured interval.
    pub async fn pause(&self) {
        if let Pacing::Fixed(interval) = self {
            tokio::time::sleep(*interval).await;
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::Fixed(DEFAULT_INTERVAL)
    }
}
