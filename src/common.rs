use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Number of leading characters of a key that are shown in logs.
const VISIBLE_PREFIX: usize = 4;

/// An account private key, as read from one line of the key list.
///
/// The key is opaque: it is never parsed or validated, only stripped of
/// surrounding whitespace. Its `Debug` and `Display` output is redacted.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct AccountKey(String);

impl AccountKey {
    /// Creates a key from a raw input line, trimming surrounding whitespace.
    pub fn from_line(line: &str) -> Self {
        AccountKey(line.trim().to_owned())
    }

    /// Returns the full key text.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the length of the key in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the line the key was read from was blank.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AccountKey {
    fn from(line: &str) -> Self {
        AccountKey::from_line(line)
    }
}

impl From<String> for AccountKey {
    fn from(line: String) -> Self {
        AccountKey::from_line(&line)
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chars = self.0.chars().count();
        if chars <= 2 * VISIBLE_PREFIX {
            return write!(f, "[REDACTED] (length: {chars})")
        }

        let prefix: String = self.0.chars().take(VISIBLE_PREFIX).collect();
        write!(f, "{prefix}… (length: {chars})")
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountKey({self})")
    }
}

/// One of the two external steps run for every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The approval command, which receives the key as its last argument.
    Approve,
    /// The test command, which reads the key from the secret file.
    Test,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Approve => f.write_str("approve"),
            Step::Test => f.write_str("test"),
        }
    }
}

/// An error that can occur when loading the list of keys.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum KeySourceError {
    #[error("Failed to read key list at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// An error that can occur when accessing the secret slot.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum SecretError {
    #[error("Failed to open secret file {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("Failed to write secret file {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to read secret file {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

/// An external command could not be started.
#[derive(Debug, Error)]
#[error("Failed to launch `{program}`: {source}")]
pub struct LaunchError {
    /// The program that was being launched.
    pub program: String,
    /// The underlying spawn error.
    #[source]
    pub source: io::Error,
}

/// A fatal error that aborts the rotation.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum RotateError {
    #[error("Key list error: {0}")]
    Keys(#[from] KeySourceError),
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),
    #[error("Step `{step}` failed for key #{index} (exit code: {code:?})")]
    StepFailed { step: Step, index: usize, code: Option<i32> },
}
