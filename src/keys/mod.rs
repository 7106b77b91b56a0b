use async_trait::async_trait;

use crate::common::{AccountKey, KeySourceError};

mod filesystem;
pub use filesystem::FilesystemKeys;

/// A source of account keys, consumed once at the start of a rotation.
#[async_trait]
pub trait KeySource {
    /// Loads every key, in order.
    async fn keys(&self) -> Result<Vec<AccountKey>, KeySourceError>;
}

/// A fixed, in-memory list of keys.
#[derive(Debug, Clone, Default)]
pub struct KeyList {
    keys: Vec<AccountKey>,
}

impl KeyList {
    /// Builds the list from raw lines. Each line is trimmed, nothing else.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { keys: lines.into_iter().map(|line| AccountKey::from_line(line.as_ref())).collect() }
    }

    /// Returns the number of keys in the list.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the list holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeySource for KeyList {
    async fn keys(&self) -> Result<Vec<AccountKey>, KeySourceError> {
        Ok(self.keys.clone())
    }
}

#[async_trait]
impl KeySource for FilesystemKeys {
    async fn keys(&self) -> Result<Vec<AccountKey>, KeySourceError> {
        self.read_all()
    }
}
