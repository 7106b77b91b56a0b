use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use tracing::debug;

use crate::common::{AccountKey, KeySourceError};

/// A key source backed by a plain text file with one key per line.
#[derive(Debug, Clone)]
pub struct FilesystemKeys {
    /// The path to the file containing the keys.
    pub path: PathBuf,
}

impl FilesystemKeys {
    /// Create a new `FilesystemKeys` that reads from the given path.
    ///
    /// The file is not touched until the keys are requested.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the whole file and returns one trimmed key per line, in file order.
    ///
    /// Blank lines are kept as empty keys. A final line terminator does not
    /// produce an extra key.
    pub fn read_all(&self) -> Result<Vec<AccountKey>, KeySourceError> {
        let file = BufReader::new(File::open(&self.path).map_err(|e| self.io_error(e))?);

        let mut keys = Vec::new();
        for line in file.lines() {
            let line = line.map_err(|e| self.io_error(e))?;
            keys.push(AccountKey::from_line(&line));
        }

        debug!(path = ?self.path, count = keys.len(), "Loaded key list");

        Ok(keys)
    }

    fn io_error(&self, source: std::io::Error) -> KeySourceError {
        KeySourceError::Io { path: self.path.clone(), source }
    }
}
