use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::trace;

use super::SecretSlot;
use crate::common::{AccountKey, SecretError};

/// A secret slot backed by a file on disk, rewritten in place for every key.
#[derive(Debug)]
pub struct FileSecret {
    /// The path to the secret file.
    path: PathBuf,
    /// Handle kept open for the whole rotation.
    file: File,
}

impl FileSecret {
    /// Opens the secret file for reading and writing, creating it if missing.
    ///
    /// Existing content is left untouched until the first [`SecretSlot::write`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SecretError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| SecretError::Open { path: path.clone(), source })?;

        Ok(Self { path, file })
    }

    /// The path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> SecretError {
        SecretError::Write { path: self.path.clone(), source }
    }
}

impl SecretSlot for FileSecret {
    fn write(&mut self, key: &AccountKey) -> Result<(), SecretError> {
        let bytes = key.expose().as_bytes();

        self.file.seek(SeekFrom::Start(0)).map_err(|e| self.write_error(e))?;
        self.file.write_all(bytes).map_err(|e| self.write_error(e))?;
        self.file.set_len(bytes.len() as u64).map_err(|e| self.write_error(e))?;
        self.file.flush().map_err(|e| self.write_error(e))?;
        // the next external process reads the file by path
        self.file.sync_data().map_err(|e| self.write_error(e))?;

        trace!(path = ?self.path, len = bytes.len(), "Rewrote secret file");
        Ok(())
    }

    fn read(&self) -> Result<String, SecretError> {
        let read_error = |source| SecretError::Read { path: self.path.clone(), source };

        let mut content = String::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_string(&mut content))
            .map_err(read_error)?;

        Ok(content)
    }
}
