use crate::common::{AccountKey, SecretError};

mod file;
pub use file::FileSecret;

/// The "current credential" slot shared with the external tooling.
pub trait SecretSlot {
    /// Replaces the whole content of the slot with the given key.
    fn write(&mut self, key: &AccountKey) -> Result<(), SecretError>;

    /// Reads back the current content of the slot.
    fn read(&self) -> Result<String, SecretError>;
}

impl<S: SecretSlot + ?Sized> SecretSlot for &mut S {
    fn write(&mut self, key: &AccountKey) -> Result<(), SecretError> {
        (**self).write(key)
    }

    fn read(&self) -> Result<String, SecretError> {
        (**self).read()
    }
}

/// An in-memory secret slot that keeps every value it was given.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecret {
    current: String,
    /// Every value written to the slot, oldest first.
    history: Vec<String>,
}

impl InMemorySecret {
    /// Creates a slot that already holds the given content.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self { current: content.into(), history: Vec::new() }
    }

    /// Returns the current content of the slot.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Returns every value written to the slot, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl SecretSlot for InMemorySecret {
    fn write(&mut self, key: &AccountKey) -> Result<(), SecretError> {
        self.current.clear();
        self.current.push_str(key.expose());
        self.history.push(self.current.clone());
        Ok(())
    }

    fn read(&self) -> Result<String, SecretError> {
        Ok(self.current.clone())
    }
}
