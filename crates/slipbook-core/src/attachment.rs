//! Attachment field of the entry form

use std::path::{Path, PathBuf};

use crate::engine::{Engine, EngineError};
use crate::models::Transaction;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Unchanged,
    File(PathBuf),
    Stored { name: String, source: PathBuf },
    Cleared,
}

/// Tracks the attachment a transaction should carry when committed
///
/// A newly chosen file is handed to the engine by [`AttachmentSlot::store`];
/// [`AttachmentSlot::apply`] then writes the resulting name onto the
/// transaction being committed.
#[derive(Debug, Clone)]
pub struct AttachmentSlot {
    loaded: Option<String>,
    pending: Pending,
}

impl Default for AttachmentSlot {
    fn default() -> Self {
        Self {
            loaded: None,
            pending: Pending::Unchanged,
        }
    }
}

impl AttachmentSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the attachment of a transaction being edited
    pub fn load_from(&mut self, tx: &Transaction) {
        self.loaded = tx.attachment.clone();
        self.pending = Pending::Unchanged;
    }

    pub fn set(&mut self, path: impl AsRef<Path>) {
        self.pending = Pending::File(path.as_ref().to_path_buf());
    }

    pub fn clear(&mut self) {
        self.pending = Pending::Cleared;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn has_unstored_file(&self) -> bool {
        matches!(self.pending, Pending::File(_))
    }

    /// What the committed transaction will reference
    pub fn current(&self) -> Option<String> {
        match &self.pending {
            Pending::Unchanged => self.loaded.clone(),
            Pending::File(path) => Some(path.display().to_string()),
            Pending::Stored { name, .. } => Some(name.clone()),
            Pending::Cleared => None,
        }
    }

    /// Hand a newly chosen file to the engine
    pub fn store(&mut self, engine: &mut dyn Engine) -> Result<(), EngineError> {
        if let Pending::File(path) = &self.pending {
            let name = engine.add_attachment(path)?;
            log::debug!("stored attachment {} as {}", path.display(), name);
            self.pending = Pending::Stored {
                name,
                source: path.clone(),
            };
        }
        Ok(())
    }

    /// Take a stored file back out of the engine after a failed commit
    ///
    /// The slot returns to holding the chosen file, so a retry stores it again.
    pub fn unstore(&mut self, engine: &mut dyn Engine) -> Result<(), EngineError> {
        if let Pending::Stored { name, source } = &self.pending {
            engine.remove_attachment(name)?;
            log::debug!("removed attachment {} after a failed commit", name);
            self.pending = Pending::File(source.clone());
        }
        Ok(())
    }

    /// Set or clear the attachment on `tx`
    pub fn apply(&self, mut tx: Transaction) -> Transaction {
        tx.attachment = self.current();
        tx
    }
}
