//! # Delivery Ledger
//! Durable record of the messages a relay has already delivered.
//!
//! - Loaded wholesale at startup; a missing file is a first run, not an error.
//! - Appends only touch memory; `persist` rewrites the whole file.
//! - Writes go to a temp file in the same directory which is then renamed
//!   over the old ledger, so a crash leaves either the old or the new state.
//! - Never pruned.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::LedgerError;
use crate::message::{Message, MessageRecord};

/// Decides whether a fetched message was already delivered.
pub trait DuplicatePolicy: Send + Sync {
    fn is_duplicate(&self, candidate: &Message, ledger: &[Message]) -> bool;
}

/// Full structural equality against every ledger entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl DuplicatePolicy for ExactMatch {
    fn is_duplicate(&self, candidate: &Message, ledger: &[Message]) -> bool {
        ledger.iter().any(|m| m == candidate)
    }
}

#[derive(Debug)]
pub struct DeliveryLedger {
    path: PathBuf,
    entries: Vec<Message>,
}

impl DeliveryLedger {
    /// Open the ledger at `path`, loading whatever was persisted there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let entries = Self::load(&path)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "ledger loaded");
        Ok(Self { path, entries })
    }

    /// Read the persisted entries. No file yet means no entries.
    pub fn load(path: &Path) -> Result<Vec<Message>, LedgerError> {
        let content = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<MessageRecord> =
            serde_yaml::from_str(&content).map_err(|source| LedgerError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        records
            .into_iter()
            .enumerate()
            .map(|(index, rec)| {
                Message::from_record(rec).map_err(|reason| LedgerError::InvalidRecord { index, reason })
            })
            .collect()
    }

    pub fn contains(&self, message: &Message) -> bool {
        ExactMatch.is_duplicate(message, &self.entries)
    }

    /// Record a message in memory. Call `persist` to make it durable.
    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    /// Atomically replace the on-disk ledger with the in-memory entries.
    pub fn persist(&self) -> Result<(), LedgerError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source: std::io::Error| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        fs::create_dir_all(&dir).map_err(io_err)?;

        let records: Vec<MessageRecord> = self.entries.iter().map(Message::to_record).collect();
        let body = serde_yaml::to_string(&records)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(body.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "ledger persisted");
        Ok(())
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
