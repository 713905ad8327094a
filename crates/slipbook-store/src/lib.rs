//! Journal snapshot persistence

pub mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use slipbook_core::{Account, Engine, MemoryEngine, MessageBus, Transaction};

pub use error::{StoreError, StoreResult};

const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Everything a journal file holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Default for JournalSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            accounts: Vec::new(),
            transactions: Vec::new(),
        }
    }
}

impl JournalSnapshot {
    pub fn from_engine(engine: &MemoryEngine) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            accounts: engine.accounts().into_iter().cloned().collect(),
            transactions: engine.transactions().into_iter().cloned().collect(),
        }
    }

    /// Parse and check a JSON journal
    pub fn parse(content: &str) -> StoreResult<Self> {
        let snapshot: JournalSnapshot = serde_json::from_str(content)?;
        snapshot.check()?;
        Ok(snapshot)
    }

    /// Every id is unique and every entry names a known account
    pub fn check(&self) -> StoreResult<()> {
        let mut accounts = HashSet::new();
        for account in &self.accounts {
            if !accounts.insert(account.id) {
                return Err(StoreError::Inconsistent {
                    message: format!("account {} appears twice", account.name),
                });
            }
        }

        let mut transactions = HashSet::new();
        for tx in &self.transactions {
            if !transactions.insert(tx.id) {
                return Err(StoreError::Inconsistent {
                    message: format!("transaction {} appears twice", tx.id),
                });
            }
            if let Some(missing) = tx.accounts().into_iter().find(|a| !accounts.contains(a)) {
                return Err(StoreError::Inconsistent {
                    message: format!("transaction {} refers to unknown account {}", tx.id, missing),
                });
            }
        }
        Ok(())
    }

    pub fn into_engine(self, bus: MessageBus) -> MemoryEngine {
        MemoryEngine::restore(bus, self.accounts, self.transactions)
    }
}

// ==================== Store Trait ====================

/// Where journals are read from and written to
#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn load(&self) -> StoreResult<JournalSnapshot>;

    async fn save(&self, snapshot: &JournalSnapshot) -> StoreResult<()>;
}

/// Journal kept as one pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonJournalStore {
    path: PathBuf,
}

impl JsonJournalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the journal, or an empty one when the file does not exist yet
    pub async fn load_or_default(&self) -> StoreResult<JournalSnapshot> {
        match self.load().await {
            Err(StoreError::NotFound { path }) => {
                log::info!("no journal at {}, starting empty", path.display());
                Ok(JournalSnapshot::default())
            }
            other => other,
        }
    }
}

#[async_trait]
impl JournalStore for JsonJournalStore {
    async fn load(&self) -> StoreResult<JournalSnapshot> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path: self.path.clone() });
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let snapshot = JournalSnapshot::parse(&content)?;
        log::debug!(
            "loaded {} accounts and {} transactions from {}",
            snapshot.accounts.len(),
            snapshot.transactions.len(),
            self.path.display()
        );
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &JournalSnapshot) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, content)
            .await
            .map_err(|e| StoreError::io(&staging, e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        log::debug!("saved journal to {}", self.path.display());
        Ok(())
    }
}
