//! Storage engine seam and the in-memory engine

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::message::{Message, MessageBus};
use crate::models::{Account, AccountId, AccountLookup, Transaction, TransactionId};
use crate::types::{ReconciledState, TransactionKind};

/// Failures reported by an engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Transaction {id} is invalid: {reason}")]
    InvalidTransaction { id: TransactionId, reason: String },

    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: TransactionId },

    #[error("Account not found: {id}")]
    AccountNotFound { id: AccountId },

    #[error("Account is locked: {name}")]
    AccountLocked { name: String },

    #[error("Attachment error: {reason}")]
    Attachment { reason: String },

    #[error("Operation rejected: {reason}")]
    Rejected { reason: String },
}

/// Authoritative owner of accounts and transactions
pub trait Engine: AccountLookup {
    fn as_lookup(&self) -> &dyn AccountLookup;

    fn accounts(&self) -> Vec<&Account>;

    fn transaction(&self, id: &TransactionId) -> Option<&Transaction>;

    /// Transactions touching `account` in canonical order
    fn sorted_transactions(&self, account: &AccountId) -> Vec<Transaction>;

    fn is_transaction_valid(&self, tx: &Transaction) -> bool;

    fn add_transaction(&mut self, tx: Transaction) -> Result<(), EngineError>;

    fn remove_transaction(&mut self, id: &TransactionId) -> Result<Transaction, EngineError>;

    /// Change the reconciliation of one account; allowed on locked accounts
    fn set_transaction_reconciled(
        &mut self,
        id: &TransactionId,
        account: &AccountId,
        state: ReconciledState,
    ) -> Result<(), EngineError>;

    /// Store a file and return the name transactions refer to it by
    fn add_attachment(&mut self, path: &Path) -> Result<String, EngineError>;

    fn remove_attachment(&mut self, name: &str) -> Result<(), EngineError>;
}

/// Engine that keeps everything in memory and announces changes on a bus
#[derive(Default)]
pub struct MemoryEngine {
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    attachments: BTreeMap<String, PathBuf>,
    bus: MessageBus,
}

impl MemoryEngine {
    pub fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            ..Default::default()
        }
    }

    /// Rebuild an engine from stored state without validation or messages
    pub fn restore(
        bus: MessageBus,
        accounts: impl IntoIterator<Item = Account>,
        transactions: impl IntoIterator<Item = Transaction>,
    ) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.id, a)).collect(),
            transactions: transactions.into_iter().map(|t| (t.id, t)).collect(),
            attachments: BTreeMap::new(),
            bus,
        }
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn add_account(&mut self, account: Account) -> AccountId {
        let id = account.id;
        self.accounts.insert(id, account);
        id
    }

    pub fn account_mut(&mut self, id: &AccountId) -> Option<&mut Account> {
        self.accounts.get_mut(id)
    }

    /// Every transaction in canonical order
    pub fn transactions(&self) -> Vec<&Transaction> {
        let mut list: Vec<&Transaction> = self.transactions.values().collect();
        list.sort_by(|a, b| a.cmp_canonical(b));
        list
    }

    pub fn find_account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    fn validate(&self, tx: &Transaction) -> Result<(), String> {
        if self.transactions.contains_key(&tx.id) {
            return Err("transaction id is not unique".to_string());
        }
        if tx.kind() == TransactionKind::Invalid {
            return Err("transaction has no usable entries".to_string());
        }
        for id in tx.accounts() {
            match self.accounts.get(&id) {
                None => return Err(format!("unknown account {}", id)),
                Some(account) if account.locked => {
                    return Err(format!("account {} is locked", account.name));
                }
                Some(_) => {}
            }
        }
        if !tx.is_balanced(&self.accounts) {
            return Err("entries do not balance".to_string());
        }
        Ok(())
    }

    fn announce(&self, tx: &Transaction, added: bool) {
        let shared = Arc::new(tx.clone());
        for account in tx.accounts() {
            let message = if added {
                Message::TransactionAdded { account, transaction: Arc::clone(&shared) }
            } else {
                Message::TransactionRemoved { account, transaction: Arc::clone(&shared) }
            };
            self.bus.post(message);
        }
    }
}

impl AccountLookup for MemoryEngine {
    fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }
}

impl Engine for MemoryEngine {
    fn as_lookup(&self) -> &dyn AccountLookup {
        self
    }

    fn accounts(&self) -> Vec<&Account> {
        let mut list: Vec<&Account> = self.accounts.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    fn transaction(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    fn sorted_transactions(&self, account: &AccountId) -> Vec<Transaction> {
        let mut list: Vec<Transaction> = self
            .transactions
            .values()
            .filter(|t| t.involves(account))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.cmp_canonical(b));
        list
    }

    fn is_transaction_valid(&self, tx: &Transaction) -> bool {
        match self.validate(tx) {
            Ok(()) => true,
            Err(reason) => {
                log::warn!("transaction {} is not valid: {}", tx.id, reason);
                false
            }
        }
    }

    fn add_transaction(&mut self, tx: Transaction) -> Result<(), EngineError> {
        self.validate(&tx)
            .map_err(|reason| EngineError::InvalidTransaction { id: tx.id, reason })?;

        log::debug!("adding transaction {} dated {}", tx.id, tx.date);
        self.announce(&tx, true);
        self.transactions.insert(tx.id, tx);
        Ok(())
    }

    fn remove_transaction(&mut self, id: &TransactionId) -> Result<Transaction, EngineError> {
        let tx = self
            .transactions
            .get(id)
            .ok_or(EngineError::TransactionNotFound { id: *id })?;

        if let Some(locked) = tx
            .accounts()
            .iter()
            .filter_map(|a| self.accounts.get(a))
            .find(|a| a.locked)
        {
            return Err(EngineError::AccountLocked { name: locked.name.clone() });
        }

        let removed = self
            .transactions
            .remove(id)
            .ok_or(EngineError::TransactionNotFound { id: *id })?;
        log::debug!("removed transaction {}", removed.id);
        self.announce(&removed, false);
        Ok(removed)
    }

    fn set_transaction_reconciled(
        &mut self,
        id: &TransactionId,
        account: &AccountId,
        state: ReconciledState,
    ) -> Result<(), EngineError> {
        let tx = self
            .transactions
            .get_mut(id)
            .ok_or(EngineError::TransactionNotFound { id: *id })?;
        if !tx.involves(account) {
            return Err(EngineError::Rejected {
                reason: format!("account {} is not part of transaction {}", account, id),
            });
        }
        tx.set_reconciled(account, state);
        let updated = tx.clone();

        // views refresh by replacing the row
        self.announce(&updated, false);
        self.announce(&updated, true);
        Ok(())
    }

    fn add_attachment(&mut self, path: &Path) -> Result<String, EngineError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EngineError::Attachment {
                reason: format!("{} has no file name", path.display()),
            })?
            .to_string();
        if self.attachments.contains_key(&name) {
            return Err(EngineError::Attachment {
                reason: format!("an attachment named {} already exists", name),
            });
        }
        self.attachments.insert(name.clone(), path.to_path_buf());
        Ok(name)
    }

    fn remove_attachment(&mut self, name: &str) -> Result<(), EngineError> {
        if self.transactions.values().any(|t| t.attachment.as_deref() == Some(name)) {
            return Err(EngineError::Attachment {
                reason: format!("{} is still referenced", name),
            });
        }
        self.attachments
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::Attachment {
                reason: format!("no attachment named {}", name),
            })
    }
}
