//! Ledger registers, transaction building and reconciliation

pub mod attachment;
pub mod dispatch;
pub mod display;
pub mod engine;
pub mod error;
pub mod message;
pub mod models;
pub mod money;
pub mod reconcile;
pub mod register;
pub mod slip;
pub mod split;
pub mod summary;
pub mod types;

pub use engine::{Engine, EngineError, MemoryEngine};
pub use error::{CoreError, CoreResult, ErrorSeverity};
pub use message::{Message, MessageBus, Subscription};
pub use models::{Account, AccountId, AccountLookup, Transaction, TransactionEntry, TransactionId};
pub use money::{CurrencyNode, MonetaryAmount};
pub use register::{LedgerView, RegisterOptions, RegisterRow, RowKind, SortColumn};
pub use slip::{CommitOutcome, EditMode, EntryOptions, LoadOutcome, ReconcileToggle, SlipForm, ValidationIssue};
pub use split::{SplitEntryForm, SplitEntryList};
pub use types::{AccountGroup, AccountType, ReconciledState, SlipType, TransactionKind};
