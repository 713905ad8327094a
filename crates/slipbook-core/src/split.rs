//! Pending split entries and the sub-form that builds them

use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::models::{Account, AccountId, AccountLookup, TransactionEntry};
use crate::slip::{polarized_entry, ValidationIssue};
use crate::types::{ReconciledState, SlipType};

/// Entries collected for a split transaction, viewed from one account
#[derive(Debug, Clone)]
pub struct SplitEntryList {
    account: AccountId,
    entries: Vec<TransactionEntry>,
}

impl SplitEntryList {
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            entries: Vec::new(),
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn entries(&self) -> &[TransactionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TransactionEntry> {
        self.entries.get(index)
    }

    pub fn add(&mut self, entry: TransactionEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Swap in an edited entry; returns the one it replaced
    pub fn replace(&mut self, index: usize, entry: TransactionEntry) -> Option<TransactionEntry> {
        let slot = self.entries.get_mut(index)?;
        Some(std::mem::replace(slot, entry))
    }

    pub fn remove(&mut self, index: usize) -> Option<TransactionEntry> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn set_entries(&mut self, entries: Vec<TransactionEntry>) {
        self.entries = entries;
    }

    /// Sum of the first `index + 1` entries against the account
    pub fn balance_at(&self, index: usize) -> Decimal {
        self.entries
            .iter()
            .take(index + 1)
            .map(|e| e.amount(&self.account))
            .sum()
    }

    pub fn balance(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount(&self.account)).sum()
    }
}

/// Sub-form for one split entry
#[derive(Debug, Clone)]
pub struct SplitEntryForm {
    account: Account,
    slip_type: SlipType,
    pub amount_text: String,
    pub exchanged_amount: Option<Decimal>,
    pub opposite: Option<Account>,
    pub memo: String,
    pub tags: BTreeSet<String>,
    pub cleared: bool,
    editing: Option<usize>,
}

impl SplitEntryForm {
    pub fn new(account: Account, slip_type: SlipType) -> Self {
        Self {
            account,
            slip_type,
            amount_text: String::new(),
            exchanged_amount: None,
            opposite: None,
            memo: String::new(),
            tags: BTreeSet::new(),
            cleared: false,
            editing: None,
        }
    }

    pub fn slip_type(&self) -> SlipType {
        self.slip_type
    }

    pub fn editing(&self) -> Option<usize> {
        self.editing
    }

    /// Switch between the increase and decrease sides of the form
    pub fn set_slip_type(&mut self, slip_type: SlipType) {
        self.slip_type = slip_type;
    }

    /// Load an entry of `list` into the form for editing
    ///
    /// The form takes the polarity of the entry: an entry crediting the
    /// list's account opens as an increase, anything else as a decrease.
    pub fn modify_entry(&mut self, list: &SplitEntryList, index: usize, lookup: &dyn AccountLookup) -> bool {
        let Some(entry) = list.get(index) else {
            return false;
        };
        self.clear();
        self.editing = Some(index);
        self.memo = entry.memo.clone();
        self.tags = entry.tags.clone();
        self.slip_type = if entry.credit_account == self.account.id {
            SlipType::Increase
        } else {
            SlipType::Decrease
        };

        let (opposite, amount, exchanged) = match self.slip_type {
            SlipType::Decrease => (entry.credit_account, entry.debit_amount.abs(), entry.credit_amount),
            SlipType::Increase => (entry.debit_account, entry.credit_amount, entry.debit_amount.abs()),
        };
        self.opposite = lookup.account(&opposite).cloned();
        self.amount_text = amount.to_string();
        self.exchanged_amount = Some(exchanged);
        self.cleared = entry
            .reconciled(&self.account.id)
            .map(|s| s != ReconciledState::NotReconciled)
            .unwrap_or(false);
        true
    }

    pub fn validate(&self) -> Result<(), ValidationIssue> {
        if self.amount_text.trim().is_empty() {
            return Err(ValidationIssue::EmptyAmount);
        }
        Ok(())
    }

    pub fn build_entry(&self) -> Result<TransactionEntry, ValidationIssue> {
        let amount = slipbook_utils::parse_amount_text(&self.amount_text)?;
        let opposite = self.opposite.as_ref().ok_or(ValidationIssue::MissingAccount)?;
        if opposite.id == self.account.id {
            return Err(ValidationIssue::SameAccount);
        }

        let mut entry = polarized_entry(self.slip_type, &self.account, opposite, amount, self.exchanged_amount)?;
        entry.memo = self.memo.clone();
        entry.tags = self.tags.clone();
        let state = if self.cleared {
            ReconciledState::Cleared
        } else {
            ReconciledState::NotReconciled
        };
        entry.set_reconciled(&self.account.id, state);
        Ok(entry)
    }

    /// Add or replace the entry in `list`; returns its index
    pub fn enter(&mut self, list: &mut SplitEntryList) -> Result<usize, ValidationIssue> {
        self.validate()?;
        let entry = self.build_entry()?;

        let index = match self.editing {
            Some(index) if list.replace(index, entry.clone()).is_some() => index,
            _ => list.add(entry),
        };
        self.clear();
        Ok(index)
    }

    pub fn clear(&mut self) {
        self.amount_text.clear();
        self.exchanged_amount = None;
        self.opposite = None;
        self.memo.clear();
        self.tags.clear();
        self.cleared = false;
        self.editing = None;
    }
}
