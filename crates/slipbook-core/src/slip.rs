//! Transaction entry form ("slip") for one account
//!
//! A [`SlipForm`] holds the values a user types for a transaction seen from
//! one account and turns them into a balanced [`Transaction`], or takes an
//! existing transaction apart again for editing. Forms come in two
//! polarities: an [`SlipType::Increase`] form posts a positive amount to the
//! credit side of its account and a [`SlipType::Decrease`] form to the debit
//! side. A negative amount swaps the sides.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use slipbook_config::{Config, ReconcilePolicy};
use slipbook_utils::{concatenate_memos, AmountParseError};

use crate::attachment::AttachmentSlot;
use crate::engine::{Engine, EngineError};
use crate::error::{CoreError, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::models::{Account, AccountLookup, Transaction, TransactionEntry, TransactionId};
use crate::money::{implied_rate, MonetaryAmount};
use crate::reconcile::{propagate_reconciliation, reconcile_transaction};
use crate::split::{SplitEntryForm, SplitEntryList};
use crate::types::{ReconciledState, SlipType, TransactionKind};

// ==================== Validation ====================

/// Why a form could not produce a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("An amount is required")]
    EmptyAmount,

    #[error("Invalid amount: {text}")]
    InvalidAmount { text: String },

    #[error("The amount must not be zero")]
    ZeroAmount,

    #[error("An account must be selected")]
    MissingAccount,

    #[error("The selected account is the register account")]
    SameAccount,

    #[error("An exchanged amount is required between different currencies")]
    MissingExchangeAmount,
}

impl From<AmountParseError> for ValidationIssue {
    fn from(err: AmountParseError) -> Self {
        match err {
            AmountParseError::Empty => ValidationIssue::EmptyAmount,
            AmountParseError::Invalid { text } => ValidationIssue::InvalidAmount { text },
        }
    }
}

/// Check run before a form is committed
pub trait SlipValidator: Send + Sync {
    fn validate(&self, form: &SlipForm) -> Result<(), ValidationIssue>;
}

impl<F> SlipValidator for F
where
    F: Fn(&SlipForm) -> Result<(), ValidationIssue> + Send + Sync,
{
    fn validate(&self, form: &SlipForm) -> Result<(), ValidationIssue> {
        self(form)
    }
}

/// Non-zero amount, plus a selected account unless the form holds splits
pub struct DefaultValidator;

impl SlipValidator for DefaultValidator {
    fn validate(&self, form: &SlipForm) -> Result<(), ValidationIssue> {
        if form.amount()?.is_zero() {
            return Err(ValidationIssue::ZeroAmount);
        }
        if form.splits().is_empty() && form.opposite().is_none() {
            return Err(ValidationIssue::MissingAccount);
        }
        if form.payee().trim().is_empty() {
            log::debug!("entering a transaction without a payee");
        }
        Ok(())
    }
}

// ==================== Form state ====================

/// Tri-state reconcile checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileToggle {
    #[default]
    Unchecked,
    Checked,
    Indeterminate,
}

impl ReconcileToggle {
    pub fn from_state(state: ReconciledState) -> Self {
        match state {
            ReconciledState::NotReconciled => ReconcileToggle::Unchecked,
            ReconciledState::Reconciled => ReconcileToggle::Checked,
            ReconciledState::Cleared => ReconcileToggle::Indeterminate,
        }
    }

    pub fn state(self) -> ReconciledState {
        match self {
            ReconcileToggle::Unchecked => ReconciledState::NotReconciled,
            ReconcileToggle::Checked => ReconciledState::Reconciled,
            ReconcileToggle::Indeterminate => ReconciledState::Cleared,
        }
    }
}

/// Entry behaviour taken from the configuration when a form is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryOptions {
    pub concatenate_memos: bool,
    pub remember_last_date: bool,
    pub accounting_terms: bool,
    pub auto_complete: bool,
    pub reconcile_policy: ReconcilePolicy,
}

impl From<&Config> for EntryOptions {
    fn from(config: &Config) -> Self {
        Self {
            concatenate_memos: config.entry.concatenate_memos,
            remember_last_date: config.entry.remember_last_date,
            accounting_terms: config.entry.accounting_terms,
            auto_complete: config.entry.auto_complete,
            reconcile_policy: config.reconcile.policy,
        }
    }
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// What a commit will do with the form's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    New,
    /// Replace the loaded transaction as a whole
    Transaction,
    /// Rewrite only one entry of the loaded split
    SingleEntry { entry_index: usize },
}

/// Which inputs the user may change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldState {
    pub date: bool,
    pub number: bool,
    pub payee: bool,
    pub account: bool,
    pub amount: bool,
    pub splits: bool,
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            date: true,
            number: true,
            payee: true,
            account: true,
            amount: true,
            splits: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(EditMode),
    /// An account of the transaction is locked; the form was cleared
    Locked,
    /// This form cannot edit the transaction; the form was left alone
    NotModifiable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Added(TransactionId),
    Replaced { old: TransactionId, new: TransactionId },
    /// Validation failed and the form was cleared
    Invalid(ValidationIssue),
    /// The engine refused; the form keeps its contents
    EngineRejected(EngineError),
}

// ==================== Entry polarity ====================

/// Build the entry a form of `slip_type` describes
///
/// Equal currencies move `|amount|` between the accounts. Across currencies
/// the current side carries `|amount|` and the opposite side `|exchanged|`.
pub(crate) fn polarized_entry(
    slip_type: SlipType,
    current: &Account,
    opposite: &Account,
    amount: Decimal,
    exchanged: Option<Decimal>,
) -> Result<TransactionEntry, ValidationIssue> {
    let swap = match slip_type {
        SlipType::Decrease => amount >= Decimal::ZERO,
        SlipType::Increase => amount < Decimal::ZERO,
    };
    let magnitude = current.currency.round(amount.abs());

    if current.currency.code == opposite.currency.code {
        return Ok(if swap {
            TransactionEntry::double(opposite.id, current.id, magnitude)
        } else {
            TransactionEntry::double(current.id, opposite.id, magnitude)
        });
    }

    let other = exchanged
        .map(|v| opposite.currency.round(v.abs()))
        .filter(|v| !v.is_zero())
        .ok_or(ValidationIssue::MissingExchangeAmount)?;

    Ok(if swap {
        TransactionEntry::exchanged(opposite.id, current.id, other, -magnitude)
    } else {
        TransactionEntry::exchanged(current.id, opposite.id, magnitude, -other)
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ==================== Slip form ====================

pub struct SlipForm {
    account: Account,
    slip_type: SlipType,
    options: EntryOptions,
    validator: Box<dyn SlipValidator>,

    amount_text: String,
    exchanged_amount: Option<Decimal>,
    opposite: Option<Account>,
    payee: String,
    number: String,
    memo: String,
    date: NaiveDate,
    reconcile: ReconcileToggle,
    tags: BTreeSet<String>,
    splits: SplitEntryList,
    attachment: AttachmentSlot,

    mode: EditMode,
    original: Option<Transaction>,
    fields: FieldState,
}

impl SlipForm {
    pub fn new(account: Account, slip_type: SlipType, options: EntryOptions) -> Self {
        let splits = SplitEntryList::new(account.id);
        Self {
            account,
            slip_type,
            options,
            validator: Box::new(DefaultValidator),
            amount_text: String::new(),
            exchanged_amount: None,
            opposite: None,
            payee: String::new(),
            number: String::new(),
            memo: String::new(),
            date: today(),
            reconcile: ReconcileToggle::default(),
            tags: BTreeSet::new(),
            splits,
            attachment: AttachmentSlot::new(),
            mode: EditMode::New,
            original: None,
            fields: FieldState::default(),
        }
    }

    pub fn with_validator(mut self, validator: impl SlipValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn slip_type(&self) -> SlipType {
        self.slip_type
    }

    pub fn options(&self) -> EntryOptions {
        self.options
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn fields(&self) -> FieldState {
        self.fields
    }

    pub fn original(&self) -> Option<&Transaction> {
        self.original.as_ref()
    }

    // ---------- fields ----------

    pub fn amount_text(&self) -> &str {
        &self.amount_text
    }

    pub fn set_amount_text(&mut self, text: impl Into<String>) {
        self.amount_text = text.into();
    }

    pub fn set_amount(&mut self, value: Decimal) {
        self.amount_text = value.to_string();
    }

    /// Amount typed into the form, or the size of the split total
    pub fn amount(&self) -> Result<Decimal, ValidationIssue> {
        if !self.splits.is_empty() {
            return Ok(self.splits.balance().abs());
        }
        Ok(slipbook_utils::parse_amount_text(&self.amount_text)?)
    }

    pub fn opposite(&self) -> Option<&Account> {
        self.opposite.as_ref()
    }

    pub fn select_account(&mut self, account: &Account) {
        if account.currency.code == self.account.currency.code {
            self.exchanged_amount = None;
        }
        self.opposite = Some(account.clone());
    }

    pub fn exchanged_amount(&self) -> Option<Decimal> {
        self.exchanged_amount
    }

    pub fn set_exchanged_amount(&mut self, value: Option<Decimal>) {
        self.exchanged_amount = value;
    }

    /// Rate between the two amounts; informational only
    pub fn exchange_rate(&self) -> Option<Decimal> {
        let amount = self.amount().ok()?;
        implied_rate(amount, self.exchanged_amount?)
    }

    /// Fill the exchanged amount from a rate
    pub fn set_exchange_rate(&mut self, rate: Decimal) -> Result<(), ValidationIssue> {
        let amount = self.amount()?;
        let target = self.opposite.as_ref().ok_or(ValidationIssue::MissingAccount)?;
        let converted = MonetaryAmount::new(amount, self.account.currency.clone())
            .abs()
            .exchange(rate, target.currency.clone());
        self.exchanged_amount = Some(converted.value());
        Ok(())
    }

    pub fn payee(&self) -> &str {
        &self.payee
    }

    pub fn set_payee(&mut self, payee: impl Into<String>) {
        self.payee = payee.into();
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn set_number(&mut self, number: impl Into<String>) {
        self.number = number.into();
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) {
        self.memo = memo.into();
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    pub fn reconcile(&self) -> ReconcileToggle {
        self.reconcile
    }

    pub fn set_reconcile(&mut self, toggle: ReconcileToggle) {
        self.reconcile = toggle;
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: impl IntoIterator<Item = String>) {
        self.tags = tags.into_iter().collect();
    }

    pub fn set_attachment(&mut self, path: impl AsRef<Path>) {
        self.attachment.set(path);
    }

    pub fn clear_attachment(&mut self) {
        self.attachment.clear();
    }

    pub fn attachment(&self) -> Option<String> {
        self.attachment.current()
    }

    // ---------- splits ----------

    pub fn splits(&self) -> &SplitEntryList {
        &self.splits
    }

    /// A blank sub-form for building split entries of this account
    pub fn split_form(&self) -> SplitEntryForm {
        SplitEntryForm::new(self.account.clone(), self.slip_type)
    }

    /// Accept the entries edited in the split dialog
    pub fn apply_splits(&mut self, entries: Vec<TransactionEntry>) {
        self.splits.set_entries(entries);

        if self.splits.is_empty() {
            self.fields.amount = true;
            self.fields.account = true;
            return;
        }

        self.fields.amount = false;
        self.fields.account = false;
        self.opposite = None;
        self.exchanged_amount = None;
        self.amount_text = self.splits.balance().abs().to_string();
        if self.options.concatenate_memos {
            self.memo = concatenate_memos(self.splits.entries().iter().map(|e| e.memo.as_str()));
        }
    }

    // ---------- building ----------

    pub fn validate(&self) -> Result<(), ValidationIssue> {
        self.validator.validate(self)
    }

    /// Turn the form into a new transaction
    pub fn build_transaction(&self, lookup: &dyn AccountLookup) -> Result<Transaction, ValidationIssue> {
        let mut tx = Transaction::new(self.date)
            .with_payee(self.payee.trim())
            .with_number(self.number.trim());

        if self.splits.is_empty() {
            let mut entry = self.build_entry()?;
            entry.memo = self.memo.clone();
            tx.entries.push(entry);
        } else {
            tx.entries = self.splits.entries().to_vec();
            tx.memo = Some(if self.options.concatenate_memos {
                concatenate_memos(tx.entries.iter().map(|e| e.memo.as_str()))
            } else {
                self.memo.clone()
            });
        }

        reconcile_transaction(
            self.options.reconcile_policy,
            &self.account.id,
            &mut tx,
            self.reconcile.state(),
            lookup,
        );
        Ok(tx)
    }

    fn build_entry(&self) -> Result<TransactionEntry, ValidationIssue> {
        let opposite = self.opposite.as_ref().ok_or(ValidationIssue::MissingAccount)?;
        if opposite.id == self.account.id {
            return Err(ValidationIssue::SameAccount);
        }
        let mut entry = polarized_entry(
            self.slip_type,
            &self.account,
            opposite,
            self.amount()?,
            self.exchanged_amount,
        )?;
        entry.tags = self.tags.clone();
        Ok(entry)
    }

    /// Whether this form can edit `tx` as a whole
    pub fn can_modify(&self, tx: &Transaction) -> bool {
        let current = &self.account.id;
        match tx.kind() {
            TransactionKind::Split => tx.common_account().as_ref() == Some(current),
            TransactionKind::DoubleEntry => match tx.entries.first() {
                Some(entry) if entry.involves(current) => match self.slip_type {
                    SlipType::Decrease => &entry.credit_account != current,
                    SlipType::Increase => &entry.debit_account != current,
                },
                _ => false,
            },
            TransactionKind::SingleEntry | TransactionKind::Invalid => false,
        }
    }

    // ---------- loading ----------

    /// Fill the form from `tx`
    pub fn load_transaction(&mut self, tx: &Transaction, lookup: &dyn AccountLookup) {
        self.clear();
        let current = self.account.id;

        self.set_amount(tx.amount(&current).abs());
        self.memo = tx.memo();
        self.payee = tx.payee.clone();
        self.number = tx.number.clone();
        self.date = tx.date;
        self.reconcile = ReconcileToggle::from_state(tx.reconciled(&current).unwrap_or_default());
        self.attachment.load_from(tx);

        if tx.kind() == TransactionKind::Split {
            self.fields.account = false;
            if self.can_modify(tx) {
                self.splits.set_entries(tx.entries.clone());
                self.fields.amount = false;
            } else {
                self.fields.date = false;
                self.fields.number = false;
                self.fields.payee = false;
                self.fields.splits = false;
                if let Some(entry) = tx.entries.iter().find(|e| e.involves(&current)) {
                    self.load_entry(entry, lookup);
                }
            }
            return;
        }

        let Some(entry) = tx.entries.first() else {
            return;
        };
        self.tags = entry.tags.clone();
        let (opposite, exchanged) = match self.slip_type {
            SlipType::Decrease => (entry.credit_account, entry.credit_amount),
            SlipType::Increase => (entry.debit_account, entry.debit_amount.abs()),
        };
        self.opposite = lookup.account(&opposite).cloned();
        if self
            .opposite
            .as_ref()
            .map(|a| a.currency.code != self.account.currency.code)
            .unwrap_or(false)
        {
            self.exchanged_amount = Some(exchanged);
        }
        if tx.are_accounts_hidden(lookup) {
            self.fields.account = false;
        }
    }

    /// Load one entry of a split the account does not own
    fn load_entry(&mut self, entry: &TransactionEntry, lookup: &dyn AccountLookup) {
        let current = self.account.id;
        let signed = entry.amount(&current);
        self.set_amount(match self.slip_type {
            SlipType::Decrease => -signed,
            SlipType::Increase => signed,
        });
        self.memo = entry.memo.clone();
        self.tags = entry.tags.clone();
        self.reconcile = ReconcileToggle::from_state(entry.reconciled(&current).unwrap_or_default());

        self.opposite = entry
            .opposite_account(&current)
            .and_then(|id| lookup.account(&id).cloned());
        self.exchanged_amount = match &self.opposite {
            Some(opposite) if opposite.currency.code != self.account.currency.code => {
                Some(entry.amount(&opposite.id).abs())
            }
            _ => None,
        };
        self.fields.account = true;
        self.fields.amount = true;
    }

    /// Load `tx` for editing
    ///
    /// A split this form cannot edit as a whole is still editable one entry
    /// at a time when the account sits on exactly one of its entries.
    pub fn modify_transaction(&mut self, tx: &Transaction, lookup: &dyn AccountLookup) -> LoadOutcome {
        if tx.are_accounts_locked(lookup) {
            let name = tx
                .accounts()
                .iter()
                .filter_map(|id| lookup.account(id))
                .find(|a| a.locked)
                .map(|a| a.name.clone())
                .unwrap_or_default();
            DefaultErrorLogger.log_error(
                &CoreError::AccountLocked { name },
                &self.transaction_context("modify transaction", tx),
            );
            self.clear();
            return LoadOutcome::Locked;
        }

        if self.can_modify(tx) {
            self.load_transaction(tx, lookup);
            self.original = Some(tx.clone());
            self.mode = EditMode::Transaction;
            return LoadOutcome::Loaded(self.mode);
        }

        if tx.kind() == TransactionKind::Split {
            let mut involved = tx
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.involves(&self.account.id))
                .map(|(i, _)| i);
            if let (Some(entry_index), None) = (involved.next(), involved.next()) {
                self.load_transaction(tx, lookup);
                self.original = Some(tx.clone());
                self.mode = EditMode::SingleEntry { entry_index };
                return LoadOutcome::Loaded(self.mode);
            }
        }

        DefaultErrorLogger.log_error(
            &CoreError::NotModifiable {
                account: self.account.name.clone(),
            },
            &self
                .transaction_context("modify transaction", tx)
                .with_data("form", self.slip_type.to_string().into()),
        );
        LoadOutcome::NotModifiable
    }

    // ---------- auto-complete ----------

    /// Pre-fill a new form from an earlier transaction
    ///
    /// The number, reconciliation and attachment are not carried over. An
    /// amount or memo already typed into the form is kept.
    pub fn prefill_from(&mut self, template: &Transaction, lookup: &dyn AccountLookup) -> bool {
        if self.mode != EditMode::New || !self.options.auto_complete || !self.can_modify(template) {
            return false;
        }

        let mut tx = template.clone();
        tx.number.clear();
        tx.date = if self.options.remember_last_date {
            self.date
        } else {
            today()
        };
        if !self.amount_text.trim().is_empty() {
            match self.build_transaction(lookup) {
                Ok(built) => tx.entries = built.entries,
                Err(issue) => log::debug!("keeping template amounts: {}", issue),
            }
        }
        if !self.memo.trim().is_empty() {
            tx.memo = Some(self.memo.clone());
        }
        tx.set_reconciled_all(ReconciledState::NotReconciled);
        tx.attachment = None;

        self.load_transaction(&tx, lookup);
        true
    }

    /// Pre-fill from the newest usable transaction with `payee`
    ///
    /// `history` is expected in register order.
    pub fn auto_complete(&mut self, payee: &str, history: &[Transaction], lookup: &dyn AccountLookup) -> bool {
        let wanted = payee.trim();
        if wanted.is_empty() {
            return false;
        }
        let template = history
            .iter()
            .rev()
            .filter(|t| t.payee.eq_ignore_ascii_case(wanted))
            .find(|t| self.can_modify(t))
            .cloned();
        match template {
            Some(template) => self.prefill_from(&template, lookup),
            None => false,
        }
    }

    // ---------- committing ----------

    /// Enter the form into `engine`
    pub fn commit(&mut self, engine: &mut dyn Engine) -> CommitOutcome {
        if let Err(issue) = self.validate() {
            return self.reject(issue);
        }

        let built = match (self.mode, self.original.as_ref()) {
            (EditMode::SingleEntry { entry_index }, Some(old)) => {
                self.rebuild_entry(old, entry_index, engine.as_lookup())
            }
            _ => self.build_transaction(engine.as_lookup()),
        };
        let mut tx = match built {
            Ok(tx) => tx,
            Err(issue) => return self.reject(issue),
        };

        if let Err(e) = self.attachment.store(&mut *engine) {
            self.report_rejection("store attachment", &e);
            return CommitOutcome::EngineRejected(e);
        }

        let Some(old) = self.original.clone() else {
            let tx = self.attachment.apply(tx);
            let id = tx.id;
            if let Err(e) = engine.add_transaction(tx) {
                self.report_rejection("add transaction", &e);
                self.discard_attachment(engine);
                return CommitOutcome::EngineRejected(e);
            }
            self.clear();
            return CommitOutcome::Added(id);
        };

        if self.mode == EditMode::Transaction {
            tx.date_entered = old.date_entered;
            propagate_reconciliation(
                &old,
                &mut tx,
                &self.account.id,
                self.reconcile.state(),
                self.options.reconcile_policy,
                engine.as_lookup(),
            );
        }
        let tx = self.attachment.apply(tx);
        let new_id = tx.id;

        if let Err(e) = replace_transaction(engine, &old, tx) {
            self.report_rejection("replace transaction", &e);
            self.discard_attachment(engine);
            return CommitOutcome::EngineRejected(e);
        }
        self.clear();
        CommitOutcome::Replaced { old: old.id, new: new_id }
    }

    /// Copy of `old` with only the entry at `index` rebuilt from the form
    fn rebuild_entry(
        &self,
        old: &Transaction,
        index: usize,
        lookup: &dyn AccountLookup,
    ) -> Result<Transaction, ValidationIssue> {
        let mut tx = old.clone();
        tx.id = TransactionId::new();

        let mut entry = self.build_entry()?;
        entry.memo = self.memo.clone();
        if let Some(previous) = old.entries.get(index) {
            let sides: Vec<_> = entry.accounts().filter(|a| a != &self.account.id).collect();
            for side in sides {
                if let Some(state) = previous.reconciled(&side) {
                    entry.set_reconciled(&side, state);
                }
            }
        }
        match tx.entries.get_mut(index) {
            Some(slot) => *slot = entry,
            None => tx.entries.push(entry),
        }

        reconcile_transaction(
            self.options.reconcile_policy,
            &self.account.id,
            &mut tx,
            self.reconcile.state(),
            lookup,
        );
        Ok(tx)
    }

    fn error_context(&self, operation: &str) -> ErrorContext {
        ErrorContext::new(operation.to_string()).with_account(self.account.name.clone())
    }

    fn transaction_context(&self, operation: &str, tx: &Transaction) -> ErrorContext {
        self.error_context(operation)
            .with_data("transaction", tx.id.to_string().into())
    }

    /// Log a failed validation and reset the form
    fn reject(&mut self, issue: ValidationIssue) -> CommitOutcome {
        DefaultErrorLogger.log_error(
            &CoreError::ValidationError {
                message: issue.to_string(),
            },
            &self.error_context("commit"),
        );
        self.clear();
        CommitOutcome::Invalid(issue)
    }

    fn report_rejection(&self, operation: &str, err: &EngineError) {
        DefaultErrorLogger.log_error(&CoreError::from(err.clone()), &self.error_context(operation));
    }

    fn discard_attachment(&mut self, engine: &mut dyn Engine) {
        if let Err(e) = self.attachment.unstore(engine) {
            self.report_rejection("remove attachment", &e);
        }
    }

    /// Reset every field and return to new-entry mode
    pub fn clear(&mut self) {
        self.amount_text.clear();
        self.exchanged_amount = None;
        self.opposite = None;
        self.payee.clear();
        self.number.clear();
        self.memo.clear();
        self.reconcile = ReconcileToggle::default();
        self.tags.clear();
        self.splits.clear();
        self.attachment.reset();
        self.mode = EditMode::New;
        self.original = None;
        self.fields = FieldState::default();
        if !self.options.remember_last_date {
            self.date = today();
        }
    }
}

/// Remove `old` and add `new`; puts `old` back if the add fails
fn replace_transaction(engine: &mut dyn Engine, old: &Transaction, new: Transaction) -> Result<(), EngineError> {
    engine.remove_transaction(&old.id)?;
    if let Err(e) = engine.add_transaction(new) {
        if let Err(restore) = engine.add_transaction(old.clone()) {
            log::error!("could not restore transaction {}: {}", old.id, restore);
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::message::MessageBus;
    use crate::money::CurrencyNode;
    use crate::types::AccountType;
    use rust_decimal::dec;

    struct Fixture {
        engine: MemoryEngine,
        checking: Account,
        salary: Account,
        food: Account,
        fuel: Account,
        travel: Account,
    }

    fn fixture() -> Fixture {
        let usd = CurrencyNode::new("USD", 2);
        let checking = Account::new("Checking", AccountType::Checking, usd.clone());
        let salary = Account::new("Salary", AccountType::Income, usd.clone());
        let food = Account::new("Food", AccountType::Expense, usd.clone());
        let fuel = Account::new("Fuel", AccountType::Expense, usd);
        let travel = Account::new("Travel", AccountType::Expense, CurrencyNode::new("EUR", 2));

        let mut engine = MemoryEngine::new(MessageBus::new());
        for account in [&checking, &salary, &food, &fuel, &travel] {
            engine.add_account(account.clone());
        }
        Fixture {
            engine,
            checking,
            salary,
            food,
            fuel,
            travel,
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn form(fx: &Fixture, slip_type: SlipType) -> SlipForm {
        SlipForm::new(fx.checking.clone(), slip_type, EntryOptions::default())
    }

    #[test]
    fn test_increase_credits_current_account() {
        let fx = fixture();
        let mut slip = form(&fx, SlipType::Increase);
        slip.set_amount_text("100");
        slip.select_account(&fx.salary);

        let tx = slip.build_transaction(&fx.engine).unwrap();
        let entry = &tx.entries[0];
        assert_eq!(entry.credit_account, fx.checking.id);
        assert_eq!(entry.debit_account, fx.salary.id);
        assert_eq!(entry.credit_amount, dec!(100));
        assert_eq!(entry.debit_amount, dec!(-100));
    }

    #[test]
    fn test_negative_amount_swaps_sides() {
        let fx = fixture();
        let mut slip = form(&fx, SlipType::Increase);
        slip.set_amount_text("-25.5");
        slip.select_account(&fx.food);
        let tx = slip.build_transaction(&fx.engine).unwrap();
        assert_eq!(tx.entries[0].credit_account, fx.food.id);
        assert_eq!(tx.amount(&fx.checking.id), dec!(-25.50));

        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_amount_text("-25.5");
        slip.select_account(&fx.food);
        let tx = slip.build_transaction(&fx.engine).unwrap();
        assert_eq!(tx.entries[0].credit_account, fx.checking.id);
        assert_eq!(tx.amount(&fx.checking.id), dec!(25.50));
    }

    #[test]
    fn test_cross_currency_entry() {
        let fx = fixture();
        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_amount_text("100");
        slip.select_account(&fx.travel);
        assert_eq!(
            slip.build_transaction(&fx.engine).unwrap_err(),
            ValidationIssue::MissingExchangeAmount
        );

        slip.set_exchange_rate(dec!(0.92)).unwrap();
        assert_eq!(slip.exchanged_amount(), Some(dec!(92.00)));
        assert_eq!(slip.exchange_rate(), Some(dec!(0.92)));

        let tx = slip.build_transaction(&fx.engine).unwrap();
        let entry = &tx.entries[0];
        assert_eq!(entry.credit_account, fx.travel.id);
        assert_eq!(entry.credit_amount, dec!(92.00));
        assert_eq!(entry.debit_account, fx.checking.id);
        assert_eq!(entry.debit_amount, dec!(-100.00));
    }

    #[test]
    fn test_commit_new_transaction() {
        let mut fx = fixture();
        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_amount_text("42.10");
        slip.select_account(&fx.food);
        slip.set_payee("Corner Shop");
        slip.set_reconcile(ReconcileToggle::Checked);

        let id = match slip.commit(&mut fx.engine) {
            CommitOutcome::Added(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        };
        let tx = fx.engine.transaction(&id).unwrap();
        assert_eq!(tx.payee, "Corner Shop");
        assert_eq!(tx.reconciled(&fx.checking.id), Some(ReconciledState::Reconciled));
        assert_eq!(tx.reconciled(&fx.food.id), Some(ReconciledState::NotReconciled));
        assert_eq!(slip.payee(), "");
        assert_eq!(slip.mode(), EditMode::New);
    }

    #[test]
    fn test_invalid_form_is_cleared() {
        let mut fx = fixture();
        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_amount_text("0");
        slip.select_account(&fx.food);
        slip.set_payee("Nobody");
        assert_eq!(slip.commit(&mut fx.engine), CommitOutcome::Invalid(ValidationIssue::ZeroAmount));
        assert_eq!(slip.payee(), "");

        slip.set_amount_text("12");
        assert_eq!(
            slip.commit(&mut fx.engine),
            CommitOutcome::Invalid(ValidationIssue::MissingAccount)
        );
        assert!(fx.engine.sorted_transactions(&fx.checking.id).is_empty());
    }

    #[test]
    fn test_custom_validator() {
        let mut fx = fixture();
        let mut slip = form(&fx, SlipType::Increase).with_validator(|f: &SlipForm| {
            if f.payee().is_empty() {
                Err(ValidationIssue::MissingAccount)
            } else {
                Ok(())
            }
        });
        slip.set_amount_text("10");
        slip.select_account(&fx.salary);
        assert!(matches!(slip.commit(&mut fx.engine), CommitOutcome::Invalid(_)));
    }

    #[test]
    fn test_can_modify_by_polarity() {
        let fx = fixture();
        let deposit =
            Transaction::new(date(1)).with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(100)));
        assert!(form(&fx, SlipType::Increase).can_modify(&deposit));
        assert!(!form(&fx, SlipType::Decrease).can_modify(&deposit));

        let split = Transaction::new(date(1))
            .with_entry(TransactionEntry::double(fx.food.id, fx.checking.id, dec!(30)))
            .with_entry(TransactionEntry::double(fx.fuel.id, fx.checking.id, dec!(20)));
        assert!(form(&fx, SlipType::Decrease).can_modify(&split));
    }

    #[test]
    fn test_modify_preserves_entered_date_and_other_sides() {
        let mut fx = fixture();
        let mut old =
            Transaction::new(date(3)).with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(100)));
        old.set_reconciled(&fx.salary.id, ReconciledState::Reconciled);
        fx.engine.add_transaction(old.clone()).unwrap();

        let mut slip = form(&fx, SlipType::Increase);
        assert_eq!(
            slip.modify_transaction(&old, &fx.engine),
            LoadOutcome::Loaded(EditMode::Transaction)
        );
        assert_eq!(slip.amount(), Ok(dec!(100)));
        assert_eq!(slip.opposite().map(|a| a.id), Some(fx.salary.id));

        slip.set_amount_text("120");
        slip.set_reconcile(ReconcileToggle::Indeterminate);
        let new_id = match slip.commit(&mut fx.engine) {
            CommitOutcome::Replaced { old: replaced, new } => {
                assert_eq!(replaced, old.id);
                new
            }
            other => panic!("unexpected outcome {:?}", other),
        };

        assert!(fx.engine.transaction(&old.id).is_none());
        let new = fx.engine.transaction(&new_id).unwrap();
        assert_eq!(new.date_entered, old.date_entered);
        assert_eq!(new.amount(&fx.checking.id), dec!(120.00));
        assert_eq!(new.reconciled(&fx.salary.id), Some(ReconciledState::Reconciled));
        assert_eq!(new.reconciled(&fx.checking.id), Some(ReconciledState::Cleared));
    }

    #[test]
    fn test_locked_transaction_clears_form() {
        let mut fx = fixture();
        let tx =
            Transaction::new(date(3)).with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(100)));
        fx.engine.add_transaction(tx.clone()).unwrap();
        fx.engine.account_mut(&fx.salary.id).unwrap().locked = true;

        let mut slip = form(&fx, SlipType::Increase);
        slip.set_payee("draft");
        assert_eq!(slip.modify_transaction(&tx, &fx.engine), LoadOutcome::Locked);
        assert_eq!(slip.payee(), "");
        assert_eq!(slip.mode(), EditMode::New);
    }

    #[test]
    fn test_not_modifiable_leaves_form() {
        let fx = fixture();
        let tx =
            Transaction::new(date(3)).with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(100)));
        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_payee("draft");
        assert_eq!(slip.modify_transaction(&tx, &fx.engine), LoadOutcome::NotModifiable);
        assert_eq!(slip.payee(), "draft");
    }

    #[test]
    fn test_single_entry_edit_of_foreign_split() {
        let mut fx = fixture();
        let split = Transaction::new(date(8))
            .with_payee("Shared dinner")
            .with_entry(TransactionEntry::double(fx.food.id, fx.checking.id, dec!(30)).with_memo("mine"))
            .with_entry(TransactionEntry::double(fx.food.id, fx.salary.id, dec!(20)).with_memo("theirs"));
        fx.engine.add_transaction(split.clone()).unwrap();

        let mut slip = form(&fx, SlipType::Decrease);
        assert_eq!(
            slip.modify_transaction(&split, &fx.engine),
            LoadOutcome::Loaded(EditMode::SingleEntry { entry_index: 0 })
        );
        assert!(!slip.fields().payee);
        assert!(!slip.fields().date);
        assert_eq!(slip.amount(), Ok(dec!(30)));
        assert_eq!(slip.memo(), "mine");
        assert_eq!(slip.opposite().map(|a| a.id), Some(fx.food.id));

        slip.set_amount_text("35");
        let new_id = match slip.commit(&mut fx.engine) {
            CommitOutcome::Replaced { new, .. } => new,
            other => panic!("unexpected outcome {:?}", other),
        };
        let new = fx.engine.transaction(&new_id).unwrap();
        assert_eq!(new.payee, "Shared dinner");
        assert_eq!(new.entries.len(), 2);
        assert_eq!(new.entries[0].amount(&fx.checking.id), dec!(-35.00));
        assert_eq!(new.entries[1], split.entries[1]);
    }

    #[test]
    fn test_account_on_two_entries_of_foreign_split() {
        let fx = fixture();
        let split = Transaction::new(date(9))
            .with_entry(TransactionEntry::double(fx.food.id, fx.checking.id, dec!(30)))
            .with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(20)))
            .with_entry(TransactionEntry::double(fx.fuel.id, fx.salary.id, dec!(5)));

        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_payee("draft");
        assert_eq!(slip.modify_transaction(&split, &fx.engine), LoadOutcome::NotModifiable);
        assert_eq!(slip.payee(), "draft");
        assert_eq!(slip.mode(), EditMode::New);
    }

    #[test]
    fn test_split_commit_uses_pending_entries() {
        let mut fx = fixture();
        let options = EntryOptions {
            concatenate_memos: true,
            ..EntryOptions::default()
        };
        let mut slip = SlipForm::new(fx.checking.clone(), SlipType::Decrease, options);

        let mut list = slip.splits().clone();
        let mut entry_form = slip.split_form();
        entry_form.amount_text = "30".to_string();
        entry_form.opposite = Some(fx.food.clone());
        entry_form.memo = "groceries".to_string();
        entry_form.enter(&mut list).unwrap();
        entry_form.amount_text = "20".to_string();
        entry_form.opposite = Some(fx.fuel.clone());
        entry_form.memo = "diesel".to_string();
        entry_form.enter(&mut list).unwrap();

        slip.apply_splits(list.entries().to_vec());
        assert_eq!(slip.amount(), Ok(dec!(50.00)));
        assert!(!slip.fields().amount);
        assert_eq!(slip.memo(), "groceries, diesel");

        let id = match slip.commit(&mut fx.engine) {
            CommitOutcome::Added(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        };
        let tx = fx.engine.transaction(&id).unwrap();
        assert_eq!(tx.kind(), TransactionKind::Split);
        assert_eq!(tx.amount(&fx.checking.id), dec!(-50.00));
        assert_eq!(tx.memo(), "groceries, diesel");
    }

    #[test]
    fn test_modify_split_loads_entries() {
        let fx = fixture();
        let split = Transaction::new(date(2))
            .with_entry(TransactionEntry::double(fx.food.id, fx.checking.id, dec!(30)))
            .with_entry(TransactionEntry::double(fx.fuel.id, fx.checking.id, dec!(20)));
        let mut slip = form(&fx, SlipType::Decrease);
        assert_eq!(
            slip.modify_transaction(&split, &fx.engine),
            LoadOutcome::Loaded(EditMode::Transaction)
        );
        assert_eq!(slip.splits().len(), 2);
        assert!(!slip.fields().amount);
        assert!(!slip.fields().account);
        assert_eq!(slip.amount(), Ok(dec!(50)));
    }

    #[test]
    fn test_engine_rejection_keeps_old_transaction() {
        let mut fx = fixture();
        let old =
            Transaction::new(date(3)).with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(100)));
        fx.engine.add_transaction(old.clone()).unwrap();

        let ghost = Account::new("Ghost", AccountType::Income, fx.checking.currency.clone());
        let mut slip = form(&fx, SlipType::Increase);
        slip.modify_transaction(&old, &fx.engine);
        slip.select_account(&ghost);

        assert!(matches!(
            slip.commit(&mut fx.engine),
            CommitOutcome::EngineRejected(EngineError::InvalidTransaction { .. })
        ));
        assert!(fx.engine.transaction(&old.id).is_some());
        assert_eq!(slip.mode(), EditMode::Transaction);
    }

    #[test]
    fn test_auto_complete_from_history() {
        let fx = fixture();
        let mut template = Transaction::new(date(1))
            .with_payee("Acme Corp")
            .with_number("1001")
            .with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(2500)));
        template.set_reconciled_all(ReconciledState::Reconciled);
        template.attachment = Some("payslip.pdf".to_string());

        let options = EntryOptions {
            remember_last_date: true,
            ..EntryOptions::default()
        };
        let mut slip = SlipForm::new(fx.checking.clone(), SlipType::Increase, options);
        slip.set_date(date(20));
        assert!(!slip.auto_complete("Unknown", &[template.clone()], &fx.engine));
        assert!(slip.auto_complete("acme corp", &[template.clone()], &fx.engine));

        assert_eq!(slip.mode(), EditMode::New);
        assert_eq!(slip.number(), "");
        assert_eq!(slip.payee(), "Acme Corp");
        assert_eq!(slip.date(), date(20));
        assert_eq!(slip.amount(), Ok(dec!(2500)));
        assert_eq!(slip.opposite().map(|a| a.id), Some(fx.salary.id));
        assert_eq!(slip.reconcile(), ReconcileToggle::Unchecked);
        assert_eq!(slip.attachment(), None);
    }

    #[test]
    fn test_prefill_keeps_typed_amount() {
        let fx = fixture();
        let template = Transaction::new(date(1))
            .with_payee("Acme Corp")
            .with_entry(TransactionEntry::double(fx.checking.id, fx.salary.id, dec!(2500)));

        let mut slip = form(&fx, SlipType::Increase);
        slip.set_amount_text("2600");
        slip.select_account(&fx.salary);
        assert!(slip.prefill_from(&template, &fx.engine));
        assert_eq!(slip.amount(), Ok(dec!(2600)));
    }

    #[test]
    fn test_attachment_chained_on_commit() {
        let mut fx = fixture();
        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_amount_text("9.99");
        slip.select_account(&fx.food);
        slip.set_attachment("/scans/receipt-9.png");

        let id = match slip.commit(&mut fx.engine) {
            CommitOutcome::Added(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(
            fx.engine.transaction(&id).unwrap().attachment.as_deref(),
            Some("receipt-9.png")
        );
    }

    #[test]
    fn test_rejected_add_releases_attachment() {
        let mut fx = fixture();
        let ghost = Account::new("Ghost", AccountType::Expense, fx.checking.currency.clone());
        let mut slip = form(&fx, SlipType::Decrease);
        slip.set_amount_text("4.20");
        slip.select_account(&ghost);
        slip.set_attachment("/scans/receipt-10.png");

        assert!(matches!(
            slip.commit(&mut fx.engine),
            CommitOutcome::EngineRejected(EngineError::InvalidTransaction { .. })
        ));
        assert_eq!(slip.attachment().as_deref(), Some("/scans/receipt-10.png"));

        slip.select_account(&fx.food);
        let id = match slip.commit(&mut fx.engine) {
            CommitOutcome::Added(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(
            fx.engine.transaction(&id).unwrap().attachment.as_deref(),
            Some("receipt-10.png")
        );
    }
}
