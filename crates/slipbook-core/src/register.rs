//! Per-account register with a cached running balance
//!
//! A [`LedgerView`] projects the transactions of one account into rows and
//! answers the cumulative balance at each row. Balances are cached per row
//! and invalidated from the affected row forward when rows are inserted or
//! removed. Re-sorting clears the whole cache.

use rust_decimal::Decimal;
use slipbook_config::{BalanceDisplayMode, Config};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::display::convert_to_display;
use crate::message::{Message, Subscription};
use crate::models::{Account, AccountId, AccountLookup, Transaction, TransactionId};
use crate::money::MonetaryAmount;
use crate::types::{ReconciledState, TransactionKind};

// ==================== Balance Cache ====================

/// Running balances indexed by row; `None` marks an invalidated slot
#[derive(Debug, Clone, Default)]
pub struct BalanceCache {
    balances: Vec<Option<Decimal>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_capacity(&mut self, rows: usize) {
        self.balances.reserve(rows.saturating_sub(self.balances.len()));
    }

    pub fn get(&self, index: usize) -> Option<Decimal> {
        self.balances.get(index).copied().flatten()
    }

    pub fn set(&mut self, index: usize, balance: Decimal) {
        if index >= self.balances.len() {
            self.balances.resize(index + 1, None);
        }
        self.balances[index] = Some(balance);
    }

    /// Drop `index` and everything after it
    pub fn clear_from(&mut self, index: usize) {
        self.balances.truncate(index);
    }

    pub fn clear(&mut self) {
        self.balances.clear();
    }

    /// Number of slots currently holding a balance
    pub fn cached_count(&self) -> usize {
        self.balances.iter().filter(|b| b.is_some()).count()
    }
}

// ==================== Rows ====================

/// How a row relates to its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// The whole transaction in one row
    Transaction,
    /// First detailed entry of a split; carries the transaction fields
    SplitHead,
    /// Further detailed entries of a split
    SplitDetail,
}

#[derive(Debug, Clone)]
pub struct RegisterRow {
    pub transaction: Arc<Transaction>,
    /// Entry shown by a split-detail row
    pub entry_index: Option<usize>,
    pub kind: RowKind,
    /// Signed amount this row adds to the account balance
    pub contribution: Decimal,
}

impl RegisterRow {
    pub fn increase(&self) -> Option<Decimal> {
        (self.contribution > Decimal::ZERO).then_some(self.contribution)
    }

    pub fn decrease(&self) -> Option<Decimal> {
        (self.contribution < Decimal::ZERO).then_some(-self.contribution)
    }

    /// Date, number, payee and memo are suppressed on detail rows
    pub fn show_transaction_fields(&self) -> bool {
        self.kind != RowKind::SplitDetail
    }

    pub fn memo(&self) -> String {
        match self.entry_index.and_then(|i| self.transaction.entries.get(i)) {
            Some(entry) => entry.memo.clone(),
            None => self.transaction.memo(),
        }
    }

    /// Account on the other side, or `None` for a collapsed split
    pub fn opposite_account(&self, account: &AccountId) -> Option<AccountId> {
        match self.entry_index {
            Some(i) => self.transaction.entries.get(i)?.opposite_account(account),
            None if self.transaction.kind() == TransactionKind::Split => None,
            None => self.transaction.entries.first()?.opposite_account(account),
        }
    }

    pub fn reconciled(&self, account: &AccountId) -> ReconciledState {
        let state = match self.entry_index {
            Some(i) => self.transaction.entries.get(i).and_then(|e| e.reconciled(account)),
            None => self.transaction.reconciled(account),
        };
        state.unwrap_or_default()
    }
}

// ==================== Ledger View ====================

/// Register presentation options
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
    pub show_split_detail: bool,
    pub display_mode: BalanceDisplayMode,
}

impl From<&Config> for RegisterOptions {
    fn from(config: &Config) -> Self {
        Self {
            show_split_detail: config.register.show_split_detail,
            display_mode: config.register.balance_display,
        }
    }
}

/// Sortable register columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Date,
    Number,
    Payee,
    Memo,
    Account,
    Amount,
}

impl std::str::FromStr for SortColumn {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SortColumn::Date),
            "number" | "num" => Ok(SortColumn::Number),
            "payee" => Ok(SortColumn::Payee),
            "memo" => Ok(SortColumn::Memo),
            "account" => Ok(SortColumn::Account),
            "amount" => Ok(SortColumn::Amount),
            _ => Err(format!("Invalid sort column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SortOrder {
    column: SortColumn,
    ascending: bool,
}

/// Register of one account
pub struct LedgerView {
    account: Account,
    options: RegisterOptions,
    /// Transactions in display order
    transactions: Vec<Arc<Transaction>>,
    rows: Vec<RegisterRow>,
    cache: BalanceCache,
    sort: Option<SortOrder>,
    /// Opposite-account names captured by the last account sort
    account_names: Vec<(AccountId, String)>,
}

impl LedgerView {
    /// Build a register from any set of transactions; those not touching
    /// the account are skipped
    pub fn new(account: Account, transactions: impl IntoIterator<Item = Transaction>, options: RegisterOptions) -> Self {
        let mut transactions: Vec<Arc<Transaction>> = transactions
            .into_iter()
            .filter(|t| t.involves(&account.id))
            .map(Arc::new)
            .collect();
        transactions.sort_by(|a, b| a.cmp_canonical(b));

        let mut view = Self {
            account,
            options,
            transactions,
            rows: Vec::new(),
            cache: BalanceCache::new(),
            sort: None,
            account_names: Vec::new(),
        };
        view.rebuild_rows();
        view
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn options(&self) -> RegisterOptions {
        self.options
    }

    pub fn rows(&self) -> &[RegisterRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&RegisterRow> {
        self.rows.get(index)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn cached_balance_count(&self) -> usize {
        self.cache.cached_count()
    }

    /// Running balance after row `index`, in display convention
    ///
    /// # Panics
    ///
    /// Panics when `index` is not a valid row.
    pub fn balance_at(&mut self, index: usize) -> MonetaryAmount {
        assert!(
            index < self.rows.len(),
            "row index {} out of range for register with {} rows",
            index,
            self.rows.len()
        );
        let raw = self.raw_balance_at(index);
        let shown = convert_to_display(self.options.display_mode, self.account.account_type, raw);
        MonetaryAmount::new(shown, self.account.currency.clone())
    }

    fn raw_balance_at(&mut self, index: usize) -> Decimal {
        if let Some(balance) = self.cache.get(index) {
            return balance;
        }

        if index > 0 {
            if let Some(previous) = self.cache.get(index - 1) {
                let balance = previous + self.rows[index].contribution;
                self.cache.set(index, balance);
                return balance;
            }
        }

        let mut balance = Decimal::ZERO;
        for (i, row) in self.rows.iter().enumerate().take(index + 1) {
            balance += row.contribution;
            self.cache.set(i, balance);
        }
        balance
    }

    /// Invalidate after rows were inserted at `row_index`
    pub fn on_insert(&mut self, row_index: usize) {
        self.cache.clear_from(row_index);
        self.cache.ensure_capacity(self.rows.len());
    }

    /// Invalidate after rows were removed at `row_index`
    pub fn on_remove(&mut self, row_index: usize) {
        self.cache.clear_from(row_index.saturating_sub(1));
    }

    /// Insert a transaction at its ordered position; returns its first row
    pub fn insert_transaction(&mut self, transaction: Arc<Transaction>) -> Option<usize> {
        if !transaction.involves(&self.account.id) {
            log::debug!(
                "ignoring transaction {} which does not touch {}",
                transaction.id,
                self.account.name
            );
            return None;
        }
        if self.index_of(&transaction.id).is_some() {
            self.remove_transaction(&transaction.id);
        }

        let position = self
            .transactions
            .iter()
            .position(|t| self.compare(t, &transaction) == Ordering::Greater)
            .unwrap_or(self.transactions.len());
        let row_index = self.rows_before(position);

        let new_rows = self.rows_for(&transaction);
        self.rows.splice(row_index..row_index, new_rows);
        self.transactions.insert(position, transaction);
        self.on_insert(row_index);
        Some(row_index)
    }

    /// Remove every row of a transaction; returns its former first row
    pub fn remove_transaction(&mut self, id: &TransactionId) -> Option<usize> {
        let position = self.transactions.iter().position(|t| &t.id == id)?;
        let row_index = self.rows_before(position);
        let count = self.rows[row_index..]
            .iter()
            .take_while(|r| &r.transaction.id == id)
            .count();

        self.transactions.remove(position);
        self.rows.drain(row_index..row_index + count);
        self.on_remove(row_index);
        Some(row_index)
    }

    pub fn set_show_split_detail(&mut self, show: bool) {
        if self.options.show_split_detail != show {
            self.options.show_split_detail = show;
            self.rebuild_rows();
        }
    }

    pub fn set_display_mode(&mut self, mode: BalanceDisplayMode) {
        self.options.display_mode = mode;
    }

    /// Re-sort the register; the balance cache is cleared
    pub fn sort_by(&mut self, column: SortColumn, ascending: bool, lookup: &dyn AccountLookup) {
        self.sort = Some(SortOrder { column, ascending });
        self.account_names = self
            .transactions
            .iter()
            .flat_map(|t| t.accounts())
            .filter_map(|id| lookup.account(&id).map(|a| (id, a.name.clone())))
            .collect();

        let mut transactions = std::mem::take(&mut self.transactions);
        transactions.sort_by(|a, b| self.compare(a, b));
        self.transactions = transactions;
        self.rebuild_rows();
    }

    /// Return to canonical order
    pub fn clear_sort(&mut self) {
        self.sort = None;
        self.account_names.clear();
        self.transactions.sort_by(|a, b| a.cmp_canonical(b));
        self.rebuild_rows();
    }

    /// First row of a transaction
    pub fn index_of(&self, id: &TransactionId) -> Option<usize> {
        self.rows.iter().position(|r| &r.transaction.id == id)
    }

    /// Position of a row's transaction in the account's canonical order
    pub fn convert_row_index_to_account(&self, row_index: usize) -> Option<usize> {
        let row = self.rows.get(row_index)?;
        Some(
            self.transactions
                .iter()
                .filter(|t| t.cmp_canonical(&row.transaction) == Ordering::Less)
                .count(),
        )
    }

    /// Apply queued bus messages; returns how many were handled
    pub fn pump(&mut self, subscription: &mut Subscription) -> usize {
        let mut handled = 0;
        while let Some(message) = subscription.try_next() {
            match message {
                Message::TransactionAdded { account, transaction } if account == self.account.id => {
                    self.insert_transaction(transaction);
                    handled += 1;
                }
                Message::TransactionRemoved { account, transaction } if account == self.account.id => {
                    self.remove_transaction(&transaction.id);
                    handled += 1;
                }
                Message::FileClosing => {
                    log::debug!("closing register for {}", self.account.name);
                    self.transactions.clear();
                    self.rows.clear();
                    self.cache.clear();
                    handled += 1;
                }
                _ => {}
            }
        }
        handled
    }

    fn rebuild_rows(&mut self) {
        self.rows = self.transactions.iter().flat_map(|t| self.rows_for(t)).collect();
        self.cache.clear();
        self.cache.ensure_capacity(self.rows.len());
    }

    fn rows_before(&self, position: usize) -> usize {
        self.transactions[..position]
            .iter()
            .map(|t| self.row_span(t))
            .sum()
    }

    fn row_span(&self, transaction: &Transaction) -> usize {
        let impacting = transaction.impacting_entries(&self.account.id).len();
        if self.explodes(transaction, impacting) {
            impacting
        } else {
            1
        }
    }

    fn explodes(&self, transaction: &Transaction, impacting: usize) -> bool {
        self.options.show_split_detail && transaction.kind() == TransactionKind::Split && impacting >= 2
    }

    fn rows_for(&self, transaction: &Arc<Transaction>) -> Vec<RegisterRow> {
        let account = &self.account.id;
        let impacting = transaction.impacting_entries(account);

        if !self.explodes(transaction, impacting.len()) {
            return vec![RegisterRow {
                transaction: Arc::clone(transaction),
                entry_index: None,
                kind: RowKind::Transaction,
                contribution: transaction.amount(account),
            }];
        }

        impacting
            .into_iter()
            .enumerate()
            .map(|(n, i)| RegisterRow {
                transaction: Arc::clone(transaction),
                entry_index: Some(i),
                kind: if n == 0 { RowKind::SplitHead } else { RowKind::SplitDetail },
                contribution: transaction.entries[i].amount(account),
            })
            .collect()
    }

    fn opposite_name(&self, transaction: &Transaction) -> String {
        if transaction.kind() == TransactionKind::Split {
            return String::new();
        }
        transaction
            .entries
            .first()
            .and_then(|e| e.opposite_account(&self.account.id))
            .and_then(|id| self.account_names.iter().find(|(a, _)| a == &id))
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    }

    fn compare(&self, a: &Transaction, b: &Transaction) -> Ordering {
        let Some(order) = self.sort else {
            return a.cmp_canonical(b);
        };
        let account = &self.account.id;
        let primary = match order.column {
            SortColumn::Date => a.date.cmp(&b.date),
            SortColumn::Number => a.number.cmp(&b.number),
            SortColumn::Payee => a.payee.to_lowercase().cmp(&b.payee.to_lowercase()),
            SortColumn::Memo => a.memo().to_lowercase().cmp(&b.memo().to_lowercase()),
            SortColumn::Account => self.opposite_name(a).cmp(&self.opposite_name(b)),
            SortColumn::Amount => a.amount(account).cmp(&b.amount(account)),
        };
        let ordering = primary.then_with(|| a.cmp_canonical(b));
        if order.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}
