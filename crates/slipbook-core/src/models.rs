//! Domain models: accounts, entries and transactions

use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

use crate::money::CurrencyNode;
use crate::types::{AccountType, ReconciledState, TransactionKind};

// ==================== Identifiers ====================

/// Stable account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        AccountId(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable transaction identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==================== Accounts ====================

/// Account information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub account_type: AccountType,
    pub currency: CurrencyNode,
    /// Transactions touching a locked account may only change reconciliation
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Account {
    pub fn new(name: impl Into<String>, account_type: AccountType, currency: CurrencyNode) -> Self {
        Self {
            id: AccountId::new(),
            name: name.into(),
            account_type,
            currency,
            locked: false,
            visible: true,
        }
    }
}

/// Read access to accounts by id
pub trait AccountLookup {
    fn account(&self, id: &AccountId) -> Option<&Account>;
}

impl AccountLookup for HashMap<AccountId, Account> {
    fn account(&self, id: &AccountId) -> Option<&Account> {
        self.get(id)
    }
}

// ==================== Entries ====================

/// One credit/debit leg of a transaction
///
/// When both accounts share a currency the debit amount is the negated
/// credit amount. Across currencies each side carries its own value, the
/// credit amount positive and the debit amount negative. A single-entry
/// placeholder names the same account on both sides with equal amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub credit_account: AccountId,
    pub debit_account: AccountId,
    pub credit_amount: Decimal,
    pub debit_amount: Decimal,
    #[serde(default)]
    pub memo: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    reconciled: BTreeMap<AccountId, ReconciledState>,
}

impl TransactionEntry {
    /// Placeholder entry that adjusts a single account
    pub fn single(account: AccountId, amount: Decimal) -> Self {
        Self {
            credit_account: account,
            debit_account: account,
            credit_amount: amount,
            debit_amount: amount,
            memo: String::new(),
            tags: BTreeSet::new(),
            reconciled: BTreeMap::from([(account, ReconciledState::NotReconciled)]),
        }
    }

    /// Same-currency entry moving `amount.abs()` from debit to credit
    pub fn double(credit_account: AccountId, debit_account: AccountId, amount: Decimal) -> Self {
        let mut entry = Self::exchanged(credit_account, debit_account, Decimal::ZERO, Decimal::ZERO);
        entry.set_amount(amount.abs());
        entry
    }

    /// Cross-currency entry with independently entered amounts
    pub fn exchanged(
        credit_account: AccountId,
        debit_account: AccountId,
        credit_amount: Decimal,
        debit_amount: Decimal,
    ) -> Self {
        Self {
            credit_account,
            debit_account,
            credit_amount,
            debit_amount,
            memo: String::new(),
            tags: BTreeSet::new(),
            reconciled: BTreeMap::from([
                (credit_account, ReconciledState::NotReconciled),
                (debit_account, ReconciledState::NotReconciled),
            ]),
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Set both sides from one non-negative magnitude
    pub fn set_amount(&mut self, amount: Decimal) {
        self.credit_amount = amount;
        self.debit_amount = -amount;
    }

    /// Signed contribution of this entry to `account`
    pub fn amount(&self, account: &AccountId) -> Decimal {
        if &self.credit_account == account {
            self.credit_amount
        } else if &self.debit_account == account {
            self.debit_amount
        } else {
            Decimal::ZERO
        }
    }

    pub fn involves(&self, account: &AccountId) -> bool {
        &self.credit_account == account || &self.debit_account == account
    }

    /// The account on the other side, if `account` participates
    pub fn opposite_account(&self, account: &AccountId) -> Option<AccountId> {
        if &self.credit_account == account {
            Some(self.debit_account)
        } else if &self.debit_account == account {
            Some(self.credit_account)
        } else {
            None
        }
    }

    pub fn is_single_entry(&self) -> bool {
        self.credit_account == self.debit_account && self.credit_amount == self.debit_amount
    }

    pub fn reconciled(&self, account: &AccountId) -> Option<ReconciledState> {
        if !self.involves(account) {
            return None;
        }
        Some(self.reconciled.get(account).copied().unwrap_or_default())
    }

    /// Set the state of one side; accounts not on this entry are ignored
    pub fn set_reconciled(&mut self, account: &AccountId, state: ReconciledState) {
        if self.involves(account) {
            self.reconciled.insert(*account, state);
        }
    }

    pub fn set_all_reconciled(&mut self, state: ReconciledState) {
        self.reconciled.insert(self.credit_account, state);
        self.reconciled.insert(self.debit_account, state);
    }

    /// Accounts on this entry, credit side first
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> {
        let debit = (self.debit_account != self.credit_account).then_some(self.debit_account);
        std::iter::once(self.credit_account).chain(debit)
    }

    fn is_balanced(&self, lookup: &dyn AccountLookup) -> bool {
        if self.is_single_entry() {
            return true;
        }
        let same_currency = match (lookup.account(&self.credit_account), lookup.account(&self.debit_account)) {
            (Some(credit), Some(debit)) => credit.currency.code == debit.currency.code,
            _ => return false,
        };
        if same_currency {
            (self.credit_amount + self.debit_amount).is_zero()
        } else {
            self.credit_amount.is_sign_positive()
                && !self.credit_amount.is_zero()
                && self.debit_amount.is_sign_negative()
                && !self.debit_amount.is_zero()
        }
    }
}

// ==================== Transactions ====================

/// An ordered set of entries sharing a date, number and payee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub date_entered: NaiveDateTime,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub payee: String,
    /// Explicit memo; `None` falls back to the entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    pub entries: Vec<TransactionEntry>,
}

impl Transaction {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: TransactionId::new(),
            date,
            date_entered: Local::now().naive_local(),
            number: String::new(),
            payee: String::new(),
            memo: None,
            attachment: None,
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: TransactionEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = payee.into();
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn kind(&self) -> TransactionKind {
        match self.entries.as_slice() {
            [] => TransactionKind::Invalid,
            [entry] if entry.is_single_entry() => TransactionKind::SingleEntry,
            [entry] if entry.credit_account == entry.debit_account => TransactionKind::Invalid,
            [_] => TransactionKind::DoubleEntry,
            _ => TransactionKind::Split,
        }
    }

    /// Sum of every entry's contribution to `account`
    pub fn amount(&self, account: &AccountId) -> Decimal {
        self.entries.iter().map(|e| e.amount(account)).sum()
    }

    /// Distinct accounts in order of first appearance
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut seen = Vec::new();
        for account in self.entries.iter().flat_map(|e| e.accounts()) {
            if !seen.contains(&account) {
                seen.push(account);
            }
        }
        seen
    }

    pub fn involves(&self, account: &AccountId) -> bool {
        self.entries.iter().any(|e| e.involves(account))
    }

    /// The account present on every entry
    ///
    /// A transaction with fewer than two entries answers its credit account.
    pub fn common_account(&self) -> Option<AccountId> {
        if self.entries.len() < 2 {
            return self.entries.first().map(|e| e.credit_account);
        }
        self.accounts()
            .into_iter()
            .find(|a| self.entries.iter().all(|e| e.involves(a)))
    }

    /// Indices of entries with a non-zero amount against `account`
    pub fn impacting_entries(&self, account: &AccountId) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.amount(account).is_zero())
            .map(|(i, _)| i)
            .collect()
    }

    /// First recorded state for `account`, credit side checked before debit
    pub fn reconciled(&self, account: &AccountId) -> Option<ReconciledState> {
        self.entries.iter().find_map(|e| e.reconciled(account))
    }

    pub fn set_reconciled(&mut self, account: &AccountId, state: ReconciledState) {
        for entry in &mut self.entries {
            entry.set_reconciled(account, state);
        }
    }

    pub fn set_reconciled_all(&mut self, state: ReconciledState) {
        for entry in &mut self.entries {
            entry.set_all_reconciled(state);
        }
    }

    /// Effective memo
    ///
    /// The explicit memo wins. Otherwise a single entry supplies its own memo
    /// and a split joins the memos of its entries.
    pub fn memo(&self) -> String {
        if let Some(ref memo) = self.memo {
            return memo.clone();
        }
        match self.entries.as_slice() {
            [] => String::new(),
            [entry] => entry.memo.clone(),
            entries => slipbook_utils::concatenate_memos(entries.iter().map(|e| e.memo.as_str())),
        }
    }

    pub fn are_accounts_locked(&self, lookup: &dyn AccountLookup) -> bool {
        self.accounts()
            .iter()
            .any(|id| lookup.account(id).map(|a| a.locked).unwrap_or(false))
    }

    pub fn are_accounts_hidden(&self, lookup: &dyn AccountLookup) -> bool {
        self.accounts()
            .iter()
            .any(|id| lookup.account(id).map(|a| !a.visible).unwrap_or(false))
    }

    /// True when every entry balances on its own
    pub fn is_balanced(&self, lookup: &dyn AccountLookup) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.is_balanced(lookup))
    }

    /// Register ordering: date, number, date entered, amount, then id
    pub fn cmp_canonical(&self, other: &Transaction) -> Ordering {
        if self.id == other.id {
            return Ordering::Equal;
        }
        self.date
            .cmp(&other.date)
            .then_with(|| self.number.cmp(&other.number))
            .then_with(|| self.date_entered.cmp(&other.date_entered))
            .then_with(|| self.common_amount().cmp(&other.common_amount()))
            .then_with(|| self.id.cmp(&other.id))
    }

    fn common_amount(&self) -> Decimal {
        self.common_account()
            .map(|a| self.amount(&a))
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn accounts() -> (HashMap<AccountId, Account>, AccountId, AccountId, AccountId) {
        let usd = CurrencyNode::new("USD", 2);
        let checking = Account::new("Checking", AccountType::Checking, usd.clone());
        let groceries = Account::new("Groceries", AccountType::Expense, usd);
        let travel = Account::new("Travel", AccountType::Expense, CurrencyNode::new("EUR", 2));
        let ids = (checking.id, groceries.id, travel.id);
        let map = [checking, groceries, travel]
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        (map, ids.0, ids.1, ids.2)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_entry_amounts_by_side() {
        let (_, x, y, z) = accounts();
        let entry = TransactionEntry::double(x, y, dec!(-150.00));
        assert_eq!(entry.amount(&x), dec!(150.00));
        assert_eq!(entry.amount(&y), dec!(-150.00));
        assert_eq!(entry.amount(&z), Decimal::ZERO);
        assert_eq!(entry.opposite_account(&x), Some(y));
        assert!(!entry.is_single_entry());
        assert!(TransactionEntry::single(x, dec!(5)).is_single_entry());
    }

    #[test]
    fn test_entry_reconciled_per_account() {
        let (_, x, y, z) = accounts();
        let mut entry = TransactionEntry::double(x, y, dec!(10));
        entry.set_reconciled(&y, ReconciledState::Reconciled);
        entry.set_reconciled(&z, ReconciledState::Cleared);
        assert_eq!(entry.reconciled(&x), Some(ReconciledState::NotReconciled));
        assert_eq!(entry.reconciled(&y), Some(ReconciledState::Reconciled));
        assert_eq!(entry.reconciled(&z), None);
    }

    #[test]
    fn test_transaction_kind() {
        let (_, x, y, _) = accounts();
        assert_eq!(Transaction::new(date(1)).kind(), TransactionKind::Invalid);
        let single = Transaction::new(date(1)).with_entry(TransactionEntry::single(x, dec!(3)));
        assert_eq!(single.kind(), TransactionKind::SingleEntry);
        let double = Transaction::new(date(1)).with_entry(TransactionEntry::double(x, y, dec!(3)));
        assert_eq!(double.kind(), TransactionKind::DoubleEntry);
        let split = double.clone().with_entry(TransactionEntry::double(x, y, dec!(4)));
        assert_eq!(split.kind(), TransactionKind::Split);
    }

    #[test]
    fn test_common_account() {
        let (_, x, y, z) = accounts();
        let split = Transaction::new(date(1))
            .with_entry(TransactionEntry::double(y, x, dec!(40)))
            .with_entry(TransactionEntry::double(z, x, dec!(60)));
        assert_eq!(split.common_account(), Some(x));
        assert_eq!(split.amount(&x), dec!(-100));

        let double = Transaction::new(date(1)).with_entry(TransactionEntry::double(y, x, dec!(40)));
        assert_eq!(double.common_account(), Some(y));

        let disjoint = Transaction::new(date(1))
            .with_entry(TransactionEntry::double(y, x, dec!(1)))
            .with_entry(TransactionEntry::single(z, dec!(1)));
        assert_eq!(disjoint.common_account(), None);
    }

    #[test]
    fn test_memo_fallback() {
        let (_, x, y, z) = accounts();
        let mut tx = Transaction::new(date(1))
            .with_entry(TransactionEntry::double(y, x, dec!(1)).with_memo("milk"))
            .with_entry(TransactionEntry::double(z, x, dec!(2)).with_memo("bread"));
        assert_eq!(tx.memo(), "milk, bread");
        tx.memo = Some("weekly shop".to_string());
        assert_eq!(tx.memo(), "weekly shop");

        let double = Transaction::new(date(1)).with_entry(TransactionEntry::double(y, x, dec!(1)).with_memo("milk"));
        assert_eq!(double.memo(), "milk");
    }

    #[test]
    fn test_locked_and_hidden() {
        let (mut map, x, y, _) = accounts();
        let tx = Transaction::new(date(1)).with_entry(TransactionEntry::double(x, y, dec!(1)));
        assert!(!tx.are_accounts_locked(&map));
        map.get_mut(&y).unwrap().locked = true;
        assert!(tx.are_accounts_locked(&map));
        map.get_mut(&x).unwrap().visible = false;
        assert!(tx.are_accounts_hidden(&map));
    }

    #[test]
    fn test_is_balanced() {
        let (map, x, y, z) = accounts();
        let same = Transaction::new(date(1)).with_entry(TransactionEntry::double(x, y, dec!(5)));
        assert!(same.is_balanced(&map));

        let mut skewed = same.clone();
        skewed.entries[0].debit_amount = dec!(-4);
        assert!(!skewed.is_balanced(&map));

        let cross = Transaction::new(date(1))
            .with_entry(TransactionEntry::exchanged(z, x, dec!(92.00), dec!(-100.00)));
        assert!(cross.is_balanced(&map));
        assert!(!Transaction::new(date(1)).is_balanced(&map));
    }

    #[test]
    fn test_canonical_order() {
        let (_, x, y, _) = accounts();
        let early = Transaction::new(date(1)).with_entry(TransactionEntry::double(x, y, dec!(1)));
        let late = Transaction::new(date(2)).with_entry(TransactionEntry::double(x, y, dec!(1)));
        assert_eq!(early.cmp_canonical(&late), Ordering::Less);

        let mut a = early.clone();
        a.id = TransactionId::new();
        a.number = "101".to_string();
        let mut b = early.clone();
        b.id = TransactionId::new();
        b.number = "102".to_string();
        assert_eq!(a.cmp_canonical(&b), Ordering::Less);
        assert_eq!(a.cmp_canonical(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_set_reconciled_all() {
        let (_, x, y, z) = accounts();
        let mut tx = Transaction::new(date(1))
            .with_entry(TransactionEntry::double(y, x, dec!(1)))
            .with_entry(TransactionEntry::double(z, x, dec!(2)));
        tx.set_reconciled(&x, ReconciledState::Cleared);
        assert_eq!(tx.reconciled(&x), Some(ReconciledState::Cleared));
        assert_eq!(tx.reconciled(&y), Some(ReconciledState::NotReconciled));
        tx.set_reconciled_all(ReconciledState::Reconciled);
        assert!(tx.accounts().iter().all(|a| tx.reconciled(a) == Some(ReconciledState::Reconciled)));
    }
}
