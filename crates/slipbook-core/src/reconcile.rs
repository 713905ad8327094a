//! Reconciliation state rules applied when a transaction is entered

use slipbook_config::ReconcilePolicy;

use crate::models::{AccountId, AccountLookup, Transaction};
use crate::types::{AccountGroup, ReconciledState};

/// Mark `account` on `tx` with `state` and apply the policy to the other sides
///
/// The state of `account` is written last so no policy rule can overwrite it.
pub fn reconcile_transaction(
    policy: ReconcilePolicy,
    account: &AccountId,
    tx: &mut Transaction,
    state: ReconciledState,
    lookup: &dyn AccountLookup,
) {
    match policy {
        ReconcilePolicy::CurrentAccount => {}
        ReconcilePolicy::BothSides => tx.set_reconciled_all(state),
        ReconcilePolicy::IncomeExpense => {
            for entry in &mut tx.entries {
                let sides: Vec<AccountId> = entry.accounts().collect();
                for side in sides {
                    let income_or_expense = lookup
                        .account(&side)
                        .map(|a| {
                            a.account_type.member_of(AccountGroup::Income)
                                || a.account_type.member_of(AccountGroup::Expense)
                        })
                        .unwrap_or(false);
                    if income_or_expense {
                        entry.set_reconciled(&side, ReconciledState::Reconciled);
                    }
                }
            }
        }
    }

    tx.set_reconciled(account, state);
}

/// Carry reconciliation from a replaced transaction into its replacement
///
/// Every account of `old` other than `current` keeps its previous state.
/// The current account's new state is applied afterwards through
/// [`reconcile_transaction`].
pub fn propagate_reconciliation(
    old: &Transaction,
    new: &mut Transaction,
    current: &AccountId,
    state: ReconciledState,
    policy: ReconcilePolicy,
    lookup: &dyn AccountLookup,
) {
    for account in old.accounts() {
        if &account == current {
            continue;
        }
        if let Some(previous) = old.reconciled(&account) {
            new.set_reconciled(&account, previous);
        }
    }

    reconcile_transaction(policy, current, new, state, lookup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, TransactionEntry};
    use crate::money::CurrencyNode;
    use crate::types::AccountType;
    use chrono::NaiveDate;
    use rust_decimal::dec;
    use std::collections::HashMap;

    struct Fixture {
        accounts: HashMap<AccountId, Account>,
        checking: AccountId,
        savings: AccountId,
        food: AccountId,
    }

    fn fixture() -> Fixture {
        let usd = CurrencyNode::new("USD", 2);
        let checking = Account::new("Checking", AccountType::Checking, usd.clone());
        let savings = Account::new("Savings", AccountType::Bank, usd.clone());
        let food = Account::new("Food", AccountType::Expense, usd);
        Fixture {
            checking: checking.id,
            savings: savings.id,
            food: food.id,
            accounts: [checking, savings, food].into_iter().map(|a| (a.id, a)).collect(),
        }
    }

    fn tx(f: &Fixture) -> Transaction {
        Transaction::new(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
            .with_entry(TransactionEntry::double(f.savings, f.checking, dec!(10)))
            .with_entry(TransactionEntry::double(f.food, f.checking, dec!(20)))
    }

    #[test]
    fn test_current_account_policy_touches_only_current() {
        let f = fixture();
        let mut t = tx(&f);
        reconcile_transaction(ReconcilePolicy::CurrentAccount, &f.checking, &mut t, ReconciledState::Cleared, &f.accounts);
        assert_eq!(t.reconciled(&f.checking), Some(ReconciledState::Cleared));
        assert_eq!(t.reconciled(&f.savings), Some(ReconciledState::NotReconciled));
        assert_eq!(t.reconciled(&f.food), Some(ReconciledState::NotReconciled));
    }

    #[test]
    fn test_both_sides_policy() {
        let f = fixture();
        let mut t = tx(&f);
        reconcile_transaction(ReconcilePolicy::BothSides, &f.checking, &mut t, ReconciledState::Cleared, &f.accounts);
        assert_eq!(t.reconciled(&f.savings), Some(ReconciledState::Cleared));
        assert_eq!(t.reconciled(&f.food), Some(ReconciledState::Cleared));
    }

    #[test]
    fn test_income_expense_policy() {
        let f = fixture();
        let mut t = tx(&f);
        reconcile_transaction(ReconcilePolicy::IncomeExpense, &f.checking, &mut t, ReconciledState::Cleared, &f.accounts);
        assert_eq!(t.reconciled(&f.food), Some(ReconciledState::Reconciled));
        assert_eq!(t.reconciled(&f.savings), Some(ReconciledState::NotReconciled));
        assert_eq!(t.reconciled(&f.checking), Some(ReconciledState::Cleared));

        // the current account keeps the toggle even when it is an expense
        let mut t = tx(&f);
        reconcile_transaction(ReconcilePolicy::IncomeExpense, &f.food, &mut t, ReconciledState::NotReconciled, &f.accounts);
        assert_eq!(t.reconciled(&f.food), Some(ReconciledState::NotReconciled));
    }

    #[test]
    fn test_propagation_sets_current_last() {
        let f = fixture();
        let mut old = Transaction::new(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
            .with_entry(TransactionEntry::double(f.checking, f.savings, dec!(10)));
        old.set_reconciled(&f.savings, ReconciledState::Reconciled);

        let mut new = Transaction::new(old.date)
            .with_entry(TransactionEntry::double(f.checking, f.savings, dec!(12)));
        propagate_reconciliation(
            &old,
            &mut new,
            &f.checking,
            ReconciledState::Cleared,
            ReconcilePolicy::CurrentAccount,
            &f.accounts,
        );
        assert_eq!(new.reconciled(&f.savings), Some(ReconciledState::Reconciled));
        assert_eq!(new.reconciled(&f.checking), Some(ReconciledState::Cleared));
    }
}
