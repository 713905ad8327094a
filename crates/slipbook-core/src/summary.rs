//! Account totals computed off the UI thread

use serde::Serialize;

use crate::error::CoreResult;
use crate::models::{Account, Transaction};
use crate::money::MonetaryAmount;
use crate::types::ReconciledState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub account: String,
    pub transaction_count: usize,
    pub balance: MonetaryAmount,
    /// Balance counting cleared and reconciled sides
    pub cleared_balance: MonetaryAmount,
    /// Balance counting reconciled sides only
    pub reconciled_balance: MonetaryAmount,
}

impl AccountSummary {
    pub fn compute<'a>(
        account: &Account,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> CoreResult<Self> {
        let currency = &account.currency;
        let mut count = 0;
        let mut balance = MonetaryAmount::zero(currency.clone());
        let mut cleared = MonetaryAmount::zero(currency.clone());
        let mut reconciled = MonetaryAmount::zero(currency.clone());

        for tx in transactions.into_iter().filter(|t| t.involves(&account.id)) {
            count += 1;
            for entry in &tx.entries {
                let amount = MonetaryAmount::new(entry.amount(&account.id), currency.clone());
                balance = balance.checked_add(&amount)?;
                match entry.reconciled(&account.id) {
                    Some(ReconciledState::Reconciled) => {
                        cleared = cleared.checked_add(&amount)?;
                        reconciled = reconciled.checked_add(&amount)?;
                    }
                    Some(ReconciledState::Cleared) => cleared = cleared.checked_add(&amount)?,
                    _ => {}
                }
            }
        }

        Ok(Self {
            account: account.name.clone(),
            transaction_count: count,
            balance,
            cleared_balance: cleared,
            reconciled_balance: reconciled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionEntry;
    use crate::money::CurrencyNode;
    use crate::types::AccountType;
    use chrono::NaiveDate;
    use rust_decimal::dec;

    #[test]
    fn test_summary_totals() {
        let usd = CurrencyNode::new("USD", 2);
        let checking = Account::new("Checking", AccountType::Checking, usd.clone());
        let salary = Account::new("Salary", AccountType::Income, usd);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let mut paid = Transaction::new(date).with_entry(TransactionEntry::double(checking.id, salary.id, dec!(2000)));
        paid.set_reconciled(&checking.id, ReconciledState::Reconciled);
        let mut cleared = Transaction::new(date).with_entry(TransactionEntry::double(salary.id, checking.id, dec!(150)));
        cleared.set_reconciled(&checking.id, ReconciledState::Cleared);
        let pending = Transaction::new(date).with_entry(TransactionEntry::double(salary.id, checking.id, dec!(50)));

        let all = vec![paid, cleared, pending];
        let summary = AccountSummary::compute(&checking, &all).unwrap();
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.balance.value(), dec!(1800));
        assert_eq!(summary.cleared_balance.value(), dec!(1850));
        assert_eq!(summary.reconciled_balance.value(), dec!(2000));
        assert_eq!(summary.balance.currency().code, "USD");
    }
}
