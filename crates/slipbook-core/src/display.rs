//! Sign conventions and column labels for registers

use rust_decimal::Decimal;
use slipbook_config::BalanceDisplayMode;

use crate::types::{AccountGroup, AccountType};

/// Apply the configured sign convention to a stored balance
pub fn convert_to_display(mode: BalanceDisplayMode, account_type: AccountType, value: Decimal) -> Decimal {
    let group = account_type.group();
    let reverse = match mode {
        BalanceDisplayMode::None => false,
        BalanceDisplayMode::ReverseCredit => matches!(
            group,
            AccountGroup::Liability | AccountGroup::Equity | AccountGroup::Income
        ),
        BalanceDisplayMode::ReverseIncomeExpense => {
            matches!(group, AccountGroup::Income | AccountGroup::Expense)
        }
    };
    if reverse {
        -value
    } else {
        value
    }
}

/// Headings for the increase and decrease amount columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLabels {
    pub increase: &'static str,
    pub decrease: &'static str,
}

impl ColumnLabels {
    const fn new(increase: &'static str, decrease: &'static str) -> Self {
        Self { increase, decrease }
    }
}

/// Register column labels for an account type
pub fn column_labels(account_type: AccountType, accounting_terms: bool) -> ColumnLabels {
    if accounting_terms {
        return ColumnLabels::new("Debit", "Credit");
    }
    match account_type {
        AccountType::Credit => ColumnLabels::new("Payment", "Charge"),
        AccountType::Expense => ColumnLabels::new("Expense", "Rebate"),
        AccountType::Income => ColumnLabels::new("Charge", "Income"),
        AccountType::Cash => ColumnLabels::new("Receive", "Spend"),
        AccountType::Equity | AccountType::Liability => ColumnLabels::new("Decrease", "Increase"),
        t if t.member_of(AccountGroup::Asset) => ColumnLabels::new("Deposit", "Withdrawal"),
        _ => ColumnLabels::new("Increase", "Decrease"),
    }
}

/// Tab names for the increase and decrease entry forms
///
/// With accounting terms, equity accounts read Credit/Debit while every
/// other group reads Debit/Credit.
pub fn slip_tab_labels(account_type: AccountType, accounting_terms: bool) -> ColumnLabels {
    if accounting_terms {
        return match account_type.group() {
            AccountGroup::Equity => ColumnLabels::new("Credit", "Debit"),
            _ => ColumnLabels::new("Debit", "Credit"),
        };
    }
    column_labels(account_type, false)
}
