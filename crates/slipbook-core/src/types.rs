//! Basic types for the core ledger module

use serde::{Deserialize, Serialize};

/// Account group enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountGroup {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
    Invest,
}

impl std::fmt::Display for AccountGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountGroup::Asset => write!(f, "asset"),
            AccountGroup::Liability => write!(f, "liability"),
            AccountGroup::Equity => write!(f, "equity"),
            AccountGroup::Income => write!(f, "income"),
            AccountGroup::Expense => write!(f, "expense"),
            AccountGroup::Invest => write!(f, "invest"),
        }
    }
}

/// Account type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Generic asset account
    Asset,
    /// Bank account
    Bank,
    /// Cash on hand
    Cash,
    /// Checking account
    Checking,
    /// Money market account
    MoneyMarket,
    /// Credit card
    Credit,
    /// Loans and other liabilities
    Liability,
    /// Owner's equity
    Equity,
    /// Income (salary, dividends)
    Income,
    /// Expenses (food, transport)
    Expense,
    /// Brokerage account
    Investment,
    /// Mutual fund
    Mutual,
}

impl AccountType {
    /// The group this account type belongs to
    pub fn group(&self) -> AccountGroup {
        match self {
            AccountType::Asset
            | AccountType::Bank
            | AccountType::Cash
            | AccountType::Checking
            | AccountType::MoneyMarket => AccountGroup::Asset,
            AccountType::Credit | AccountType::Liability => AccountGroup::Liability,
            AccountType::Equity => AccountGroup::Equity,
            AccountType::Income => AccountGroup::Income,
            AccountType::Expense => AccountGroup::Expense,
            AccountType::Investment | AccountType::Mutual => AccountGroup::Invest,
        }
    }

    pub fn member_of(&self, group: AccountGroup) -> bool {
        self.group() == group
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Bank
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" | "assets" => Ok(AccountType::Asset),
            "bank" => Ok(AccountType::Bank),
            "cash" => Ok(AccountType::Cash),
            "checking" => Ok(AccountType::Checking),
            "money_market" | "moneymarket" => Ok(AccountType::MoneyMarket),
            "credit" => Ok(AccountType::Credit),
            "liability" | "liabilities" => Ok(AccountType::Liability),
            "equity" => Ok(AccountType::Equity),
            "income" => Ok(AccountType::Income),
            "expense" | "expenses" => Ok(AccountType::Expense),
            "investment" | "invest" => Ok(AccountType::Investment),
            "mutual" => Ok(AccountType::Mutual),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Asset => write!(f, "asset"),
            AccountType::Bank => write!(f, "bank"),
            AccountType::Cash => write!(f, "cash"),
            AccountType::Checking => write!(f, "checking"),
            AccountType::MoneyMarket => write!(f, "money_market"),
            AccountType::Credit => write!(f, "credit"),
            AccountType::Liability => write!(f, "liability"),
            AccountType::Equity => write!(f, "equity"),
            AccountType::Income => write!(f, "income"),
            AccountType::Expense => write!(f, "expense"),
            AccountType::Investment => write!(f, "investment"),
            AccountType::Mutual => write!(f, "mutual"),
        }
    }
}

/// Reconciliation state of one side of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciledState {
    NotReconciled,
    Cleared,
    Reconciled,
}

impl Default for ReconciledState {
    fn default() -> Self {
        ReconciledState::NotReconciled
    }
}

impl ReconciledState {
    /// Short register column marker
    pub fn marker(&self) -> &'static str {
        match self {
            ReconciledState::NotReconciled => "",
            ReconciledState::Cleared => "c",
            ReconciledState::Reconciled => "R",
        }
    }
}

impl std::str::FromStr for ReconciledState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "not_reconciled" | "n" | "" => Ok(ReconciledState::NotReconciled),
            "cleared" | "c" => Ok(ReconciledState::Cleared),
            "reconciled" | "r" => Ok(ReconciledState::Reconciled),
            _ => Err(format!("Invalid reconciled state: {}", s)),
        }
    }
}

impl std::fmt::Display for ReconciledState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciledState::NotReconciled => write!(f, "not_reconciled"),
            ReconciledState::Cleared => write!(f, "cleared"),
            ReconciledState::Reconciled => write!(f, "reconciled"),
        }
    }
}

/// Which side of a two-account relationship an entry form represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlipType {
    /// Form posts to the credit side of the current account
    Increase,
    /// Form posts to the debit side of the current account
    Decrease,
}

impl std::str::FromStr for SlipType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "increase" | "deposit" | "credit" => Ok(SlipType::Increase),
            "decrease" | "withdrawal" | "debit" => Ok(SlipType::Decrease),
            _ => Err(format!("Invalid slip type: {}", s)),
        }
    }
}

impl std::fmt::Display for SlipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlipType::Increase => write!(f, "increase"),
            SlipType::Decrease => write!(f, "decrease"),
        }
    }
}

/// Structural classification of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// One entry whose credit and debit accounts are the same
    SingleEntry,
    /// One entry linking two accounts
    DoubleEntry,
    /// Two or more entries
    Split,
    /// No entries, or an inconsistent single entry
    Invalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_groups() {
        assert_eq!(AccountType::Checking.group(), AccountGroup::Asset);
        assert_eq!(AccountType::Credit.group(), AccountGroup::Liability);
        assert_eq!(AccountType::Mutual.group(), AccountGroup::Invest);
        assert!(AccountType::Expense.member_of(AccountGroup::Expense));
    }

    #[test]
    fn test_account_type_from_str() {
        assert_eq!("Bank".parse::<AccountType>().unwrap(), AccountType::Bank);
        assert_eq!("expenses".parse::<AccountType>().unwrap(), AccountType::Expense);
        assert!("planet".parse::<AccountType>().is_err());
        assert_eq!(AccountType::MoneyMarket.to_string(), "money_market");
    }

    #[test]
    fn test_reconciled_state() {
        assert_eq!(ReconciledState::default(), ReconciledState::NotReconciled);
        assert_eq!("R".parse::<ReconciledState>().unwrap(), ReconciledState::Reconciled);
        assert_eq!(ReconciledState::Cleared.marker(), "c");
    }

    #[test]
    fn test_slip_type_from_str() {
        assert_eq!("deposit".parse::<SlipType>().unwrap(), SlipType::Increase);
        assert_eq!("withdrawal".parse::<SlipType>().unwrap(), SlipType::Decrease);
    }
}
