//! Configuration management for slipbook
//!
//! This module handles loading, validation, and management of
//! slipbook configuration from YAML files.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::ConfigError;

// ==================== Configuration Types ====================

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the data directory
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    /// Journal snapshot file name
    #[serde(default = "default_journal_file")]
    pub journal_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            journal_file: default_journal_file(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_journal_file() -> String {
    "journal.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

/// Register (ledger view) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// Show one row per impacting entry of a split transaction
    #[serde(default = "default_false")]
    pub show_split_detail: bool,
    /// Allow column sorting
    #[serde(default = "default_true")]
    pub sortable: bool,
    /// Sign convention applied to displayed balances
    #[serde(default)]
    pub balance_display: BalanceDisplayMode,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            show_split_detail: false,
            sortable: true,
            balance_display: BalanceDisplayMode::None,
        }
    }
}

/// Balance display mode enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceDisplayMode {
    /// Show balances as stored
    None,
    /// Negate liability, equity and income balances
    ReverseCredit,
    /// Negate income and expense balances
    ReverseIncomeExpense,
}

impl Default for BalanceDisplayMode {
    fn default() -> Self {
        BalanceDisplayMode::None
    }
}

impl std::str::FromStr for BalanceDisplayMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(BalanceDisplayMode::None),
            "reverse_credit" => Ok(BalanceDisplayMode::ReverseCredit),
            "reverse_income_expense" => Ok(BalanceDisplayMode::ReverseIncomeExpense),
            _ => Err(format!("Invalid balance display mode: {}", s)),
        }
    }
}

impl std::fmt::Display for BalanceDisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceDisplayMode::None => write!(f, "none"),
            BalanceDisplayMode::ReverseCredit => write!(f, "reverse_credit"),
            BalanceDisplayMode::ReverseIncomeExpense => write!(f, "reverse_income_expense"),
        }
    }
}

/// Transaction entry (slip) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Use the joined entry memos as the memo of a split transaction
    #[serde(default = "default_false")]
    pub concatenate_memos: bool,
    /// Keep the last used date when the form is cleared
    #[serde(default = "default_false")]
    pub remember_last_date: bool,
    /// Use Debit/Credit labels
    #[serde(default = "default_false")]
    pub accounting_terms: bool,
    /// Pre-fill slips from earlier transactions with the same payee
    #[serde(default = "default_true")]
    pub auto_complete: bool,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            concatenate_memos: false,
            remember_last_date: false,
            accounting_terms: false,
            auto_complete: true,
        }
    }
}

/// Reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileConfig {
    /// Which sides of a transaction follow the entry form's reconcile toggle
    #[serde(default)]
    pub policy: ReconcilePolicy,
}

/// Reconcile policy enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Only the account the slip belongs to
    CurrentAccount,
    /// Every side of every entry
    BothSides,
    /// The current account, plus income and expense sides are marked reconciled
    IncomeExpense,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        ReconcilePolicy::CurrentAccount
    }
}

impl std::str::FromStr for ReconcilePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current_account" | "current" => Ok(ReconcilePolicy::CurrentAccount),
            "both_sides" | "both" => Ok(ReconcilePolicy::BothSides),
            "income_expense" => Ok(ReconcilePolicy::IncomeExpense),
            _ => Err(format!("Invalid reconcile policy: {}", s)),
        }
    }
}

impl std::fmt::Display for ReconcilePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcilePolicy::CurrentAccount => write!(f, "current_account"),
            ReconcilePolicy::BothSides => write!(f, "both_sides"),
            ReconcilePolicy::IncomeExpense => write!(f, "income_expense"),
        }
    }
}

/// Currency and number formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Default currency code for new accounts
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Number of decimal places
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
    /// Thousands separator
    #[serde(default = "default_thousands_sep")]
    pub thousands_separator: String,
    /// Decimal separator
    #[serde(default = "default_decimal_sep")]
    pub decimal_separator: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            decimal_places: default_decimal_places(),
            thousands_separator: default_thousands_sep(),
            decimal_separator: default_decimal_sep(),
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_thousands_sep() -> String {
    ",".to_string()
}

fn default_decimal_sep() -> String {
    ".".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Data directory settings
    #[serde(default)]
    pub data: DataConfig,
    /// Register settings
    #[serde(default)]
    pub register: RegisterConfig,
    /// Entry form settings
    #[serde(default)]
    pub entry: EntryConfig,
    /// Reconciliation settings
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Currency settings
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::IoError)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content).map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.journal_file.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "data.journal_file".to_string(),
            });
        }

        if self.currency.default_currency.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "currency.default_currency".to_string(),
            });
        }

        if self.currency.decimal_places > 10 {
            return Err(ConfigError::InvalidValue {
                field: "currency.decimal_places".to_string(),
                reason: "Decimal places must be between 0 and 10".to_string(),
            });
        }

        if self.currency.thousands_separator == self.currency.decimal_separator {
            return Err(ConfigError::InvalidValue {
                field: "currency.decimal_separator".to_string(),
                reason: "Decimal and thousands separators must differ".to_string(),
            });
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "logging.level".to_string(),
                    reason: format!("Unknown log level '{}'", other),
                });
            }
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Get the full path to the journal snapshot
    pub fn journal_path(&self) -> PathBuf {
        self.data.path.join(&self.data.journal_file)
    }
}
