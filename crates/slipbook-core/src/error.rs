//! Error types for slipbook-core
//!
//! Error codes, severities and suggestion-bearing details for the ledger
//! and transaction-entry layer.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

use crate::engine::EngineError;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Account not found
    AccountNotFound,
    /// Transaction not found
    TransactionNotFound,
    /// Amounts in different currencies were combined
    CurrencyMismatch,
    /// Validation error
    ValidationError,
    /// Account is locked
    AccountLocked,
    /// Transaction cannot be edited from this account
    NotModifiable,
    /// Engine rejected an operation
    EngineError,
    /// Configuration error
    ConfigError,
    /// IO error
    IoError,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::AccountNotFound => write!(f, "ACCOUNT_NOT_FOUND"),
            ErrorCode::TransactionNotFound => write!(f, "TRANSACTION_NOT_FOUND"),
            ErrorCode::CurrencyMismatch => write!(f, "CURRENCY_MISMATCH"),
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::AccountLocked => write!(f, "ACCOUNT_LOCKED"),
            ErrorCode::NotModifiable => write!(f, "NOT_MODIFIABLE"),
            ErrorCode::EngineError => write!(f, "ENGINE_ERROR"),
            ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
            ErrorCode::IoError => write!(f, "IO_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - operation may be affected
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - application may be unstable
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for slipbook-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Account not found: {name}")]
    AccountNotFound { name: String },

    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: String },

    #[error("Currency mismatch: {left} and {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Account is locked: {name}")]
    AccountLocked { name: String },

    #[error("Transaction cannot be modified from account {account}")]
    NotModifiable { account: String },

    #[error("Engine error: {0}")]
    Engine(EngineError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error occurred")]
    IoError,

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::AccountNotFound { .. } => ErrorCode::AccountNotFound,
            CoreError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
            CoreError::CurrencyMismatch { .. } => ErrorCode::CurrencyMismatch,
            CoreError::ValidationError { .. } => ErrorCode::ValidationError,
            CoreError::AccountLocked { .. } => ErrorCode::AccountLocked,
            CoreError::NotModifiable { .. } => ErrorCode::NotModifiable,
            CoreError::Engine(_) => ErrorCode::EngineError,
            CoreError::ConfigError { .. } => ErrorCode::ConfigError,
            CoreError::IoError => ErrorCode::IoError,
            CoreError::InternalError { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::AccountNotFound { .. } => ErrorSeverity::Info,
            CoreError::TransactionNotFound { .. } => ErrorSeverity::Info,
            CoreError::CurrencyMismatch { .. } => ErrorSeverity::Error,
            CoreError::ValidationError { .. } => ErrorSeverity::Warning,
            CoreError::AccountLocked { .. } => ErrorSeverity::Warning,
            CoreError::NotModifiable { .. } => ErrorSeverity::Warning,
            CoreError::Engine(_) => ErrorSeverity::Error,
            CoreError::ConfigError { .. } => ErrorSeverity::Critical,
            CoreError::IoError => ErrorSeverity::Error,
            CoreError::InternalError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::AccountNotFound { name } => {
                details = details.with_suggestion(format!(
                    "Check if the account '{}' exists in the journal.",
                    name
                ));
            }
            CoreError::CurrencyMismatch { left, right } => {
                details = details.with_detail(serde_json::json!({ "left": left, "right": right }));
                details = details.with_suggestion(
                    "Enter an exchanged amount for the other currency.".to_string(),
                );
            }
            CoreError::ValidationError { message } => {
                details = details.with_detail(serde_json::json!({ "validation_message": message }));
            }
            CoreError::AccountLocked { .. } => {
                details = details.with_suggestion(
                    "Unlock the account before editing its transactions.".to_string(),
                );
            }
            CoreError::NotModifiable { .. } => {
                details = details.with_suggestion(
                    "Edit the transaction from the account shared by all of its entries.".to_string(),
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<EngineError> for CoreError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::AccountNotFound { id } => CoreError::AccountNotFound { name: id.to_string() },
            EngineError::TransactionNotFound { id } => CoreError::TransactionNotFound { id: id.to_string() },
            EngineError::AccountLocked { name } => CoreError::AccountLocked { name },
            other => CoreError::Engine(other),
        }
    }
}

impl From<io::Error> for CoreError {
    fn from(_error: io::Error) -> Self {
        CoreError::IoError
    }
}

impl From<slipbook_config::ConfigError> for CoreError {
    fn from(error: slipbook_config::ConfigError) -> Self {
        CoreError::ConfigError {
            message: error.to_string(),
        }
    }
}

/// Error context for reporting
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Operation being performed
    pub operation: String,
    /// Account the operation ran against
    pub account: Option<String>,
    /// Additional context data
    pub data: serde_json::Value,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: String) -> Self {
        Self {
            operation,
            account: None,
            data: serde_json::json!({}),
        }
    }

    /// Add the account name
    pub fn with_account(mut self, account: String) -> Self {
        self.account = Some(account);
        self
    }

    /// Add context data
    pub fn with_data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.data[key] = value;
        self
    }
}

/// Error logger trait
pub trait ErrorLogger {
    /// Log an error
    fn log_error(&self, error: &CoreError, context: &ErrorContext);
    /// Log a warning
    fn log_warning(&self, message: &str, context: &ErrorContext);
}

/// Default error logger using log crate
#[derive(Default)]
pub struct DefaultErrorLogger;

impl ErrorLogger for DefaultErrorLogger {
    fn log_error(&self, error: &CoreError, context: &ErrorContext) {
        if matches!(error.severity(), ErrorSeverity::Info | ErrorSeverity::Warning) {
            self.log_warning(&format!("[{}] {}", error.code(), error), context);
            return;
        }
        log::error!(
            target: "slipbook::error",
            "ERROR [{}] {} - Operation: {} - Account: {:?}",
            error.code(),
            error.to_details(),
            context.operation,
            context.account
        );
    }

    fn log_warning(&self, message: &str, context: &ErrorContext) {
        log::warn!(
            target: "slipbook::error",
            "WARNING: {} - Operation: {} - Account: {:?}",
            message,
            context.operation,
            context.account
        );
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::AccountLocked.to_string(), "ACCOUNT_LOCKED");
        assert_eq!(ErrorCode::CurrencyMismatch.to_string(), "CURRENCY_MISMATCH");
    }

    #[test]
    fn test_core_error_severity() {
        assert_eq!(
            CoreError::AccountLocked { name: "Checking".to_string() }.severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            CoreError::Engine(EngineError::Rejected { reason: "x".to_string() }).severity(),
            ErrorSeverity::Error
        );
        assert_eq!(CoreError::IoError.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_details_currency_mismatch() {
        let error = CoreError::CurrencyMismatch {
            left: "USD".to_string(),
            right: "EUR".to_string(),
        };
        let details = error.to_details();
        assert_eq!(details.code, ErrorCode::CurrencyMismatch);
        assert!(details.details.is_some());
        assert!(!details.suggestions.is_empty());
        assert!(details.message.contains("EUR"));
    }

    #[test]
    fn test_engine_error_conversion() {
        let locked: CoreError = EngineError::AccountLocked { name: "Savings".to_string() }.into();
        assert_eq!(locked.code(), ErrorCode::AccountLocked);

        let missing: CoreError = EngineError::TransactionNotFound { id: crate::models::TransactionId::new() }.into();
        assert_eq!(missing.code(), ErrorCode::TransactionNotFound);

        let rejected: CoreError = EngineError::Rejected { reason: "x".to_string() }.into();
        assert_eq!(rejected.code(), ErrorCode::EngineError);
    }

    #[test]
    fn test_config_error_conversion() {
        let error: CoreError = slipbook_config::ConfigError::InvalidYaml.into();
        assert_eq!(error.code(), ErrorCode::ConfigError);
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::new("commit".to_string())
            .with_account("Checking".to_string())
            .with_data("row", serde_json::json!(3));
        assert_eq!(context.account, Some("Checking".to_string()));
        assert_eq!(context.data["row"], serde_json::json!(3));
    }
}
