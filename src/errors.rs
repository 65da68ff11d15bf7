//! Error types for the hoopshot wagering client
//!
//! Only validation failures and a busy session are meant for the player. Everything
//! else is either recovered with a safe default or logged and dropped by the caller.

use rust_decimal::Decimal;

/// Root error type for all hoopshot operations
#[derive(Debug, thiserror::Error)]
pub enum HoopshotError {
    /// Stake rejected before a round starts
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Another round is already in flight for this session
    #[error("A round is already in progress")]
    RoundBusy,

    /// Balance persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Outcome resolution errors
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Counterparty reporting errors
    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),
}

impl HoopshotError {
    /// Whether this error should be shown to the player as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, HoopshotError::Validation(_) | HoopshotError::RoundBusy)
    }
}

/// Stake validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Enter a stake amount")]
    MissingStake,

    #[error("Stake '{0}' is not a number")]
    NotNumeric(String),

    #[error("Stake must be greater than zero, got {0}")]
    NonPositive(Decimal),

    #[error("Insufficient balance: stake {stake} exceeds balance {balance}")]
    InsufficientBalance { stake: Decimal, balance: Decimal },

    #[error("Unknown preset shortcut #{index} ({available} configured)")]
    UnknownPreset { index: usize, available: usize },

    #[error("Stake {stake} cannot be settled against balance {balance}: amount out of range")]
    AmountOutOfRange { stake: Decimal, balance: Decimal },
}

/// Storage system errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted balance record: {0}")]
    CorruptedData(String),
}

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Outcome resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Host game surface rejected launch: {0}")]
    LaunchFailed(String),

    #[error("Outcome event stream closed before a score was reported")]
    ChannelClosed,

    #[error("Round {0} was already resolved")]
    AlreadyResolved(String),
}

/// Counterparty reporting errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Failed to encode report: {0}")]
    EncodeFailed(String),

    #[error("Counterparty unreachable: {0}")]
    Unreachable(String),
}

impl From<std::io::Error> for HoopshotError {
    fn from(e: std::io::Error) -> Self {
        HoopshotError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

/// Convenience type alias for Results
pub type HoopshotResult<T> = Result<T, HoopshotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = HoopshotError::from(ValidationError::InsufficientBalance {
            stake: dec!(15),
            balance: dec!(10),
        });

        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("stake 15 exceeds balance 10"));
    }

    #[test]
    fn test_user_facing_split() {
        assert!(HoopshotError::RoundBusy.is_user_facing());
        assert!(HoopshotError::from(ValidationError::MissingStake).is_user_facing());
        assert!(!HoopshotError::from(StorageError::WriteFailed("disk".into())).is_user_facing());
        assert!(!HoopshotError::from(ResolverError::ChannelClosed).is_user_facing());
    }

    #[test]
    fn test_error_source() {
        let err = HoopshotError::from(StorageError::ReadFailed("boom".into()));
        assert!(err.source().is_some());
    }
}
